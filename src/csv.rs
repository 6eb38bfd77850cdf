use anyhow::anyhow;

/// Parse raw delimited text into rows of trimmed cells.
///
/// Line-oriented: the text is split on line breaks first, so quoted fields
/// cannot contain embedded newlines. Lines that trim to empty are dropped
/// entirely. Fails when nothing is left after filtering.
pub fn parse_table(text: &str) -> anyhow::Result<Vec<Vec<String>>> {
    let rows: Vec<Vec<String>> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_record)
        .collect();
    if rows.is_empty() {
        return Err(anyhow!("input contains no rows"));
    }
    Ok(rows)
}

/// Split one line into cells. A double quote toggles quoted mode; a comma
/// separates fields only outside quotes. `""` inside a quoted field is two
/// toggles, not an escaped literal quote.
pub fn parse_record(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if ch == ',' && !in_quotes {
            out.push(buf.trim().to_string());
            buf = String::new();
            continue;
        }
        buf.push(ch);
    }
    out.push(buf.trim().to_string());
    out
}

/// Canonicalize header cells: lowercase, runs of whitespace folded to a
/// single underscore. Repeated headers are not deduplicated; when the
/// per-row map is built later, the later column wins.
pub fn normalize_headers(cells: &[String]) -> Vec<String> {
    cells.iter().map(|c| normalize_header(c)).collect()
}

pub fn normalize_header(cell: &str) -> String {
    let mut out = String::with_capacity(cell.len());
    let mut in_gap = false;
    for ch in cell.trim().to_lowercase().chars() {
        if ch.is_whitespace() {
            if !in_gap {
                out.push('_');
                in_gap = true;
            }
        } else {
            out.push(ch);
            in_gap = false;
        }
    }
    out
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
