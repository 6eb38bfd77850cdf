use anyhow::Context;
use rusqlite::Connection;
use serde_json::json;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::csv::csv_quote;

const MANIFEST_ENTRY: &str = "manifest.json";
pub const BUNDLE_FORMAT_V1: &str = "studio-tenant-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

/// Write one tenant's records to a zip bundle: a manifest plus one CSV per
/// entity table. The CSVs use the same quoting dialect the importer reads.
pub fn export_tenant_bundle(
    conn: &Connection,
    tenant_id: &str,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "tenantId": tenant_id,
        "exportedAt": exported_at,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    let sections: [(&str, &str, &[&str]); 4] = [
        (
            "csv/members.csv",
            "SELECT name, email, phone, membership_type, status, join_date, payment_status
             FROM members WHERE tenant_id = ? ORDER BY name",
            &[
                "name",
                "email",
                "phone",
                "membership_type",
                "status",
                "join_date",
                "payment_status",
            ],
        ),
        (
            "csv/leads.csv",
            "SELECT name, email, phone, status, source
             FROM leads WHERE tenant_id = ? ORDER BY name",
            &["name", "email", "phone", "status", "source"],
        ),
        (
            "csv/staff.csv",
            "SELECT name, email, role, CAST(hourly_rate AS TEXT), hire_date
             FROM staff WHERE tenant_id = ? ORDER BY name",
            &["name", "email", "role", "hourly_rate", "hire_date"],
        ),
        (
            "csv/classes.csv",
            "SELECT name, CAST(duration_minutes AS TEXT), CAST(capacity AS TEXT),
                    day_of_week, start_time
             FROM class_sessions WHERE tenant_id = ? ORDER BY name",
            &["name", "duration", "capacity", "day_of_week", "time"],
        ),
    ];

    for (entry, sql, headers) in &sections {
        let text = entity_csv(conn, sql, tenant_id, headers)
            .with_context(|| format!("failed to build {}", entry))?;
        zip.start_file(*entry, opts)
            .with_context(|| format!("failed to start entry {}", entry))?;
        zip.write_all(text.as_bytes())
            .with_context(|| format!("failed to write entry {}", entry))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 1 + sections.len(),
    })
}

fn entity_csv(
    conn: &Connection,
    sql: &str,
    tenant_id: &str,
    headers: &[&str],
) -> anyhow::Result<String> {
    let mut out = String::new();
    out.push_str(&headers.join(","));
    out.push('\n');

    let mut stmt = conn.prepare(sql)?;
    let col_count = headers.len();
    let mut rows = stmt.query([tenant_id])?;
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(col_count);
        for i in 0..col_count {
            let v: Option<String> = row.get(i)?;
            cells.push(csv_quote(&v.unwrap_or_default()));
        }
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    Ok(out)
}
