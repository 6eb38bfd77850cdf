use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_studiod");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn studiod");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn demo_seed_populates_all_entity_families() {
    let workspace = temp_dir("studiod-demo-seed");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tenants.create",
        json!({ "name": "Demo Studio", "industry": "yoga" }),
    );
    let tenant_id = created["tenantId"].as_str().expect("tenantId").to_string();

    let seeded = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "demo.seed",
        json!({ "tenantId": tenant_id, "industry": "yoga" }),
    );
    assert_eq!(seeded["industry"], "yoga");
    for family in ["staff", "classes", "members", "leads"] {
        let result = &seeded["results"][family];
        assert!(result["imported"].as_u64().unwrap() > 0, "{} empty", family);
        assert_eq!(result["failed"], 0, "{} had failures", family);
        assert_eq!(result["imported"], result["total"], "{} mismatch", family);
    }

    let summary = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "tenants.summary",
        json!({ "tenantId": tenant_id }),
    );
    let counts = &summary["counts"];
    assert!(counts["members"].as_i64().unwrap() >= 25);
    assert!(counts["staff"].as_i64().unwrap() >= 4);
    assert!(counts["classes"].as_i64().unwrap() >= 4);
    assert!(counts["leads"].as_i64().unwrap() >= 8);

    // Every seed batch went through the job ledger with the demo source label.
    let jobs = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "import.jobs.list",
        json!({ "tenantId": tenant_id }),
    );
    let jobs = jobs["jobs"].as_array().expect("jobs");
    assert_eq!(jobs.len(), 4);
    for job in jobs {
        assert_eq!(job["source"], "demo");
        assert_eq!(job["status"], "completed");
        let total = job["total"].as_i64().unwrap();
        let imported = job["imported"].as_i64().unwrap();
        let failed = job["failed"].as_i64().unwrap();
        assert_eq!(imported + failed, total);
    }

    // Yoga tenants get the yoga class pool, not the default gym one.
    let classes = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "classes.list",
        json!({ "tenantId": tenant_id }),
    );
    let names: Vec<&str> = classes["classes"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert!(names.contains(&"Vinyasa Flow"));
    assert!(!names.contains(&"Bootcamp"));
}
