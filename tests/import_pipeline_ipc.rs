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

fn request(
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
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
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

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn setup_tenant(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &PathBuf,
    name: &str,
) -> String {
    let _ = request_ok(
        stdin,
        reader,
        "setup-ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        stdin,
        reader,
        "setup-tenant",
        "tenants.create",
        json!({ "name": name, "industry": "gym" }),
    );
    created
        .get("tenantId")
        .and_then(|v| v.as_str())
        .expect("tenantId")
        .to_string()
}

#[test]
fn import_members_end_to_end_with_row_failure() {
    let workspace = temp_dir("studiod-import-e2e");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let tenant_id = setup_tenant(&mut stdin, &mut reader, &workspace, "Iron Temple");

    let csv = "name,email,phone,membership_type,status,join_date\n\
               Jane Doe,jane@x.com,813-555-0100,monthly,active,2024-01-10\n\
               John Roe,,813-555-0101,annual,Expired - 2024,2024-02-11\n\
               Ann Poe,ann@x.com,813-555-0102,monthly,frozen,13/01/2024\n";
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "import.run",
        json!({ "tenantId": tenant_id, "dataType": "members", "csvText": csv }),
    );

    assert_eq!(result["total"], 3);
    assert_eq!(result["imported"], 2);
    assert_eq!(result["failed"], 1);
    let errors = result["errors"].as_array().expect("errors array");
    assert_eq!(errors.len(), 1);
    // Header is row 1, so the second data row is row 3.
    assert_eq!(errors[0]["row"], 3);
    assert_eq!(errors[0]["error"], "Name and email are required");

    let members = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "members.list",
        json!({ "tenantId": tenant_id }),
    );
    let members = members["members"].as_array().expect("members");
    assert_eq!(members.len(), 2);
    let ann = members
        .iter()
        .find(|m| m["name"] == "Ann Poe")
        .expect("Ann imported");
    assert_eq!(ann["status"], "frozen");
    // Day-first heuristic: 13 cannot be a month.
    assert_eq!(ann["joinDate"], "2024-01-13");

    let job_id = result["jobId"].as_str().expect("jobId");
    let job = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "import.jobs.get",
        json!({ "jobId": job_id }),
    );
    assert_eq!(job["job"]["status"], "completed");
    assert_eq!(job["job"]["imported"], 2);
    assert_eq!(job["job"]["failed"], 1);
    assert_eq!(job["job"]["total"], 3);
    assert!(job["job"]["checksum"].as_str().is_some());
}

#[test]
fn import_handles_quoted_fields_and_alias_headers() {
    let workspace = temp_dir("studiod-import-quoted");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let tenant_id = setup_tenant(&mut stdin, &mut reader, &workspace, "Quoted Gym");

    let csv = "Full Name,Email Address,Phone Number\n\
               \"Smith, John\",smith@example.com,\"813-555-0100\"\n";
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "import.run",
        json!({ "tenantId": tenant_id, "dataType": "leads", "csvText": csv }),
    );
    assert_eq!(result["imported"], 1);
    assert_eq!(result["failed"], 0);

    let leads = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "leads.list",
        json!({ "tenantId": tenant_id }),
    );
    let leads = leads["leads"].as_array().expect("leads");
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0]["name"], "Smith, John");
    assert_eq!(leads[0]["email"], "smith@example.com");
    assert_eq!(leads[0]["phone"], "813-555-0100");
    assert_eq!(leads[0]["status"], "new");
    assert_eq!(leads[0]["source"], "Import");
}

#[test]
fn import_staff_and_classes_apply_mapping_defaults() {
    let workspace = temp_dir("studiod-import-staff");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let tenant_id = setup_tenant(&mut stdin, &mut reader, &workspace, "Mapped Gym");

    let staff_csv = "first_name,last_name,email,position,hourly_rate\n\
                     Rosa,Silva,rosa@x.com,Reception / Front Desk,$22.50\n\
                     Ben,Chen,ben@x.com,Head Trainer,not-a-number\n";
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "import.run",
        json!({ "tenantId": tenant_id, "dataType": "staff", "csvText": staff_csv }),
    );
    assert_eq!(result["imported"], 2);

    let staff = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "staff.list",
        json!({ "tenantId": tenant_id }),
    );
    let staff = staff["staff"].as_array().expect("staff");
    let rosa = staff.iter().find(|s| s["name"] == "Rosa Silva").unwrap();
    assert_eq!(rosa["role"], "front-desk");
    assert_eq!(rosa["hourlyRate"], 22.5);
    let ben = staff.iter().find(|s| s["name"] == "Ben Chen").unwrap();
    assert_eq!(ben["role"], "head-coach");
    assert!(ben["hourlyRate"].is_null());

    let class_csv = "class_name,duration,capacity\n\
                     Morning Spin,45,18\n\
                     Mystery Class,soon,packed\n";
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "import.run",
        json!({ "tenantId": tenant_id, "dataType": "classes", "csvText": class_csv }),
    );
    assert_eq!(result["imported"], 2);
    assert_eq!(result["failed"], 0);

    let classes = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "classes.list",
        json!({ "tenantId": tenant_id }),
    );
    let classes = classes["classes"].as_array().expect("classes");
    let mystery = classes
        .iter()
        .find(|c| c["name"] == "Mystery Class")
        .unwrap();
    assert_eq!(mystery["durationMinutes"], 60);
    assert_eq!(mystery["capacity"], 20);
    assert_eq!(mystery["dayOfWeek"], "Monday");
    assert_eq!(mystery["startTime"], "09:00");
}

#[test]
fn response_errors_are_capped_but_ledger_keeps_all() {
    let workspace = temp_dir("studiod-import-cap");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let tenant_id = setup_tenant(&mut stdin, &mut reader, &workspace, "Error Gym");

    let mut csv = String::from("name,email\n");
    for _ in 0..12 {
        csv.push_str(",missing-name@x.com\n");
    }
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "import.run",
        json!({ "tenantId": tenant_id, "dataType": "members", "csvText": csv }),
    );
    assert_eq!(result["total"], 12);
    assert_eq!(result["failed"], 12);
    assert_eq!(result["errors"].as_array().unwrap().len(), 10);

    let job_id = result["jobId"].as_str().unwrap();
    let job = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "import.jobs.get",
        json!({ "jobId": job_id }),
    );
    assert_eq!(job["job"]["errors"].as_array().unwrap().len(), 12);
}

#[test]
fn batch_level_precondition_failures() {
    let workspace = temp_dir("studiod-import-precond");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let tenant_id = setup_tenant(&mut stdin, &mut reader, &workspace, "Precond Gym");

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "import.run",
        json!({ "tenantId": tenant_id, "dataType": "invoices", "csvText": "a,b\n1,2\n" }),
    );
    assert_eq!(error_code(&resp), "unknown_data_type");

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "import.run",
        json!({ "tenantId": tenant_id, "dataType": "members", "csvText": "  \n\n" }),
    );
    assert_eq!(error_code(&resp), "empty_input");

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "import.run",
        json!({ "tenantId": tenant_id, "dataType": "members" }),
    );
    assert_eq!(error_code(&resp), "bad_params");

    let resp = request(
        &mut stdin,
        &mut reader,
        "4",
        "import.run",
        json!({ "tenantId": "no-such-tenant", "dataType": "members", "csvText": "name,email\n" }),
    );
    assert_eq!(error_code(&resp), "not_found");

    // None of the rejected batches left a ledger entry behind.
    let jobs = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "import.jobs.list",
        json!({ "tenantId": tenant_id }),
    );
    assert_eq!(jobs["jobs"].as_array().unwrap().len(), 0);
}

#[test]
fn imports_are_tenant_scoped() {
    let workspace = temp_dir("studiod-import-tenancy");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let tenant_a = setup_tenant(&mut stdin, &mut reader, &workspace, "Gym A");
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "tenants.create",
        json!({ "name": "Gym B" }),
    );
    let tenant_b = created["tenantId"].as_str().unwrap().to_string();

    let csv = "name,email\nOnly In A,a@x.com\n";
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "import.run",
        json!({ "tenantId": tenant_a, "dataType": "members", "csvText": csv }),
    );

    let in_a = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "members.list",
        json!({ "tenantId": tenant_a }),
    );
    assert_eq!(in_a["members"].as_array().unwrap().len(), 1);

    let in_b = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "members.list",
        json!({ "tenantId": tenant_b }),
    );
    assert_eq!(in_b["members"].as_array().unwrap().len(), 0);
}
