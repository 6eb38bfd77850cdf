use super::tenants::tenant_exists;
use crate::csv;
use crate::import::{self, DataType, SqliteStore, MAX_ERRORS_RETURNED};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use sha2::{Digest, Sha256};

fn payload_checksum(text: &str) -> String {
    use std::fmt::Write as _;
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.finalize().iter().fold(String::new(), |mut acc, b| {
        let _ = write!(acc, "{:02x}", b);
        acc
    })
}

fn handle_import_run(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let tenant_id = match req.params.get("tenantId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing tenantId", None),
    };
    match tenant_exists(conn, &tenant_id) {
        Ok(true) => {}
        Ok(false) => return err(&req.id, "not_found", "tenant not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }

    let selector = match req.params.get("dataType").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing dataType", None),
    };
    // Checked once, before any row is touched.
    let Some(data_type) = DataType::from_selector(&selector) else {
        return err(
            &req.id,
            "unknown_data_type",
            format!("unknown data type: {}", selector),
            Some(json!({ "expected": ["members", "leads", "staff", "classes"] })),
        );
    };

    let text = match (
        req.params.get("csvText").and_then(|v| v.as_str()),
        req.params.get("csvPath").and_then(|v| v.as_str()),
    ) {
        (Some(t), _) => t.to_string(),
        (None, Some(p)) => match std::fs::read_to_string(p) {
            Ok(t) => t,
            Err(e) => {
                return err(
                    &req.id,
                    "bad_params",
                    format!("failed to read {}: {}", p, e),
                    None,
                )
            }
        },
        (None, None) => return err(&req.id, "bad_params", "missing csvText or csvPath", None),
    };

    let rows = match csv::parse_table(&text) {
        Ok(rows) => rows,
        Err(e) => return err(&req.id, "empty_input", e.to_string(), None),
    };

    let source = req
        .params
        .get("source")
        .and_then(|v| v.as_str())
        .unwrap_or("csv");
    let checksum = payload_checksum(&text);

    let store = SqliteStore { conn };
    let report = match import::run_import(
        &store,
        &tenant_id,
        data_type,
        &rows,
        source,
        Some(&checksum),
    ) {
        Ok(r) => r,
        // Row failures never surface here; this is the ledger/bookkeeping
        // contract breaking.
        Err(e) => return err(&req.id, "db_write_failed", e.to_string(), None),
    };

    let sample: Vec<_> = report.errors.iter().take(MAX_ERRORS_RETURNED).collect();
    let errors = match serde_json::to_value(&sample) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "internal", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "jobId": report.job_id,
            "total": report.total,
            "imported": report.imported,
            "failed": report.failed,
            "errors": errors
        }),
    )
}

fn handle_jobs_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let tenant_id = match req.params.get("tenantId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing tenantId", None),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, source, data_type, status, total, imported, failed, error_log,
                started_at, completed_at
         FROM import_jobs WHERE tenant_id = ?
         ORDER BY started_at DESC",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([&tenant_id], |row| {
            let error_log: String = row.get(7)?;
            let error_count = serde_json::from_str::<Vec<serde_json::Value>>(&error_log)
                .map(|v| v.len())
                .unwrap_or(0);
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "source": row.get::<_, String>(1)?,
                "dataType": row.get::<_, String>(2)?,
                "status": row.get::<_, String>(3)?,
                "total": row.get::<_, i64>(4)?,
                "imported": row.get::<_, i64>(5)?,
                "failed": row.get::<_, i64>(6)?,
                "errorCount": error_count,
                "startedAt": row.get::<_, String>(8)?,
                "completedAt": row.get::<_, Option<String>>(9)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(jobs) => ok(&req.id, json!({ "jobs": jobs })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_jobs_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let job_id = match req.params.get("jobId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing jobId", None),
    };

    let row = conn
        .query_row(
            "SELECT id, tenant_id, source, data_type, status, total, imported, failed,
                    error_log, checksum, started_at, completed_at
             FROM import_jobs WHERE id = ?",
            [&job_id],
            |row| {
                let error_log: String = row.get(8)?;
                let errors: serde_json::Value =
                    serde_json::from_str(&error_log).unwrap_or_else(|_| json!([]));
                Ok(json!({
                    "id": row.get::<_, String>(0)?,
                    "tenantId": row.get::<_, String>(1)?,
                    "source": row.get::<_, String>(2)?,
                    "dataType": row.get::<_, String>(3)?,
                    "status": row.get::<_, String>(4)?,
                    "total": row.get::<_, i64>(5)?,
                    "imported": row.get::<_, i64>(6)?,
                    "failed": row.get::<_, i64>(7)?,
                    "errors": errors,
                    "checksum": row.get::<_, Option<String>>(9)?,
                    "startedAt": row.get::<_, String>(10)?,
                    "completedAt": row.get::<_, Option<String>>(11)?
                }))
            },
        )
        .optional();

    match row {
        Ok(Some(job)) => ok(&req.id, json!({ "job": job })),
        Ok(None) => err(&req.id, "not_found", "import job not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "import.run" => Some(handle_import_run(state, req)),
        "import.jobs.list" => Some(handle_jobs_list(state, req)),
        "import.jobs.get" => Some(handle_jobs_get(state, req)),
        _ => None,
    }
}
