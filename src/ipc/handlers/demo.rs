use super::tenants::tenant_exists;
use crate::demo;
use crate::import::SqliteStore;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_demo_seed(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let industry = req
        .params
        .get("industry")
        .and_then(|v| v.as_str())
        .unwrap_or("gym")
        .to_string();

    let store = SqliteStore { conn };
    let reports = match demo::seed_tenant(&store, &tenant_id, &industry) {
        Ok(r) => r,
        Err(e) => return err(&req.id, "db_write_failed", e.to_string(), None),
    };

    let mut results = serde_json::Map::new();
    for (data_type, report) in &reports {
        results.insert(
            data_type.as_str().to_string(),
            json!({
                "jobId": report.job_id,
                "total": report.total,
                "imported": report.imported,
                "failed": report.failed
            }),
        );
    }

    ok(
        &req.id,
        json!({ "industry": industry, "results": serde_json::Value::Object(results) }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "demo.seed" => Some(handle_demo_seed(state, req)),
        _ => None,
    }
}
