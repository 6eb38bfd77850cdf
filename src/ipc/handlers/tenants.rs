use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

pub fn tenant_exists(conn: &Connection, tenant_id: &str) -> rusqlite::Result<bool> {
    conn.query_row("SELECT 1 FROM tenants WHERE id = ?", [tenant_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
}

fn handle_tenants_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    let industry = req
        .params
        .get("industry")
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let tenant_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO tenants(id, name, industry, created_at) VALUES(?, ?, ?, ?)",
        (
            &tenant_id,
            &name,
            &industry,
            &chrono::Utc::now().to_rfc3339(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "tenants" })),
        );
    }

    ok(&req.id, json!({ "tenantId": tenant_id, "name": name }))
}

fn handle_tenants_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "tenants": [] }));
    };

    // Per-entity counts via correlated subqueries so the admin console can
    // render a tenant overview without extra round trips.
    let mut stmt = match conn.prepare(
        "SELECT
           t.id,
           t.name,
           t.industry,
           (SELECT COUNT(*) FROM members m WHERE m.tenant_id = t.id) AS member_count,
           (SELECT COUNT(*) FROM leads l WHERE l.tenant_id = t.id) AS lead_count,
           (SELECT COUNT(*) FROM staff s WHERE s.tenant_id = t.id) AS staff_count,
           (SELECT COUNT(*) FROM class_sessions c WHERE c.tenant_id = t.id) AS class_count
         FROM tenants t
         ORDER BY t.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let industry: Option<String> = row.get(2)?;
            let member_count: i64 = row.get(3)?;
            let lead_count: i64 = row.get(4)?;
            let staff_count: i64 = row.get(5)?;
            let class_count: i64 = row.get(6)?;
            Ok(json!({
                "id": id,
                "name": name,
                "industry": industry,
                "memberCount": member_count,
                "leadCount": lead_count,
                "staffCount": staff_count,
                "classCount": class_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(tenants) => ok(&req.id, json!({ "tenants": tenants })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_tenants_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let counts = conn.query_row(
        "SELECT
           (SELECT COUNT(*) FROM members m WHERE m.tenant_id = ?1),
           (SELECT COUNT(*) FROM members m WHERE m.tenant_id = ?1 AND m.payment_status = 'overdue'),
           (SELECT COUNT(*) FROM leads l WHERE l.tenant_id = ?1),
           (SELECT COUNT(*) FROM staff s WHERE s.tenant_id = ?1),
           (SELECT COUNT(*) FROM class_sessions c WHERE c.tenant_id = ?1)",
        [&tenant_id],
        |r| {
            Ok(json!({
                "members": r.get::<_, i64>(0)?,
                "membersOverdue": r.get::<_, i64>(1)?,
                "leads": r.get::<_, i64>(2)?,
                "staff": r.get::<_, i64>(3)?,
                "classes": r.get::<_, i64>(4)?
            }))
        },
    );
    let counts = match counts {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, source, data_type, status, total, imported, failed, started_at
         FROM import_jobs WHERE tenant_id = ?
         ORDER BY started_at DESC LIMIT 5",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let jobs = stmt
        .query_map([&tenant_id], |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "source": row.get::<_, String>(1)?,
                "dataType": row.get::<_, String>(2)?,
                "status": row.get::<_, String>(3)?,
                "total": row.get::<_, i64>(4)?,
                "imported": row.get::<_, i64>(5)?,
                "failed": row.get::<_, i64>(6)?,
                "startedAt": row.get::<_, String>(7)?
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match jobs {
        Ok(jobs) => ok(
            &req.id,
            json!({ "counts": counts, "recentJobs": jobs }),
        ),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_tenants_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    // Explicitly delete in dependency order (no ON DELETE CASCADE).
    for table in [
        "import_jobs",
        "members",
        "leads",
        "staff",
        "class_sessions",
    ] {
        let sql = format!("DELETE FROM {} WHERE tenant_id = ?", table);
        if let Err(e) = tx.execute(&sql, [&tenant_id]) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_delete_failed",
                e.to_string(),
                Some(json!({ "table": table })),
            );
        }
    }
    if let Err(e) = tx.execute("DELETE FROM tenants WHERE id = ?", [&tenant_id]) {
        let _ = tx.rollback();
        return err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "tenants" })),
        );
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tenants.create" => Some(handle_tenants_create(state, req)),
        "tenants.list" => Some(handle_tenants_list(state, req)),
        "tenants.summary" => Some(handle_tenants_summary(state, req)),
        "tenants.delete" => Some(handle_tenants_delete(state, req)),
        _ => None,
    }
}
