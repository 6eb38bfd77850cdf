use super::tenants::tenant_exists;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn list_rows(
    conn: &Connection,
    sql: &str,
    tenant_id: &str,
    to_json: impl Fn(&rusqlite::Row) -> rusqlite::Result<serde_json::Value>,
) -> rusqlite::Result<Vec<serde_json::Value>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([tenant_id], |row| to_json(row))?;
    rows.collect()
}

fn handle_list(
    state: &mut AppState,
    req: &Request,
    key: &str,
    sql: &str,
    to_json: impl Fn(&rusqlite::Row) -> rusqlite::Result<serde_json::Value>,
) -> serde_json::Value {
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

    match list_rows(conn, sql, &tenant_id, to_json) {
        Ok(rows) => ok(&req.id, json!({ key: rows })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_members_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    handle_list(
        state,
        req,
        "members",
        "SELECT id, name, email, phone, membership_type, status, join_date, payment_status
         FROM members WHERE tenant_id = ? ORDER BY name",
        |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "email": row.get::<_, String>(2)?,
                "phone": row.get::<_, Option<String>>(3)?,
                "membershipType": row.get::<_, Option<String>>(4)?,
                "status": row.get::<_, String>(5)?,
                "joinDate": row.get::<_, String>(6)?,
                "paymentStatus": row.get::<_, String>(7)?
            }))
        },
    )
}

fn handle_leads_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    handle_list(
        state,
        req,
        "leads",
        "SELECT id, name, email, phone, status, source
         FROM leads WHERE tenant_id = ? ORDER BY name",
        |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "email": row.get::<_, String>(2)?,
                "phone": row.get::<_, Option<String>>(3)?,
                "status": row.get::<_, String>(4)?,
                "source": row.get::<_, String>(5)?
            }))
        },
    )
}

fn handle_staff_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    handle_list(
        state,
        req,
        "staff",
        "SELECT id, name, email, role, hourly_rate, hire_date
         FROM staff WHERE tenant_id = ? ORDER BY name",
        |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "email": row.get::<_, String>(2)?,
                "role": row.get::<_, String>(3)?,
                "hourlyRate": row.get::<_, Option<f64>>(4)?,
                "hireDate": row.get::<_, String>(5)?
            }))
        },
    )
}

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    handle_list(
        state,
        req,
        "classes",
        "SELECT id, name, duration_minutes, capacity, day_of_week, start_time
         FROM class_sessions WHERE tenant_id = ? ORDER BY name",
        |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "durationMinutes": row.get::<_, i64>(2)?,
                "capacity": row.get::<_, i64>(3)?,
                "dayOfWeek": row.get::<_, String>(4)?,
                "startTime": row.get::<_, String>(5)?
            }))
        },
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "members.list" => Some(handle_members_list(state, req)),
        "leads.list" => Some(handle_leads_list(state, req)),
        "staff.list" => Some(handle_staff_list(state, req)),
        "classes.list" => Some(handle_classes_list(state, req)),
        _ => None,
    }
}
