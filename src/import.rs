use std::collections::HashMap;

use anyhow::anyhow;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::csv;

/// Display row number for a zero-based data-row index: rows are shown
/// 1-based and the header occupies row 1, so data row 0 is row 2.
pub fn display_row_number(zero_based: usize) -> usize {
    zero_based + 2
}

/// Errors returned to the caller are capped at this many; the job ledger
/// keeps the full list.
pub const MAX_ERRORS_RETURNED: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Members,
    Leads,
    Staff,
    Classes,
}

impl DataType {
    pub fn from_selector(s: &str) -> Option<Self> {
        match s {
            "members" => Some(Self::Members),
            "leads" => Some(Self::Leads),
            "staff" => Some(Self::Staff),
            "classes" => Some(Self::Classes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::Leads => "leads",
            Self::Staff => "staff",
            Self::Classes => "classes",
        }
    }
}

// ---------------------------------------------------------------------------
// Field resolution
// ---------------------------------------------------------------------------

/// Canonical-key -> raw-cell map for one data row. Built by inserting in
/// column order, so when two headers normalize to the same key the later
/// column wins.
pub fn normalized_record(headers: &[String], cells: &[String]) -> HashMap<String, String> {
    let mut rec = HashMap::new();
    for (i, key) in headers.iter().enumerate() {
        let value = cells.get(i).cloned().unwrap_or_default();
        rec.insert(key.clone(), value);
    }
    rec
}

fn non_empty(rec: &HashMap<String, String>, key: &str) -> Option<String> {
    rec.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Consult alias columns in order until one yields a non-empty value.
fn resolve(rec: &HashMap<String, String>, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|key| non_empty(rec, key))
}

/// name <- full_name <- first_name + " " + last_name
fn resolve_name(rec: &HashMap<String, String>) -> Option<String> {
    if let Some(v) = resolve(rec, &["name", "full_name"]) {
        return Some(v);
    }
    let parts: Vec<String> = [non_empty(rec, "first_name"), non_empty(rec, "last_name")]
        .into_iter()
        .flatten()
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Ordered substring probes; first hit wins, otherwise the default.
fn match_enum(raw: Option<&str>, pairs: &[(&str, &str)], default: &str) -> String {
    let Some(raw) = raw else {
        return default.to_string();
    };
    let lower = raw.to_lowercase();
    for (needle, canonical) in pairs {
        if lower.contains(needle) {
            return canonical.to_string();
        }
    }
    default.to_string()
}

// "inactive" is probed before "active": plain containment would otherwise
// classify every inactive member as active.
const MEMBER_STATUSES: &[(&str, &str)] = &[
    ("inactive", "inactive"),
    ("expired", "inactive"),
    ("frozen", "frozen"),
    ("hold", "frozen"),
    ("cancel", "cancelled"),
    ("active", "active"),
];

const LEAD_STATUSES: &[(&str, &str)] = &[
    ("contacted", "contacted"),
    ("qualified", "qualified"),
    ("converted", "converted"),
    ("won", "converted"),
    ("lost", "lost"),
    ("closed", "lost"),
    ("new", "new"),
];

const STAFF_ROLES: &[(&str, &str)] = &[
    ("manager", "manager"),
    ("head", "head-coach"),
    ("lead", "head-coach"),
    ("instructor", "instructor"),
    ("front", "front-desk"),
    ("desk", "front-desk"),
    ("reception", "front-desk"),
];

/// Direct ISO parse first; otherwise split on `/` or `-` into three
/// numeric parts. First part over 12 means day-first, else month-first.
/// Anything that does not reassemble into a real date yields None and the
/// caller falls back to the import-time date.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    let parts: Vec<&str> = raw.split(['/', '-']).collect();
    if parts.len() != 3 {
        return None;
    }
    let a: u32 = parts[0].trim().parse().ok()?;
    let b: u32 = parts[1].trim().parse().ok()?;
    let c: i32 = parts[2].trim().parse().ok()?;
    let (year, month, day) = if a > 12 { (c, b, a) } else { (c, a, b) };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_rate(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_start_matches('$').replace(',', "");
    s.parse().ok()
}

fn parse_count(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

// ---------------------------------------------------------------------------
// Entity builders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MemberRecord {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub membership_type: Option<String>,
    pub status: String,
    pub join_date: String,
    pub payment_status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeadRecord {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaffRecord {
    pub name: String,
    pub email: String,
    pub role: String,
    pub hourly_rate: Option<f64>,
    pub hire_date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassRecord {
    pub name: String,
    pub duration_minutes: i64,
    pub capacity: i64,
    pub day_of_week: String,
    pub start_time: String,
}

fn date_or_default(raw: Option<&str>, today: NaiveDate) -> String {
    raw.and_then(parse_flexible_date)
        .unwrap_or(today)
        .format("%Y-%m-%d")
        .to_string()
}

pub fn build_member(
    rec: &HashMap<String, String>,
    today: NaiveDate,
) -> anyhow::Result<MemberRecord> {
    let name = resolve_name(rec);
    let email = resolve(rec, &["email", "email_address"]);
    let (Some(name), Some(email)) = (name, email) else {
        return Err(anyhow!("Name and email are required"));
    };
    let status = match_enum(non_empty(rec, "status").as_deref(), MEMBER_STATUSES, "active");
    Ok(MemberRecord {
        name,
        email,
        phone: resolve(rec, &["phone", "phone_number"]),
        membership_type: non_empty(rec, "membership_type"),
        status,
        join_date: date_or_default(non_empty(rec, "join_date").as_deref(), today),
        payment_status: non_empty(rec, "payment_status").unwrap_or_else(|| "current".to_string()),
    })
}

pub fn build_lead(rec: &HashMap<String, String>) -> anyhow::Result<LeadRecord> {
    let name = resolve_name(rec);
    let email = resolve(rec, &["email", "email_address"]);
    let (Some(name), Some(email)) = (name, email) else {
        return Err(anyhow!("Name and email are required"));
    };
    Ok(LeadRecord {
        name,
        email,
        phone: resolve(rec, &["phone", "phone_number"]),
        status: match_enum(non_empty(rec, "status").as_deref(), LEAD_STATUSES, "new"),
        source: non_empty(rec, "source").unwrap_or_else(|| "Import".to_string()),
    })
}

pub fn build_staff(
    rec: &HashMap<String, String>,
    today: NaiveDate,
) -> anyhow::Result<StaffRecord> {
    let name = resolve_name(rec);
    let email = resolve(rec, &["email", "email_address"]);
    let (Some(name), Some(email)) = (name, email) else {
        return Err(anyhow!("Name and email are required"));
    };
    let role_raw = resolve(rec, &["role", "position"]);
    Ok(StaffRecord {
        name,
        email,
        role: match_enum(role_raw.as_deref(), STAFF_ROLES, "coach"),
        hourly_rate: non_empty(rec, "hourly_rate").as_deref().and_then(parse_rate),
        hire_date: date_or_default(non_empty(rec, "hire_date").as_deref(), today),
    })
}

pub fn build_class(rec: &HashMap<String, String>) -> anyhow::Result<ClassRecord> {
    let Some(name) = resolve(rec, &["name", "class_name"]) else {
        return Err(anyhow!("Class name is required"));
    };
    Ok(ClassRecord {
        name,
        duration_minutes: parse_count(non_empty(rec, "duration").as_deref(), 60),
        capacity: parse_count(non_empty(rec, "capacity").as_deref(), 20),
        day_of_week: non_empty(rec, "day_of_week").unwrap_or_else(|| "Monday".to_string()),
        start_time: non_empty(rec, "time").unwrap_or_else(|| "09:00".to_string()),
    })
}

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

pub struct NewJob<'a> {
    pub id: &'a str,
    pub tenant_id: &'a str,
    pub source: &'a str,
    pub data_type: DataType,
    pub total: usize,
    pub checksum: Option<&'a str>,
    pub started_at: &'a str,
}

/// Persistence seam for the batch runner and job ledger. The production
/// implementation writes to the workspace SQLite database; tests substitute
/// an in-memory fake.
pub trait RecordStore {
    fn insert_member(&self, tenant_id: &str, rec: &MemberRecord) -> anyhow::Result<()>;
    fn insert_lead(&self, tenant_id: &str, rec: &LeadRecord) -> anyhow::Result<()>;
    fn insert_staff(&self, tenant_id: &str, rec: &StaffRecord) -> anyhow::Result<()>;
    fn insert_class(&self, tenant_id: &str, rec: &ClassRecord) -> anyhow::Result<()>;
    fn create_job(&self, job: &NewJob) -> anyhow::Result<()>;
    fn finalize_job(
        &self,
        job_id: &str,
        imported: usize,
        failed: usize,
        error_log: &str,
        completed_at: &str,
    ) -> anyhow::Result<()>;
}

pub struct SqliteStore<'a> {
    pub conn: &'a Connection,
}

impl RecordStore for SqliteStore<'_> {
    fn insert_member(&self, tenant_id: &str, rec: &MemberRecord) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO members(id, tenant_id, name, email, phone, membership_type,
                                 status, join_date, payment_status, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                tenant_id,
                rec.name,
                rec.email,
                rec.phone,
                rec.membership_type,
                rec.status,
                rec.join_date,
                rec.payment_status,
                now_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn insert_lead(&self, tenant_id: &str, rec: &LeadRecord) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO leads(id, tenant_id, name, email, phone, status, source, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                tenant_id,
                rec.name,
                rec.email,
                rec.phone,
                rec.status,
                rec.source,
                now_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn insert_staff(&self, tenant_id: &str, rec: &StaffRecord) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO staff(id, tenant_id, name, email, role, hourly_rate, hire_date, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                tenant_id,
                rec.name,
                rec.email,
                rec.role,
                rec.hourly_rate,
                rec.hire_date,
                now_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn insert_class(&self, tenant_id: &str, rec: &ClassRecord) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO class_sessions(id, tenant_id, name, duration_minutes, capacity,
                                        day_of_week, start_time, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                Uuid::new_v4().to_string(),
                tenant_id,
                rec.name,
                rec.duration_minutes,
                rec.capacity,
                rec.day_of_week,
                rec.start_time,
                now_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn create_job(&self, job: &NewJob) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO import_jobs(id, tenant_id, source, data_type, status, total,
                                     imported, failed, error_log, checksum, started_at)
             VALUES(?, ?, ?, ?, 'processing', ?, 0, 0, '[]', ?, ?)",
            rusqlite::params![
                job.id,
                job.tenant_id,
                job.source,
                job.data_type.as_str(),
                job.total as i64,
                job.checksum,
                job.started_at,
            ],
        )?;
        Ok(())
    }

    fn finalize_job(
        &self,
        job_id: &str,
        imported: usize,
        failed: usize,
        error_log: &str,
        completed_at: &str,
    ) -> anyhow::Result<()> {
        self.conn.execute(
            "UPDATE import_jobs
             SET status = 'completed', imported = ?, failed = ?, error_log = ?, completed_at = ?
             WHERE id = ?",
            rusqlite::params![imported as i64, failed as i64, error_log, completed_at, job_id],
        )?;
        Ok(())
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ---------------------------------------------------------------------------
// Batch runner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RowError {
    pub row: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

/// Process every data row of a parsed table independently. Row failures
/// (validation or store write) are recorded and counted; they never abort
/// the batch.
pub fn run_batch(
    store: &dyn RecordStore,
    tenant_id: &str,
    data_type: DataType,
    rows: &[Vec<String>],
    today: NaiveDate,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    if rows.is_empty() {
        return outcome;
    }
    let headers = csv::normalize_headers(&rows[0]);

    for (i, cells) in rows[1..].iter().enumerate() {
        let rec = normalized_record(&headers, cells);
        let result = match data_type {
            DataType::Members => {
                build_member(&rec, today).and_then(|m| store.insert_member(tenant_id, &m))
            }
            DataType::Leads => build_lead(&rec).and_then(|l| store.insert_lead(tenant_id, &l)),
            DataType::Staff => {
                build_staff(&rec, today).and_then(|s| store.insert_staff(tenant_id, &s))
            }
            DataType::Classes => build_class(&rec).and_then(|c| store.insert_class(tenant_id, &c)),
        };
        match result {
            Ok(()) => outcome.imported += 1,
            Err(e) => {
                outcome.failed += 1;
                outcome.errors.push(RowError {
                    row: display_row_number(i),
                    error: e.to_string(),
                });
            }
        }
    }
    outcome
}

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub job_id: String,
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

/// Wrap one batch run with job-ledger bookkeeping: create the job as
/// `processing`, drain the batch, then write counts and the full error log
/// in a single `completed` update. A failed row is a data-quality outcome;
/// only ledger I/O faults propagate to the caller.
pub fn run_import(
    store: &dyn RecordStore,
    tenant_id: &str,
    data_type: DataType,
    rows: &[Vec<String>],
    source: &str,
    checksum: Option<&str>,
) -> anyhow::Result<ImportReport> {
    let job_id = Uuid::new_v4().to_string();
    let total = rows.len().saturating_sub(1);
    store.create_job(&NewJob {
        id: &job_id,
        tenant_id,
        source,
        data_type,
        total,
        checksum,
        started_at: &now_rfc3339(),
    })?;

    let today = chrono::Utc::now().date_naive();
    let outcome = run_batch(store, tenant_id, data_type, rows, today);

    let error_log = serde_json::to_string(&outcome.errors)?;
    store.finalize_job(
        &job_id,
        outcome.imported,
        outcome.failed,
        &error_log,
        &now_rfc3339(),
    )?;

    Ok(ImportReport {
        job_id,
        total,
        imported: outcome.imported,
        failed: outcome.failed,
        errors: outcome.errors,
    })
}
