use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::import::{run_import, DataType, ImportReport, RecordStore};

const FIRST_NAMES: &[&str] = &[
    "Ava", "Ben", "Carla", "Dmitri", "Elena", "Frank", "Grace", "Hassan", "Isabel", "Jonas",
    "Keiko", "Liam", "Maria", "Noah", "Olivia", "Pedro", "Quinn", "Rosa", "Sam", "Tara",
];

const LAST_NAMES: &[&str] = &[
    "Alvarez", "Brooks", "Chen", "Dawson", "Evans", "Ferreira", "Grant", "Hoffman", "Ito",
    "Jensen", "Khan", "Lopez", "Murray", "Novak", "Okafor", "Petrov", "Reyes", "Silva",
    "Tanaka", "Weber",
];

// First role is always handed out once so every demo tenant has a manager.
const STAFF_ROLE_POOL: &[&str] = &["Manager", "Head Coach", "Instructor", "Front Desk", "Coach"];

const MEMBERSHIP_TYPES: &[&str] = &["monthly", "annual", "class-pack", "drop-in"];

// Weighted toward active: demo dashboards should look like a healthy club.
const MEMBER_STATUS_POOL: &[&str] = &[
    "active", "active", "active", "active", "active", "active", "inactive", "frozen", "cancelled",
];

const LEAD_STATUS_POOL: &[&str] = &["new", "new", "contacted", "contacted", "qualified", "lost"];

const LEAD_SOURCES: &[&str] = &["Walk-in", "Website", "Instagram", "Referral", "Google Ads"];

const WEEKDAYS: &[&str] = &[
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

const TIME_SLOTS: &[&str] = &["06:00", "09:00", "12:00", "17:30", "19:00"];

struct ClassTemplate {
    name: &'static str,
    duration: i64,
    capacity: i64,
}

const GYM_CLASSES: &[ClassTemplate] = &[
    ClassTemplate { name: "Strength Training", duration: 60, capacity: 25 },
    ClassTemplate { name: "HIIT Circuit", duration: 45, capacity: 20 },
    ClassTemplate { name: "Spin", duration: 45, capacity: 18 },
    ClassTemplate { name: "Bootcamp", duration: 60, capacity: 30 },
    ClassTemplate { name: "Stretch & Mobility", duration: 30, capacity: 15 },
];

const YOGA_CLASSES: &[ClassTemplate] = &[
    ClassTemplate { name: "Vinyasa Flow", duration: 60, capacity: 20 },
    ClassTemplate { name: "Hot Yoga", duration: 75, capacity: 25 },
    ClassTemplate { name: "Yin Yoga", duration: 60, capacity: 15 },
    ClassTemplate { name: "Power Yoga", duration: 45, capacity: 20 },
];

const CROSSFIT_CLASSES: &[ClassTemplate] = &[
    ClassTemplate { name: "WOD", duration: 60, capacity: 16 },
    ClassTemplate { name: "Olympic Lifting", duration: 90, capacity: 12 },
    ClassTemplate { name: "Metcon", duration: 45, capacity: 16 },
    ClassTemplate { name: "Gymnastics Skills", duration: 60, capacity: 10 },
];

const PILATES_CLASSES: &[ClassTemplate] = &[
    ClassTemplate { name: "Mat Pilates", duration: 55, capacity: 12 },
    ClassTemplate { name: "Reformer", duration: 50, capacity: 8 },
    ClassTemplate { name: "Core Focus", duration: 45, capacity: 14 },
];

const MARTIAL_ARTS_CLASSES: &[ClassTemplate] = &[
    ClassTemplate { name: "Brazilian Jiu-Jitsu", duration: 90, capacity: 24 },
    ClassTemplate { name: "Muay Thai", duration: 60, capacity: 20 },
    ClassTemplate { name: "Boxing Fundamentals", duration: 60, capacity: 18 },
    ClassTemplate { name: "Kids Karate", duration: 45, capacity: 15 },
];

fn class_templates(industry: &str) -> &'static [ClassTemplate] {
    match industry {
        "yoga" => YOGA_CLASSES,
        "crossfit" => CROSSFIT_CLASSES,
        "pilates" => PILATES_CLASSES,
        "martial-arts" => MARTIAL_ARTS_CLASSES,
        _ => GYM_CLASSES,
    }
}

fn random_person(rng: &mut impl Rng) -> (String, String) {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Smith");
    let name = format!("{} {}", first, last);
    let email = format!(
        "{}.{}{}@example.com",
        first.to_lowercase(),
        last.to_lowercase(),
        rng.gen_range(1..1000)
    );
    (name, email)
}

fn random_phone(rng: &mut impl Rng) -> String {
    format!("813-555-{:04}", rng.gen_range(0..10000u32))
}

fn recent_date(rng: &mut impl Rng, window_days: i64) -> String {
    let d = Utc::now().date_naive() - Duration::days(rng.gen_range(0..window_days));
    d.format("%Y-%m-%d").to_string()
}

fn staff_rows(rng: &mut impl Rng) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "name".to_string(),
        "email".to_string(),
        "role".to_string(),
        "hourly_rate".to_string(),
        "hire_date".to_string(),
    ]];
    let count = rng.gen_range(4..=6);
    for i in 0..count {
        let (name, email) = random_person(rng);
        let role = STAFF_ROLE_POOL[i.min(STAFF_ROLE_POOL.len() - 1)];
        let rate = format!("{:.2}", rng.gen_range(18.0..45.0));
        rows.push(vec![
            name,
            email,
            role.to_string(),
            rate,
            recent_date(rng, 3 * 365),
        ]);
    }
    rows
}

fn class_rows(rng: &mut impl Rng, industry: &str) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "name".to_string(),
        "duration".to_string(),
        "capacity".to_string(),
        "day_of_week".to_string(),
        "time".to_string(),
    ]];
    for t in class_templates(industry) {
        let day = WEEKDAYS.choose(rng).copied().unwrap_or("Monday");
        let slot = TIME_SLOTS.choose(rng).copied().unwrap_or("09:00");
        rows.push(vec![
            t.name.to_string(),
            t.duration.to_string(),
            t.capacity.to_string(),
            day.to_string(),
            slot.to_string(),
        ]);
    }
    rows
}

fn member_rows(rng: &mut impl Rng) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "name".to_string(),
        "email".to_string(),
        "phone".to_string(),
        "membership_type".to_string(),
        "status".to_string(),
        "join_date".to_string(),
        "payment_status".to_string(),
    ]];
    let count = rng.gen_range(25..=40);
    for _ in 0..count {
        let (name, email) = random_person(rng);
        let status = MEMBER_STATUS_POOL.choose(rng).copied().unwrap_or("active");
        let payment = if rng.gen_bool(0.15) { "overdue" } else { "current" };
        rows.push(vec![
            name,
            email,
            random_phone(rng),
            MEMBERSHIP_TYPES.choose(rng).copied().unwrap_or("monthly").to_string(),
            status.to_string(),
            recent_date(rng, 365),
            payment.to_string(),
        ]);
    }
    rows
}

fn lead_rows(rng: &mut impl Rng) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "name".to_string(),
        "email".to_string(),
        "phone".to_string(),
        "status".to_string(),
        "source".to_string(),
    ]];
    let count = rng.gen_range(8..=15);
    for _ in 0..count {
        let (name, email) = random_person(rng);
        rows.push(vec![
            name,
            email,
            random_phone(rng),
            LEAD_STATUS_POOL.choose(rng).copied().unwrap_or("new").to_string(),
            LEAD_SOURCES.choose(rng).copied().unwrap_or("Walk-in").to_string(),
        ]);
    }
    rows
}

/// Seed one tenant with synthetic staff, classes, members and leads.
/// Generated rows go through the same batch runner and job ledger as a CSV
/// upload (source label "demo"), so the mapping/validation contract has a
/// single implementation.
pub fn seed_tenant(
    store: &dyn RecordStore,
    tenant_id: &str,
    industry: &str,
) -> anyhow::Result<Vec<(DataType, ImportReport)>> {
    let mut rng = rand::thread_rng();
    let batches = [
        (DataType::Staff, staff_rows(&mut rng)),
        (DataType::Classes, class_rows(&mut rng, industry)),
        (DataType::Members, member_rows(&mut rng)),
        (DataType::Leads, lead_rows(&mut rng)),
    ];

    let mut reports = Vec::new();
    for (data_type, rows) in batches {
        let report = run_import(store, tenant_id, data_type, &rows, "demo", None)?;
        reports.push((data_type, report));
    }
    Ok(reports)
}
