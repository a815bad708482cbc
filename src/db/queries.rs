use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::models::License;

const LICENSE_COLS: &str = "license_key, email, stripe_customer_id, stripe_session_id, status";

fn now() -> i64 {
    Utc::now().timestamp()
}

fn license_from_row(row: &Row) -> rusqlite::Result<License> {
    Ok(License {
        license_key: row.get(0)?,
        email: row.get(1)?,
        stripe_customer_id: row.get(2)?,
        stripe_session_id: row.get(3)?,
        status: row.get(4)?,
    })
}

// ============ Licenses ============

/// Oldest license for an email. At most one is expected.
pub fn get_license_by_email(conn: &Connection, email: &str) -> Result<Option<License>> {
    let license = conn
        .query_row(
            &format!(
                "SELECT {} FROM licenses WHERE email = ?1 ORDER BY created_at, rowid LIMIT 1",
                LICENSE_COLS
            ),
            params![email],
            license_from_row,
        )
        .optional()?;
    Ok(license)
}

pub fn get_license_by_key(conn: &Connection, license_key: &str) -> Result<Option<License>> {
    let license = conn
        .query_row(
            &format!("SELECT {} FROM licenses WHERE license_key = ?1", LICENSE_COLS),
            params![license_key],
            license_from_row,
        )
        .optional()?;
    Ok(license)
}

/// Insert a license, replacing every column but `created_at` when the key exists.
pub fn upsert_license(conn: &Connection, license: &License) -> Result<()> {
    conn.execute(
        "INSERT INTO licenses (license_key, email, stripe_customer_id, stripe_session_id, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(license_key) DO UPDATE SET
             email = excluded.email,
             stripe_customer_id = excluded.stripe_customer_id,
             stripe_session_id = excluded.stripe_session_id,
             status = excluded.status",
        params![
            &license.license_key,
            &license.email,
            &license.stripe_customer_id,
            &license.stripe_session_id,
            &license.status,
            now()
        ],
    )?;
    Ok(())
}

pub fn count_licenses_for_email(conn: &Connection, email: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM licenses WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(count)
}
