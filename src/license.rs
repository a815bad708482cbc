//! License key format and issuance.
//!
//! Keys look like `CE-AB12-CD34-EF56`: the `CE` prefix followed by 12
//! uppercase hex digits (6 random bytes) in three groups of four.

use std::sync::LazyLock;

use rand::{RngCore, rngs::OsRng};
use regex::Regex;

use crate::db::LicenseStore;
use crate::error::Result;
use crate::models::License;

pub const LICENSE_KEY_PREFIX: &str = "CE";

/// Random bytes per key (48 bits of entropy).
const KEY_BYTES: usize = 6;

static LICENSE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^CE-[A-F0-9]{4}-[A-F0-9]{4}-[A-F0-9]{4}$").expect("license key pattern compiles")
});

/// Generate a new license key from the OS CSPRNG.
pub fn generate_license_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let hex = hex::encode_upper(bytes);

    format!(
        "{}-{}-{}-{}",
        LICENSE_KEY_PREFIX,
        &hex[0..4],
        &hex[4..8],
        &hex[8..12]
    )
}

/// Trim surrounding whitespace and uppercase, the form keys are stored in.
pub fn normalize_license_key(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Strict format check. Expects already-normalized input.
pub fn is_valid_license_key(key: &str) -> bool {
    LICENSE_KEY_RE.is_match(key)
}

/// Outcome of processing a purchase for one email.
#[derive(Debug, Clone)]
pub struct IssuedLicense {
    pub license: License,
    /// True when the email already owned a key and it was kept
    pub reused: bool,
}

/// Issue (or re-issue) the license for `email`.
///
/// An email that already has a license keeps its key; otherwise a new key
/// is minted. Either way the full record is upserted as `active`.
///
/// The lookup and the upsert are not fenced: two concurrent deliveries for
/// the same new email can each mint a key.
pub async fn issue_license(
    store: &dyn LicenseStore,
    email: &str,
    stripe_customer_id: Option<String>,
    stripe_session_id: Option<String>,
) -> Result<IssuedLicense> {
    let (license_key, reused) = match store.find_by_email(email).await? {
        Some(existing) => {
            if !is_valid_license_key(&existing.license_key) {
                tracing::warn!(
                    email = %email,
                    license_key = %existing.license_key,
                    "Reusing stored license key with unexpected format"
                );
            }
            (existing.license_key, true)
        }
        None => {
            let key = generate_license_key();
            debug_assert!(is_valid_license_key(&key));
            (key, false)
        }
    };

    let license = License::new_active(
        license_key,
        email.to_string(),
        stripe_customer_id,
        stripe_session_id,
    );
    store.upsert_license(&license).await?;

    Ok(IssuedLicense { license, reused })
}
