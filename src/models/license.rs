use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Known license states. Any stored value other than `active` disables the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LicenseStatus {
    Active,
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// `CE-XXXX-XXXX-XXXX`, primary key
    pub license_key: String,
    pub email: String,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    #[serde(default)]
    pub stripe_session_id: Option<String>,
    /// Raw status column; `None` or empty reads as active
    #[serde(default)]
    pub status: Option<String>,
}

impl License {
    /// A freshly issued license in the `active` state.
    pub fn new_active(
        license_key: String,
        email: String,
        stripe_customer_id: Option<String>,
        stripe_session_id: Option<String>,
    ) -> Self {
        Self {
            license_key,
            email,
            stripe_customer_id,
            stripe_session_id,
            status: Some(LicenseStatus::Active.as_ref().to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        match self.status.as_deref() {
            None | Some("") => true,
            Some(s) => matches!(s.parse::<LicenseStatus>(), Ok(LicenseStatus::Active)),
        }
    }
}
