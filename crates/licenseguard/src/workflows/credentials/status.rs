use chrono::NaiveDate;

use super::domain::{ComplianceStatus, Credential};

/// Credentials expiring within this many days (inclusive) are `expiring-soon`.
pub const EXPIRING_SOON_WINDOW_DAYS: i64 = 90;

/// Whole calendar days from `today` until `expiry`; negative once expired.
pub fn days_remaining(expiry: NaiveDate, today: NaiveDate) -> i64 {
    expiry.signed_duration_since(today).num_days()
}

pub fn derive_status(expiry: NaiveDate, today: NaiveDate) -> ComplianceStatus {
    match days_remaining(expiry, today) {
        days if days < 0 => ComplianceStatus::Expired,
        days if days <= EXPIRING_SOON_WINDOW_DAYS => ComplianceStatus::ExpiringSoon,
        _ => ComplianceStatus::Active,
    }
}

/// Re-derive the cached status of every record in place.
pub fn annotate(credentials: &mut [Credential], today: NaiveDate) {
    for credential in credentials {
        credential.refresh_status(today);
    }
}
