use tracing::debug;

use super::domain::{Credential, CredentialId};

/// Keep at most one resident credential per owner: when `saved` is flagged
/// resident, clear the flag on every other record of the same owner.
///
/// `records` may contain other owners' credentials; those are never touched.
/// Returns the ids whose flag was cleared so callers can persist them in the
/// same unit as `saved`.
pub fn normalize_resident(saved: &Credential, records: &mut [Credential]) -> Vec<CredentialId> {
    if !saved.resident {
        return Vec::new();
    }

    let mut cleared = Vec::new();
    for other in records
        .iter_mut()
        .filter(|other| other.id != saved.id && other.owner == saved.owner && other.resident)
    {
        other.resident = false;
        cleared.push(other.id.clone());
    }

    if !cleared.is_empty() {
        debug!(
            credential = %saved.id,
            owner = %saved.owner,
            cleared = cleared.len(),
            "resident flag moved to latest save"
        );
    }

    cleared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::credentials::domain::{
        ComplianceStatus, CredentialCategory, CredentialOwner, Jurisdiction, TenantId,
    };
    use chrono::NaiveDate;

    fn credential(id: &str, owner: &str, resident: bool) -> Credential {
        Credential {
            id: CredentialId(id.to_string()),
            tenant_id: TenantId("agency-1".to_string()),
            owner: CredentialOwner::holder(owner),
            category: CredentialCategory::LifeAndHealth,
            jurisdiction: Jurisdiction::parse("CA"),
            reference_number: format!("REF-{id}"),
            issue_date: None,
            expiry_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid"),
            status: ComplianceStatus::Active,
            resident,
            renewal_url: None,
            notes: None,
            documents: Vec::new(),
        }
    }

    #[test]
    fn resident_save_clears_siblings_only() {
        let saved = credential("lic-2", "H1", true);
        let mut records = vec![
            credential("lic-1", "H1", true),
            credential("lic-2", "H1", true),
            credential("lic-3", "H2", true),
        ];

        let cleared = normalize_resident(&saved, &mut records);

        assert_eq!(cleared, vec![CredentialId("lic-1".to_string())]);
        assert!(!records[0].resident);
        assert!(records[1].resident, "the saved record keeps its flag");
        assert!(records[2].resident, "other holders are untouched");
    }

    #[test]
    fn non_resident_save_touches_nothing() {
        let saved = credential("lic-2", "H1", false);
        let mut records = vec![credential("lic-1", "H1", true)];

        assert!(normalize_resident(&saved, &mut records).is_empty());
        assert!(records[0].resident);
    }
}
