use serde::Serialize;

use super::TenantViewBuilder;
use crate::workflows::credentials::domain::{ComplianceStatus, Credential, CredentialOwner};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub active: usize,
    pub expiring_soon: usize,
    pub expired: usize,
}

impl StatusCounts {
    pub fn tally<'a>(credentials: impl IntoIterator<Item = &'a Credential>) -> Self {
        let mut counts = Self::default();
        for credential in credentials {
            counts.record(credential.status);
        }
        counts
    }

    pub fn record(&mut self, status: ComplianceStatus) {
        match status {
            ComplianceStatus::Active => self.active += 1,
            ComplianceStatus::ExpiringSoon => self.expiring_soon += 1,
            ComplianceStatus::Expired => self.expired += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.active + self.expiring_soon + self.expired
    }
}

/// One owner's slice of an administrator view.
#[derive(Debug, Clone, Serialize)]
pub struct HolderGroup {
    pub owner: CredentialOwner,
    pub display_name: String,
    pub counts: StatusCounts,
    pub credentials: Vec<Credential>,
}

impl TenantViewBuilder<'_> {
    /// Partition by owner, sorted by display name (case-sensitive). Groups
    /// sharing a name keep first-appearance order; records keep input order.
    pub(crate) fn group_by_owner(&self, credentials: &[Credential]) -> Vec<HolderGroup> {
        let mut groups: Vec<HolderGroup> = Vec::new();

        for credential in credentials {
            let position = groups
                .iter()
                .position(|group| group.owner == credential.owner);
            let group = match position {
                Some(index) => &mut groups[index],
                None => {
                    groups.push(HolderGroup {
                        owner: credential.owner.clone(),
                        display_name: self.display_name(&credential.owner),
                        counts: StatusCounts::default(),
                        credentials: Vec::new(),
                    });
                    let last = groups.len() - 1;
                    &mut groups[last]
                }
            };

            group.counts.record(credential.status);
            group.credentials.push(credential.clone());
        }

        groups.sort_by(|left, right| left.display_name.cmp(&right.display_name));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::credentials::domain::{
        BillingProfile, CredentialCategory, CredentialId, Holder, HolderId, HolderRole,
        Jurisdiction, PlanTier, Tenant, TenantId,
    };
    use crate::workflows::credentials::views::{CredentialFilter, Viewer};
    use chrono::{Duration, NaiveDate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date")
    }

    fn tenant() -> Tenant {
        Tenant {
            id: TenantId("agency-1".to_string()),
            name: "Acme Insurance Agency".to_string(),
            plan: PlanTier::Team,
            max_seats: 5,
            current_seats: 2,
            billing: BillingProfile::default(),
        }
    }

    fn holders() -> Vec<Holder> {
        [("user-1", "Zed Admin"), ("user-2", "alice member")]
            .into_iter()
            .map(|(id, name)| Holder {
                id: HolderId(id.to_string()),
                tenant_id: TenantId("agency-1".to_string()),
                name: name.to_string(),
                email: format!("{id}@acme.test"),
                role: HolderRole::Member,
                regulatory: Default::default(),
            })
            .collect()
    }

    fn credential(id: &str, owner: CredentialOwner, expires_in: i64) -> Credential {
        Credential {
            id: CredentialId(id.to_string()),
            tenant_id: TenantId("agency-1".to_string()),
            owner,
            category: CredentialCategory::LifeAndHealth,
            jurisdiction: Jurisdiction::parse("IA"),
            reference_number: id.to_string(),
            issue_date: None,
            expiry_date: today() + Duration::days(expires_in),
            status: ComplianceStatus::Active,
            resident: false,
            renewal_url: None,
            notes: None,
            documents: Vec::new(),
        }
    }

    #[test]
    fn groups_sort_case_sensitively_and_resolve_agency_identity() {
        let tenant = tenant();
        let holders = holders();
        let credentials = vec![
            credential("a", CredentialOwner::holder("user-2"), 300),
            credential("b", CredentialOwner::holder("user-1"), 10),
            credential("c", CredentialOwner::Agency, -3),
            credential("d", CredentialOwner::holder("user-2"), -1),
            credential("e", CredentialOwner::holder("ghost"), 50),
        ];
        let builder = TenantViewBuilder::new(&tenant, &holders, today());
        let view = builder.build(
            &Viewer::new("user-1", HolderRole::Admin),
            &credentials,
            &CredentialFilter::default(),
        );

        let groups = view.groups.expect("admin view is grouped");
        let names: Vec<_> = groups.iter().map(|g| g.display_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Acme Insurance Agency", "Zed Admin", "alice member", "ghost"]
        );

        let alice = &groups[2];
        let ids: Vec<_> = alice.credentials.iter().map(|c| c.id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        assert_eq!(
            alice.counts,
            StatusCounts {
                active: 1,
                expiring_soon: 0,
                expired: 1
            }
        );
        assert_eq!(groups[0].counts.expired, 1);
        assert_eq!(view.counts.total(), 5);
    }

    #[test]
    fn owner_filter_disables_grouping() {
        let tenant = tenant();
        let holders = holders();
        let credentials = vec![credential("a", CredentialOwner::holder("user-2"), 300)];
        let builder = TenantViewBuilder::new(&tenant, &holders, today());
        let view = builder.build(
            &Viewer::new("user-1", HolderRole::Admin),
            &credentials,
            &CredentialFilter::default().with_owner(CredentialOwner::holder("user-2")),
        );
        assert!(view.groups.is_none());
        assert_eq!(view.credentials.len(), 1);
    }
}
