mod grouping;
mod projections;

pub use grouping::{HolderGroup, StatusCounts};
pub use projections::{CalendarDay, CalendarView, DashboardSummary, UpcomingRenewal};

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    ComplianceStatus, Credential, CredentialCategory, CredentialOwner, Holder, HolderId,
    HolderRole, Jurisdiction, Tenant,
};

/// The person a view is being built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub holder_id: HolderId,
    pub role: HolderRole,
}

impl Viewer {
    pub fn new(holder_id: impl Into<String>, role: HolderRole) -> Self {
        Self {
            holder_id: HolderId(holder_id.into()),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == HolderRole::Admin
    }

    /// Members only see their own credentials; administrators see the whole agency.
    pub fn can_see(&self, credential: &Credential) -> bool {
        match self.role {
            HolderRole::Admin => true,
            HolderRole::Member => {
                matches!(&credential.owner, CredentialOwner::Holder(id) if id == &self.holder_id)
            }
        }
    }
}

impl From<&Holder> for Viewer {
    fn from(holder: &Holder) -> Self {
        Self {
            holder_id: holder.id.clone(),
            role: holder.role,
        }
    }
}

/// Composable predicates; every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialFilter {
    pub status: Option<ComplianceStatus>,
    pub owner: Option<CredentialOwner>,
    pub category: Option<CredentialCategory>,
    pub jurisdiction: Option<Jurisdiction>,
    pub search: Option<String>,
}

impl CredentialFilter {
    pub fn with_status(mut self, status: ComplianceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_owner(mut self, owner: CredentialOwner) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_category(mut self, category: CredentialCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_jurisdiction(mut self, jurisdiction: Jurisdiction) -> Self {
        self.jurisdiction = Some(jurisdiction);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// `credential.status` must already be derived for the evaluation date.
    pub fn matches(&self, credential: &Credential) -> bool {
        if self
            .status
            .is_some_and(|status| credential.status != status)
        {
            return false;
        }

        if self
            .owner
            .as_ref()
            .is_some_and(|owner| !credential.is_owned_by(owner))
        {
            return false;
        }

        if self
            .category
            .as_ref()
            .is_some_and(|category| !credential.category.same_kind(category))
        {
            return false;
        }

        if self
            .jurisdiction
            .as_ref()
            .is_some_and(|jurisdiction| &credential.jurisdiction != jurisdiction)
        {
            return false;
        }

        match self.search_term() {
            Some(term) => [
                credential.category.display_name(),
                credential.reference_number.clone(),
                credential.jurisdiction.code().to_string(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&term)),
            None => true,
        }
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }
}

/// Filtered credentials plus, for administrators, the per-holder rollup.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialView {
    pub viewer: Viewer,
    pub today: NaiveDate,
    pub counts: StatusCounts,
    pub credentials: Vec<Credential>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<HolderGroup>>,
}

/// Builds read-only projections of one agency's credentials for a viewer.
#[derive(Debug)]
pub struct TenantViewBuilder<'a> {
    tenant: &'a Tenant,
    holders: HashMap<&'a HolderId, &'a Holder>,
    holder_count: usize,
    today: NaiveDate,
}

impl<'a> TenantViewBuilder<'a> {
    pub fn new(tenant: &'a Tenant, holders: &'a [Holder], today: NaiveDate) -> Self {
        let directory = holders
            .iter()
            .filter(|holder| holder.tenant_id == tenant.id)
            .map(|holder| (&holder.id, holder))
            .collect::<HashMap<_, _>>();

        Self {
            tenant,
            holder_count: directory.len(),
            holders: directory,
            today,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Credentials inside the viewer's scope, statuses re-derived, input order kept.
    pub fn visible(&self, viewer: &Viewer, credentials: &[Credential]) -> Vec<Credential> {
        credentials
            .iter()
            .filter(|credential| credential.tenant_id == self.tenant.id)
            .filter(|credential| viewer.can_see(credential))
            .cloned()
            .map(|credential| credential.annotated(self.today))
            .collect()
    }

    pub fn build(
        &self,
        viewer: &Viewer,
        credentials: &[Credential],
        filter: &CredentialFilter,
    ) -> CredentialView {
        let filtered: Vec<Credential> = self
            .visible(viewer, credentials)
            .into_iter()
            .filter(|credential| filter.matches(credential))
            .collect();

        let groups = (viewer.is_admin() && filter.owner.is_none())
            .then(|| self.group_by_owner(&filtered));

        CredentialView {
            viewer: viewer.clone(),
            today: self.today,
            counts: StatusCounts::tally(&filtered),
            credentials: filtered,
            groups,
        }
    }

    /// Display identity for an owner: the agency name for agency-level
    /// credentials, the holder's name otherwise, the raw id if the holder is gone.
    pub fn display_name(&self, owner: &CredentialOwner) -> String {
        match owner {
            CredentialOwner::Agency => self.tenant.name.clone(),
            CredentialOwner::Holder(id) => self
                .holders
                .get(id)
                .map(|holder| holder.name.clone())
                .unwrap_or_else(|| id.0.clone()),
        }
    }

    pub(crate) fn contact_email(&self, owner: &CredentialOwner) -> Option<String> {
        match owner {
            CredentialOwner::Agency => self.tenant.billing.email.clone(),
            CredentialOwner::Holder(id) => self.holders.get(id).map(|holder| holder.email.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::credentials::domain::{
        BillingProfile, CredentialId, PlanTier, TenantId,
    };
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date")
    }

    fn tenant() -> Tenant {
        Tenant {
            id: TenantId("agency-1".to_string()),
            name: "Acme Insurance Agency".to_string(),
            plan: PlanTier::Team,
            max_seats: 5,
            current_seats: 3,
            billing: BillingProfile::default(),
        }
    }

    fn holder(id: &str, name: &str, role: HolderRole) -> Holder {
        Holder {
            id: HolderId(id.to_string()),
            tenant_id: TenantId("agency-1".to_string()),
            name: name.to_string(),
            email: format!("{id}@acme.test"),
            role,
            regulatory: Default::default(),
        }
    }

    fn credential(
        id: &str,
        owner: CredentialOwner,
        category: CredentialCategory,
        state: &str,
        expires_in: i64,
    ) -> Credential {
        Credential {
            id: CredentialId(id.to_string()),
            tenant_id: TenantId("agency-1".to_string()),
            owner,
            category,
            jurisdiction: Jurisdiction::parse(state),
            reference_number: format!("{state}-{id}"),
            issue_date: None,
            expiry_date: today() + Duration::days(expires_in),
            status: ComplianceStatus::Active,
            resident: false,
            renewal_url: None,
            notes: None,
            documents: Vec::new(),
        }
    }

    fn fixture() -> (Tenant, Vec<Holder>, Vec<Credential>) {
        let holders = vec![
            holder("user-1", "Alex Thompson", HolderRole::Admin),
            holder("user-2", "Sarah Johnson", HolderRole::Member),
            holder("user-3", "mike Davis", HolderRole::Member),
        ];
        let credentials = vec![
            credential(
                "1",
                CredentialOwner::holder("user-2"),
                CredentialCategory::LifeAndHealth,
                "CA",
                200,
            ),
            credential(
                "2",
                CredentialOwner::holder("user-1"),
                CredentialCategory::PropertyAndCasualty,
                "TX",
                30,
            ),
            credential(
                "3",
                CredentialOwner::Agency,
                CredentialCategory::ErrorsAndOmissions,
                "Multi-State",
                -5,
            ),
            credential(
                "4",
                CredentialOwner::holder("user-2"),
                CredentialCategory::FinraSeries7,
                "NY",
                -1,
            ),
            credential(
                "5",
                CredentialOwner::holder("user-3"),
                CredentialCategory::LifeAndHealth,
                "FL",
                10,
            ),
        ];
        (tenant(), holders, credentials)
    }

    #[test]
    fn member_scope_is_limited_to_own_credentials() {
        let (tenant, holders, credentials) = fixture();
        let builder = TenantViewBuilder::new(&tenant, &holders, today());
        let viewer = Viewer::new("user-2", HolderRole::Member);

        let filters = [
            CredentialFilter::default(),
            CredentialFilter::default().with_owner(CredentialOwner::holder("user-1")),
            CredentialFilter::default().with_status(ComplianceStatus::Expired),
            CredentialFilter::default().with_search("tx"),
            CredentialFilter::default().with_owner(CredentialOwner::Agency),
        ];

        for filter in filters {
            let view = builder.build(&viewer, &credentials, &filter);
            assert!(view
                .credentials
                .iter()
                .all(|credential| credential.owner == CredentialOwner::holder("user-2")));
            assert!(view.groups.is_none(), "members never receive groups");
        }
    }

    #[test]
    fn filters_combine_with_and() {
        let (tenant, holders, credentials) = fixture();
        let builder = TenantViewBuilder::new(&tenant, &holders, today());
        let admin = Viewer::new("user-1", HolderRole::Admin);

        let filter = CredentialFilter::default()
            .with_category(CredentialCategory::LifeAndHealth)
            .with_status(ComplianceStatus::ExpiringSoon);
        let view = builder.build(&admin, &credentials, &filter);
        let ids: Vec<_> = view.credentials.iter().map(|c| c.id.0.as_str()).collect();
        assert_eq!(ids, vec!["5"]);

        let view = builder.build(
            &admin,
            &credentials,
            &CredentialFilter::default().with_jurisdiction(Jurisdiction::MultiState),
        );
        assert_eq!(view.credentials.len(), 1);
        assert_eq!(view.credentials[0].owner, CredentialOwner::Agency);
    }

    #[test]
    fn search_is_case_insensitive_across_label_number_and_state() {
        let (tenant, holders, credentials) = fixture();
        let builder = TenantViewBuilder::new(&tenant, &holders, today());
        let admin = Viewer::new("user-1", HolderRole::Admin);

        let by_label = builder.build(
            &admin,
            &credentials,
            &CredentialFilter::default().with_search("finra"),
        );
        assert_eq!(by_label.credentials.len(), 1);

        let by_number = builder.build(
            &admin,
            &credentials,
            &CredentialFilter::default().with_search("ca-1"),
        );
        assert_eq!(by_number.credentials[0].id.0, "1");

        let blank = builder.build(
            &admin,
            &credentials,
            &CredentialFilter::default().with_search("   "),
        );
        assert_eq!(blank.credentials.len(), credentials.len());
    }

    #[test]
    fn stale_status_is_rederived_before_filtering() {
        let (tenant, holders, mut credentials) = fixture();
        credentials[3].status = ComplianceStatus::Active;
        let builder = TenantViewBuilder::new(&tenant, &holders, today());
        let admin = Viewer::new("user-1", HolderRole::Admin);

        let view = builder.build(
            &admin,
            &credentials,
            &CredentialFilter::default().with_status(ComplianceStatus::Active),
        );
        assert!(view.credentials.iter().all(|c| c.id.0 == "1"));
    }

    #[test]
    fn foreign_tenant_records_are_never_visible() {
        let (tenant, holders, mut credentials) = fixture();
        credentials[0].tenant_id = TenantId("agency-2".to_string());
        let builder = TenantViewBuilder::new(&tenant, &holders, today());
        let admin = Viewer::new("user-1", HolderRole::Admin);

        let visible = builder.visible(&admin, &credentials);
        assert_eq!(visible.len(), credentials.len() - 1);
    }
}
