use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::{StatusCounts, TenantViewBuilder, Viewer};
use crate::workflows::credentials::domain::Credential;

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingRenewal {
    pub days_remaining: i64,
    pub display_name: String,
    pub credential: Credential,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub credentials: Vec<Credential>,
}

/// Visible credentials keyed by their expiry date.
#[derive(Debug, Clone, Default)]
pub struct CalendarView {
    days: BTreeMap<NaiveDate, Vec<Credential>>,
}

impl CalendarView {
    pub fn on(&self, date: NaiveDate) -> &[Credential] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn for_month(&self, year: i32, month: u32) -> Self {
        let days = self
            .days
            .iter()
            .filter(|(date, _)| date.year() == year && date.month() == month)
            .map(|(date, credentials)| (*date, credentials.clone()))
            .collect();
        Self { days }
    }

    pub fn days(&self) -> Vec<CalendarDay> {
        self.days
            .iter()
            .map(|(date, credentials)| CalendarDay {
                date: *date,
                credentials: credentials.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub active: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    pub team_members: usize,
    pub recent: Vec<Credential>,
    pub upcoming: Vec<UpcomingRenewal>,
}

impl TenantViewBuilder<'_> {
    /// Credentials with `0 <= days_remaining <= window_days`, soonest first.
    pub fn upcoming_renewals(
        &self,
        viewer: &Viewer,
        credentials: &[Credential],
        window_days: i64,
        limit: Option<usize>,
    ) -> Vec<UpcomingRenewal> {
        let mut upcoming: Vec<UpcomingRenewal> = self
            .visible(viewer, credentials)
            .into_iter()
            .filter_map(|credential| {
                let days_remaining = credential.days_remaining(self.today());
                (0..=window_days).contains(&days_remaining).then(|| UpcomingRenewal {
                    days_remaining,
                    display_name: self.display_name(&credential.owner),
                    credential,
                })
            })
            .collect();

        upcoming.sort_by_key(|entry| entry.credential.expiry_date);
        if let Some(limit) = limit {
            upcoming.truncate(limit);
        }
        upcoming
    }

    pub fn calendar(&self, viewer: &Viewer, credentials: &[Credential]) -> CalendarView {
        let mut days: BTreeMap<NaiveDate, Vec<Credential>> = BTreeMap::new();
        for credential in self.visible(viewer, credentials) {
            days.entry(credential.expiry_date)
                .or_default()
                .push(credential);
        }
        CalendarView { days }
    }

    /// Headline counts plus the most recently issued and soonest-expiring records.
    pub fn dashboard(
        &self,
        viewer: &Viewer,
        credentials: &[Credential],
        window_days: i64,
        limit: usize,
    ) -> DashboardSummary {
        let visible = self.visible(viewer, credentials);
        let counts = StatusCounts::tally(&visible);

        let mut recent = visible.clone();
        // Newest issue date first; records without one sink to the bottom.
        recent.sort_by(|left, right| right.issue_date.cmp(&left.issue_date));
        recent.truncate(limit);

        DashboardSummary {
            total: visible.len(),
            active: counts.active,
            expiring_soon: counts.expiring_soon,
            expired: counts.expired,
            team_members: self.holder_count,
            recent,
            upcoming: self.upcoming_renewals(viewer, credentials, window_days, Some(limit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::credentials::domain::{
        BillingProfile, ComplianceStatus, CredentialCategory, CredentialId, CredentialOwner,
        Holder, HolderId, HolderRole, Jurisdiction, PlanTier, Tenant, TenantId,
    };
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).expect("valid date")
    }

    fn tenant() -> Tenant {
        Tenant {
            id: TenantId("agency-1".to_string()),
            name: "Acme Insurance Agency".to_string(),
            plan: PlanTier::Individual,
            max_seats: 1,
            current_seats: 1,
            billing: BillingProfile::default(),
        }
    }

    fn holders() -> Vec<Holder> {
        vec![Holder {
            id: HolderId("user-1".to_string()),
            tenant_id: TenantId("agency-1".to_string()),
            name: "Alex Thompson".to_string(),
            email: "admin@acme.test".to_string(),
            role: HolderRole::Admin,
            regulatory: Default::default(),
        }]
    }

    fn credential(id: &str, expires_in: i64, issued_days_ago: Option<i64>) -> Credential {
        Credential {
            id: CredentialId(id.to_string()),
            tenant_id: TenantId("agency-1".to_string()),
            owner: CredentialOwner::holder("user-1"),
            category: CredentialCategory::PropertyAndCasualty,
            jurisdiction: Jurisdiction::parse("TX"),
            reference_number: id.to_string(),
            issue_date: issued_days_ago.map(|days| today() - Duration::days(days)),
            expiry_date: today() + Duration::days(expires_in),
            status: ComplianceStatus::Expired,
            resident: false,
            renewal_url: None,
            notes: None,
            documents: Vec::new(),
        }
    }

    #[test]
    fn upcoming_window_is_inclusive_and_sorted() {
        let tenant = tenant();
        let holders = holders();
        let builder = TenantViewBuilder::new(&tenant, &holders, today());
        let viewer = Viewer::new("user-1", HolderRole::Member);
        let credentials = vec![
            credential("late", 90, None),
            credential("past", -1, None),
            credential("today", 0, None),
            credential("beyond", 91, None),
            credential("mid", 45, None),
        ];

        let upcoming = builder.upcoming_renewals(&viewer, &credentials, 90, None);
        let ids: Vec<_> = upcoming.iter().map(|u| u.credential.id.0.as_str()).collect();
        assert_eq!(ids, vec!["today", "mid", "late"]);
        assert_eq!(upcoming[2].days_remaining, 90);
        assert_eq!(upcoming[2].credential.status, ComplianceStatus::ExpiringSoon);

        let capped = builder.upcoming_renewals(&viewer, &credentials, 180, Some(2));
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].credential.id.0, "today");
    }

    #[test]
    fn calendar_groups_same_day_expiries() {
        let tenant = tenant();
        let holders = holders();
        let builder = TenantViewBuilder::new(&tenant, &holders, today());
        let viewer = Viewer::new("user-1", HolderRole::Admin);
        let credentials = vec![
            credential("a", 10, None),
            credential("b", 10, None),
            credential("c", 40, None),
        ];

        let calendar = builder.calendar(&viewer, &credentials);
        assert_eq!(calendar.on(today() + Duration::days(10)).len(), 2);
        assert!(calendar.on(today()).is_empty());

        let april = calendar.for_month(2025, 4);
        assert_eq!(april.days().len(), 1);
        let may = calendar.for_month(2025, 5);
        assert_eq!(may.days()[0].credentials[0].id.0, "c");
    }

    #[test]
    fn dashboard_counts_and_recent_order() {
        let tenant = tenant();
        let holders = holders();
        let builder = TenantViewBuilder::new(&tenant, &holders, today());
        let viewer = Viewer::new("user-1", HolderRole::Admin);
        let credentials = vec![
            credential("old", 400, Some(700)),
            credential("undated", -10, None),
            credential("new", 20, Some(5)),
        ];

        let summary = builder.dashboard(&viewer, &credentials, 90, 5);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.expiring_soon, 1);
        assert_eq!(summary.expired, 1);
        assert_eq!(summary.team_members, 1);
        let recent: Vec<_> = summary.recent.iter().map(|c| c.id.0.as_str()).collect();
        assert_eq!(recent, vec!["new", "old", "undated"]);
        assert_eq!(summary.upcoming.len(), 1);
    }
}
