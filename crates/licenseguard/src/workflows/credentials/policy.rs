use chrono::{Duration, NaiveDate};

use crate::config::ComplianceConfig;

use super::domain::ComplianceError;

const DEFAULT_ISSUE_DATE_GRACE_DAYS: i64 = 7;
const DEFAULT_DASHBOARD_WINDOW_DAYS: i64 = 90;
const DEFAULT_CALENDAR_WINDOW_DAYS: i64 = 180;
const DEFAULT_DASHBOARD_LIMIT: usize = 5;

/// Tunable dials for the write path and the renewal projections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompliancePolicy {
    issue_date_grace_days: i64,
    dashboard_window_days: i64,
    calendar_window_days: i64,
    dashboard_limit: usize,
}

impl CompliancePolicy {
    pub fn new(
        issue_date_grace_days: i64,
        dashboard_window_days: i64,
        calendar_window_days: i64,
        dashboard_limit: usize,
    ) -> Self {
        let sanitize = |value: i64, fallback: i64| if value >= 0 { value } else { fallback };

        Self {
            issue_date_grace_days: sanitize(issue_date_grace_days, DEFAULT_ISSUE_DATE_GRACE_DAYS),
            dashboard_window_days: sanitize(dashboard_window_days, DEFAULT_DASHBOARD_WINDOW_DAYS),
            calendar_window_days: sanitize(calendar_window_days, DEFAULT_CALENDAR_WINDOW_DAYS),
            dashboard_limit,
        }
    }

    pub fn issue_date_grace_days(&self) -> i64 {
        self.issue_date_grace_days
    }

    pub fn dashboard_window_days(&self) -> i64 {
        self.dashboard_window_days
    }

    pub fn calendar_window_days(&self) -> i64 {
        self.calendar_window_days
    }

    pub fn dashboard_limit(&self) -> usize {
        self.dashboard_limit
    }

    /// Latest issue date accepted on `today`.
    pub fn latest_issue_date(&self, today: NaiveDate) -> NaiveDate {
        Duration::try_days(self.issue_date_grace_days)
            .and_then(|grace| today.checked_add_signed(grace))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn check_issue_date(
        &self,
        issue_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(), ComplianceError> {
        match issue_date {
            Some(issue_date) if issue_date > self.latest_issue_date(today) => {
                Err(ComplianceError::IssueDateTooFarAhead {
                    issue_date,
                    today,
                    grace_days: self.issue_date_grace_days,
                })
            }
            _ => Ok(()),
        }
    }
}

impl Default for CompliancePolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_ISSUE_DATE_GRACE_DAYS,
            DEFAULT_DASHBOARD_WINDOW_DAYS,
            DEFAULT_CALENDAR_WINDOW_DAYS,
            DEFAULT_DASHBOARD_LIMIT,
        )
    }
}

impl From<&ComplianceConfig> for CompliancePolicy {
    fn from(config: &ComplianceConfig) -> Self {
        Self::new(
            config.issue_date_grace_days,
            config.dashboard_window_days,
            config.calendar_window_days,
            config.dashboard_limit,
        )
    }
}
