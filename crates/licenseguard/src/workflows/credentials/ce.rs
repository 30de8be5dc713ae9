use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{CeRecord, ComplianceStatus};
use super::status::{days_remaining, derive_status};
use super::views::Viewer;

/// Hours progress for one CE record. Completed hours may exceed the requirement.
#[derive(Debug, Clone, Serialize)]
pub struct CeProgress {
    pub record: CeRecord,
    pub hours_remaining: u32,
    pub percent_complete: f32,
    pub is_complete: bool,
    pub days_remaining: i64,
    pub status: ComplianceStatus,
}

impl CeRecord {
    pub fn progress(&self, today: NaiveDate) -> CeProgress {
        let percent_complete = if self.hours_required == 0 {
            100.0
        } else {
            self.hours_completed as f32 / self.hours_required as f32 * 100.0
        };

        CeProgress {
            record: self.clone(),
            hours_remaining: self.hours_required.saturating_sub(self.hours_completed),
            percent_complete,
            is_complete: self.hours_completed >= self.hours_required,
            days_remaining: days_remaining(self.expiry_date, today),
            status: derive_status(self.expiry_date, today),
        }
    }
}

/// Progress entries the viewer may see, soonest expiry first.
pub fn ce_progress_for(viewer: &Viewer, records: &[CeRecord], today: NaiveDate) -> Vec<CeProgress> {
    let mut progress: Vec<CeProgress> = records
        .iter()
        .filter(|record| viewer.is_admin() || record.holder_id == viewer.holder_id)
        .map(|record| record.progress(today))
        .collect();
    progress.sort_by_key(|entry| entry.record.expiry_date);
    progress
}
