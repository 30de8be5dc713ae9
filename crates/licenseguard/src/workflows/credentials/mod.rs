//! Credential lifecycle and compliance rules for agencies: status derivation,
//! the one-resident-credential-per-owner rule, tenant views, renewal reminders,
//! and continuing-education progress.
//!
//! Everything below `service` is synchronous and pure over the records handed
//! in; storage and delivery live behind the traits in `repository`.

pub mod ce;
pub mod domain;
pub mod policy;
pub mod renewals;
pub mod repository;
pub mod resident;
pub mod router;
pub mod service;
pub mod status;
pub mod views;

#[cfg(test)]
mod tests;

pub use ce::{ce_progress_for, CeProgress};
pub use domain::{
    BillingProfile, CeRecord, CeRecordId, ComplianceError, ComplianceStatus, Credential,
    CredentialCategory, CredentialId, CredentialOwner, DocumentId, DocumentRef, Holder, HolderId,
    HolderRole, Jurisdiction, PlanTier, RegulatoryIdentifiers, Tenant, TenantId,
};
pub use policy::CompliancePolicy;
pub use renewals::{
    select_notifications, NotificationIntent, NotificationRecipient, RenewalScheduler,
    RenewalThreshold,
};
pub use repository::{
    ComplianceRepository, NotificationError, NotificationPublisher, RepositoryError,
};
pub use resident::normalize_resident;
pub use router::{credential_router, CeRecordInput, CredentialInput, HolderInput, ImportRequest};
pub use service::{
    CalendarSnapshot, ComplianceService, DispatchFailure, DispatchReport, RemovedHolder,
    SavedCredential, ServiceError,
};
pub use status::{annotate, days_remaining, derive_status, EXPIRING_SOON_WINDOW_DAYS};
pub use views::{
    CalendarDay, CalendarView, CredentialFilter, CredentialView, DashboardSummary, HolderGroup,
    StatusCounts, TenantViewBuilder, UpcomingRenewal, Viewer,
};
