use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::workflows::import::{CredentialImporter, ImportOutcome};

use super::ce::{ce_progress_for, CeProgress};
use super::domain::{
    CeRecord, CeRecordId, ComplianceError, Credential, CredentialId, CredentialOwner, Holder,
    HolderId, Tenant, TenantId,
};
use super::policy::CompliancePolicy;
use super::renewals::{NotificationIntent, RenewalScheduler};
use super::repository::{ComplianceRepository, NotificationPublisher, RepositoryError};
use super::resident::normalize_resident;
use super::views::{
    CalendarDay, CredentialFilter, CredentialView, DashboardSummary, TenantViewBuilder,
    UpcomingRenewal, Viewer,
};

/// Result of a credential save: the stored record plus every record whose
/// resident flag was cleared in the same batch.
#[derive(Debug, Clone, Serialize)]
pub struct SavedCredential {
    pub credential: Credential,
    pub cleared: Vec<Credential>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovedHolder {
    pub holder_id: HolderId,
    pub removed_credentials: Vec<CredentialId>,
    pub tenant: Tenant,
}

/// Calendar grid plus the renewals due inside the calendar window.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarSnapshot {
    pub window_days: i64,
    pub days: Vec<CalendarDay>,
    pub upcoming: Vec<UpcomingRenewal>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub evaluated: usize,
    pub published: Vec<NotificationIntent>,
    pub failed: Vec<DispatchFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub credential_id: CredentialId,
    pub error: String,
}

/// Stateless rules wired to storage and notification collaborators.
///
/// Every read-modify-write path holds `write_lock` so that concurrent saves for
/// one owner cannot both leave a resident credential behind.
pub struct ComplianceService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    policy: CompliancePolicy,
    write_lock: Mutex<()>,
}

impl<R, N> ComplianceService<R, N>
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, policy: CompliancePolicy) -> Self {
        Self {
            repository,
            notifier,
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &CompliancePolicy {
        &self.policy
    }

    fn serialize_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn tenant(&self, id: &TenantId) -> Result<Tenant, ServiceError> {
        self.repository
            .load_tenant(id)?
            .ok_or_else(|| ComplianceError::UnknownTenant(id.clone()).into())
    }

    /// Put back what a failed holder removal already deleted.
    fn restore_removed(
        &self,
        tenant_id: &TenantId,
        holder: Option<Holder>,
        credentials: Vec<Credential>,
    ) {
        if let Some(holder) = holder {
            if let Err(err) = self.repository.save_holder(holder) {
                warn!(tenant = %tenant_id, error = %err, "failed to restore removed holder");
            }
        }
        if credentials.is_empty() {
            return;
        }
        if let Err(err) = self.repository.save_credentials(credentials) {
            warn!(tenant = %tenant_id, error = %err, "failed to restore removed credentials");
        }
    }

    /// Create or fully replace a credential, keeping one resident record per owner.
    pub fn save_credential(
        &self,
        credential: Credential,
        today: NaiveDate,
    ) -> Result<SavedCredential, ServiceError> {
        self.policy.check_issue_date(credential.issue_date, today)?;
        let _guard = self.serialize_writes();
        self.tenant(&credential.tenant_id)?;

        let saved = credential.annotated(today);
        let mut stored = self.repository.load_credentials(&saved.tenant_id)?;
        let cleared_ids = normalize_resident(&saved, &mut stored);
        let cleared: Vec<Credential> = stored
            .into_iter()
            .filter(|record| cleared_ids.contains(&record.id))
            .collect();

        let mut batch = Vec::with_capacity(cleared.len() + 1);
        batch.push(saved.clone());
        batch.extend(cleared.iter().cloned());
        self.repository.save_credentials(batch)?;

        info!(
            tenant = %saved.tenant_id,
            credential = %saved.id,
            owner = %saved.owner,
            status = saved.status.as_str(),
            cleared = cleared.len(),
            "credential saved"
        );

        Ok(SavedCredential {
            credential: saved,
            cleared,
        })
    }

    pub fn delete_credential(&self, tenant: &TenantId, id: &CredentialId) -> Result<(), ServiceError> {
        let _guard = self.serialize_writes();
        let known = self
            .repository
            .load_credentials(tenant)?
            .iter()
            .any(|credential| &credential.id == id);
        if !known {
            return Err(RepositoryError::NotFound.into());
        }

        self.repository.delete_credential(id)?;
        info!(tenant = %tenant, credential = %id, "credential deleted");
        Ok(())
    }

    /// Add a holder to the roster, consuming one seat.
    pub fn add_holder(&self, holder: Holder) -> Result<Tenant, ServiceError> {
        let _guard = self.serialize_writes();
        let mut tenant = self.tenant(&holder.tenant_id)?;

        let roster = self.repository.load_holders(&tenant.id)?;
        if roster.iter().any(|existing| existing.id == holder.id) {
            return Err(ComplianceError::DuplicateHolder(holder.id).into());
        }

        if !tenant.has_free_seat() {
            warn!(
                tenant = %tenant.id,
                current = tenant.current_seats,
                max = tenant.max_seats,
                "seat limit reached"
            );
            return Err(ComplianceError::SeatLimitReached {
                tenant: tenant.id,
                current: tenant.current_seats,
                max: tenant.max_seats,
            }
            .into());
        }

        let holder_id = holder.id.clone();
        self.repository.save_holder(holder)?;
        tenant.current_seats += 1;
        if let Err(err) = self.repository.save_tenant(tenant.clone()) {
            // The seat was never recorded, so the roster entry must not survive.
            if let Err(undo) = self.repository.delete_holder(&holder_id) {
                warn!(
                    tenant = %tenant.id,
                    holder = %holder_id,
                    error = %undo,
                    "failed to roll back holder"
                );
            }
            return Err(err.into());
        }

        info!(
            tenant = %tenant.id,
            holder = %holder_id,
            seats = tenant.current_seats,
            "holder added"
        );
        Ok(tenant)
    }

    /// Replace an existing holder's profile. Seat usage is unchanged.
    pub fn update_holder(&self, holder: Holder) -> Result<Holder, ServiceError> {
        let _guard = self.serialize_writes();
        let known = self
            .repository
            .load_holders(&holder.tenant_id)?
            .iter()
            .any(|existing| existing.id == holder.id);
        if !known {
            return Err(RepositoryError::NotFound.into());
        }

        self.repository.save_holder(holder.clone())?;
        info!(tenant = %holder.tenant_id, holder = %holder.id, "holder updated");
        Ok(holder)
    }

    /// Remove a holder with every credential they own and release their seat.
    /// Continuing-education records are left in place.
    pub fn remove_holder(
        &self,
        tenant_id: &TenantId,
        holder_id: &HolderId,
    ) -> Result<RemovedHolder, ServiceError> {
        let _guard = self.serialize_writes();
        let mut tenant = self.tenant(tenant_id)?;

        let holder = self
            .repository
            .load_holders(tenant_id)?
            .into_iter()
            .find(|holder| &holder.id == holder_id)
            .ok_or(RepositoryError::NotFound)?;

        let owner = CredentialOwner::Holder(holder_id.clone());
        let owned: Vec<Credential> = self
            .repository
            .load_credentials(tenant_id)?
            .into_iter()
            .filter(|credential| credential.is_owned_by(&owner))
            .collect();
        let removed_credentials: Vec<CredentialId> =
            owned.iter().map(|credential| credential.id.clone()).collect();
        self.repository.delete_credentials(&removed_credentials)?;

        if let Err(err) = self.repository.delete_holder(holder_id) {
            self.restore_removed(tenant_id, None, owned);
            return Err(err.into());
        }

        tenant.current_seats = tenant.current_seats.saturating_sub(1);
        if let Err(err) = self.repository.save_tenant(tenant.clone()) {
            self.restore_removed(tenant_id, Some(holder), owned);
            return Err(err.into());
        }

        info!(
            tenant = %tenant_id,
            holder = %holder_id,
            credentials = removed_credentials.len(),
            seats = tenant.current_seats,
            "holder removed"
        );

        Ok(RemovedHolder {
            holder_id: holder_id.clone(),
            removed_credentials,
            tenant,
        })
    }

    pub fn save_ce_record(&self, record: CeRecord) -> Result<CeRecord, ServiceError> {
        let _guard = self.serialize_writes();
        self.tenant(&record.tenant_id)?;
        self.repository.save_ce_record(record.clone())?;
        info!(
            tenant = %record.tenant_id,
            holder = %record.holder_id,
            completed = record.hours_completed,
            required = record.hours_required,
            "ce record saved"
        );
        Ok(record)
    }

    pub fn delete_ce_record(&self, tenant: &TenantId, id: &CeRecordId) -> Result<(), ServiceError> {
        let _guard = self.serialize_writes();
        let known = self
            .repository
            .load_ce_records(tenant)?
            .iter()
            .any(|record| &record.id == id);
        if !known {
            return Err(RepositoryError::NotFound.into());
        }
        self.repository.delete_ce_record(id)?;
        Ok(())
    }

    /// Import a tabular export for `default_holder`. Accepted rows and any
    /// records whose resident flag they cleared are persisted as one batch,
    /// unless `dry_run` is set.
    pub fn import(
        &self,
        tenant_id: &TenantId,
        raw: &str,
        default_holder: &CredentialOwner,
        today: NaiveDate,
        dry_run: bool,
    ) -> Result<ImportOutcome, ServiceError> {
        let _guard = self.serialize_writes();
        self.tenant(tenant_id)?;

        if let CredentialOwner::Holder(holder_id) = default_holder {
            let known = self
                .repository
                .load_holders(tenant_id)?
                .iter()
                .any(|holder| &holder.id == holder_id);
            if !known {
                return Err(RepositoryError::NotFound.into());
            }
        }

        let existing = self.repository.load_credentials(tenant_id)?;
        let importer = CredentialImporter::new(tenant_id.clone(), self.policy.clone());
        let outcome = importer.import_rows(raw, default_holder, &existing, today);

        if !dry_run && !outcome.accepted.is_empty() {
            let batch: Vec<Credential> = outcome
                .accepted
                .iter()
                .chain(outcome.cleared.iter())
                .cloned()
                .collect();
            self.repository.save_credentials(batch)?;
            info!(
                tenant = %tenant_id,
                owner = %default_holder,
                imported = outcome.accepted.len(),
                "credential import persisted"
            );
        }

        Ok(outcome)
    }

    pub fn view(
        &self,
        tenant_id: &TenantId,
        viewer: &Viewer,
        filter: &CredentialFilter,
        today: NaiveDate,
    ) -> Result<CredentialView, ServiceError> {
        let (tenant, holders, credentials) = self.snapshot(tenant_id)?;
        let views = TenantViewBuilder::new(&tenant, &holders, today);
        Ok(views.build(viewer, &credentials, filter))
    }

    /// Renewals due within `window_days` (dashboard window when absent).
    pub fn upcoming(
        &self,
        tenant_id: &TenantId,
        viewer: &Viewer,
        window_days: Option<i64>,
        limit: Option<usize>,
        today: NaiveDate,
    ) -> Result<Vec<UpcomingRenewal>, ServiceError> {
        let (tenant, holders, credentials) = self.snapshot(tenant_id)?;
        let views = TenantViewBuilder::new(&tenant, &holders, today);
        let window = window_days
            .filter(|days| *days >= 0)
            .unwrap_or(self.policy.dashboard_window_days());
        Ok(views.upcoming_renewals(viewer, &credentials, window, limit))
    }

    pub fn calendar(
        &self,
        tenant_id: &TenantId,
        viewer: &Viewer,
        month: Option<(i32, u32)>,
        today: NaiveDate,
    ) -> Result<CalendarSnapshot, ServiceError> {
        let (tenant, holders, credentials) = self.snapshot(tenant_id)?;
        let views = TenantViewBuilder::new(&tenant, &holders, today);

        let mut calendar = views.calendar(viewer, &credentials);
        if let Some((year, month)) = month {
            calendar = calendar.for_month(year, month);
        }
        let window_days = self.policy.calendar_window_days();

        Ok(CalendarSnapshot {
            window_days,
            days: calendar.days(),
            upcoming: views.upcoming_renewals(viewer, &credentials, window_days, None),
        })
    }

    pub fn dashboard(
        &self,
        tenant_id: &TenantId,
        viewer: &Viewer,
        today: NaiveDate,
    ) -> Result<DashboardSummary, ServiceError> {
        let (tenant, holders, credentials) = self.snapshot(tenant_id)?;
        let views = TenantViewBuilder::new(&tenant, &holders, today);
        Ok(views.dashboard(
            viewer,
            &credentials,
            self.policy.dashboard_window_days(),
            self.policy.dashboard_limit(),
        ))
    }

    pub fn ce_progress(
        &self,
        tenant_id: &TenantId,
        viewer: &Viewer,
        today: NaiveDate,
    ) -> Result<Vec<CeProgress>, ServiceError> {
        self.tenant(tenant_id)?;
        let records = self.repository.load_ce_records(tenant_id)?;
        Ok(ce_progress_for(viewer, &records, today))
    }

    /// Reminder intents due today, without sending anything.
    pub fn pending_notifications(
        &self,
        tenant_id: &TenantId,
        today: NaiveDate,
    ) -> Result<Vec<NotificationIntent>, ServiceError> {
        let (tenant, holders, credentials) = self.snapshot(tenant_id)?;
        let views = TenantViewBuilder::new(&tenant, &holders, today);
        Ok(RenewalScheduler::new(&views).intents(&credentials))
    }

    /// Hand today's reminder intents to the notification collaborator.
    /// A failed delivery is reported and does not stop the remaining ones.
    pub fn dispatch_renewals(
        &self,
        tenant_id: &TenantId,
        today: NaiveDate,
    ) -> Result<DispatchReport, ServiceError> {
        let intents = self.pending_notifications(tenant_id, today)?;
        let mut report = DispatchReport {
            evaluated: intents.len(),
            ..DispatchReport::default()
        };

        for intent in intents {
            match self.notifier.publish(intent.clone()) {
                Ok(()) => report.published.push(intent),
                Err(err) => {
                    warn!(
                        credential = %intent.credential_id,
                        threshold = intent.threshold.label(),
                        error = %err,
                        "renewal notification failed"
                    );
                    report.failed.push(DispatchFailure {
                        credential_id: intent.credential_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            tenant = %tenant_id,
            date = %today,
            published = report.published.len(),
            failed = report.failed.len(),
            "renewal notifications dispatched"
        );
        Ok(report)
    }

    fn snapshot(
        &self,
        tenant_id: &TenantId,
    ) -> Result<(Tenant, Vec<Holder>, Vec<Credential>), ServiceError> {
        let tenant = self.tenant(tenant_id)?;
        let holders = self.repository.load_holders(tenant_id)?;
        let credentials = self.repository.load_credentials(tenant_id)?;
        Ok((tenant, holders, credentials))
    }
}

/// Error raised by the compliance service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Compliance(#[from] ComplianceError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
