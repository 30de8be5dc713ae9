use chrono::NaiveDate;
use licenseguard::config::AppConfig;
use licenseguard::error::AppError;
use licenseguard::workflows::credentials::{
    CeRecord, CeRecordId, ComplianceError, ComplianceRepository, ComplianceService,
    ComplianceStatus, CompliancePolicy, Credential, CredentialId, Holder, HolderId, HolderRole, NotificationError,
    NotificationIntent, NotificationPublisher, RepositoryError, ServiceError, Tenant, TenantId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use crate::demo::demo_snapshot;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type AgencyService =
    ComplianceService<InMemoryComplianceRepository, LoggingNotificationPublisher>;

/// Everything the in-memory store holds; also the on-disk snapshot format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoreSnapshot {
    #[serde(default)]
    pub(crate) tenants: Vec<Tenant>,
    #[serde(default)]
    pub(crate) holders: Vec<Holder>,
    #[serde(default)]
    pub(crate) credentials: Vec<Credential>,
    #[serde(default)]
    pub(crate) ce_records: Vec<CeRecord>,
}

fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    match items.iter().position(|existing| same(existing, &item)) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}

/// Mutex-guarded snapshot, flushed to `data_path` as JSON after every write
/// when a path is configured.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemoryComplianceRepository {
    state: Arc<Mutex<StoreSnapshot>>,
    data_path: Option<PathBuf>,
}

impl InMemoryComplianceRepository {
    pub(crate) fn with_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: Arc::new(Mutex::new(snapshot)),
            data_path: None,
        }
    }

    /// Hydrate from `path` when it exists; start empty otherwise.
    pub(crate) fn open(path: Option<PathBuf>) -> Result<Self, AppError> {
        let snapshot = match path.as_deref() {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(path)?;
                let snapshot: StoreSnapshot = serde_json::from_str(&raw)?;
                info!(
                    path = %path.display(),
                    credentials = snapshot.credentials.len(),
                    "snapshot loaded"
                );
                snapshot
            }
            _ => StoreSnapshot::default(),
        };

        Ok(Self {
            state: Arc::new(Mutex::new(snapshot)),
            data_path: path,
        })
    }

    pub(crate) fn has_tenant(&self, id: &TenantId) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.tenants.iter().any(|tenant| &tenant.id == id))
    }

    /// Merge `seed` into the store and flush it.
    pub(crate) fn seed(&self, seed: StoreSnapshot) -> Result<(), RepositoryError> {
        self.mutate(|state| {
            for tenant in seed.tenants {
                upsert(&mut state.tenants, tenant, |a, b| a.id == b.id);
            }
            for holder in seed.holders {
                upsert(&mut state.holders, holder, |a, b| a.id == b.id);
            }
            for credential in seed.credentials {
                upsert(&mut state.credentials, credential, |a, b| a.id == b.id);
            }
            for record in seed.ce_records {
                upsert(&mut state.ce_records, record, |a, b| a.id == b.id);
            }
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreSnapshot>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }

    /// Apply a write. With a data path the change lands on a copy and only
    /// replaces the live snapshot once that copy is on disk.
    fn mutate<T>(&self, apply: impl FnOnce(&mut StoreSnapshot) -> T) -> Result<T, RepositoryError> {
        let mut guard = self.lock()?;
        match self.data_path.as_deref() {
            None => Ok(apply(&mut guard)),
            Some(path) => {
                let mut next = guard.clone();
                let result = apply(&mut next);
                flush(path, &next)?;
                *guard = next;
                Ok(result)
            }
        }
    }
}

fn flush(path: &Path, snapshot: &StoreSnapshot) -> Result<(), RepositoryError> {
    let payload = serde_json::to_vec_pretty(snapshot)
        .map_err(|err| RepositoryError::Unavailable(format!("snapshot encoding failed: {err}")))?;
    fs::write(path, payload).map_err(|err| {
        RepositoryError::Unavailable(format!("failed to write {}: {err}", path.display()))
    })
}

impl ComplianceRepository for InMemoryComplianceRepository {
    fn load_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.tenants.iter().find(|tenant| &tenant.id == id).cloned())
    }

    fn save_tenant(&self, tenant: Tenant) -> Result<(), RepositoryError> {
        self.mutate(|state| upsert(&mut state.tenants, tenant, |a, b| a.id == b.id))
    }

    fn load_holders(&self, tenant: &TenantId) -> Result<Vec<Holder>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .holders
            .iter()
            .filter(|holder| &holder.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn save_holder(&self, holder: Holder) -> Result<(), RepositoryError> {
        self.mutate(|state| upsert(&mut state.holders, holder, |a, b| a.id == b.id))
    }

    fn delete_holder(&self, id: &HolderId) -> Result<(), RepositoryError> {
        self.mutate(|state| state.holders.retain(|holder| &holder.id != id))
    }

    fn load_credentials(&self, tenant: &TenantId) -> Result<Vec<Credential>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .credentials
            .iter()
            .filter(|credential| &credential.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn save_credentials(&self, batch: Vec<Credential>) -> Result<(), RepositoryError> {
        self.mutate(|state| {
            for credential in batch {
                upsert(&mut state.credentials, credential, |a, b| a.id == b.id);
            }
        })
    }

    fn delete_credential(&self, id: &CredentialId) -> Result<(), RepositoryError> {
        self.mutate(|state| state.credentials.retain(|credential| &credential.id != id))
    }

    fn delete_credentials(&self, ids: &[CredentialId]) -> Result<(), RepositoryError> {
        self.mutate(|state| {
            state
                .credentials
                .retain(|credential| !ids.contains(&credential.id))
        })
    }

    fn load_ce_records(&self, tenant: &TenantId) -> Result<Vec<CeRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .ce_records
            .iter()
            .filter(|record| &record.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn save_ce_record(&self, record: CeRecord) -> Result<(), RepositoryError> {
        self.mutate(|state| upsert(&mut state.ce_records, record, |a, b| a.id == b.id))
    }

    fn delete_ce_record(&self, id: &CeRecordId) -> Result<(), RepositoryError> {
        self.mutate(|state| state.ce_records.retain(|record| &record.id != id))
    }
}

/// Intents kept in the mock outbox; older ones are dropped first.
pub(crate) const OUTBOX_CAPACITY: usize = 256;

/// Mock e-mail delivery: every intent is written to the log and the most
/// recent ones are kept for inspection.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotificationPublisher {
    sent: Arc<Mutex<VecDeque<NotificationIntent>>>,
}

impl NotificationPublisher for LoggingNotificationPublisher {
    fn publish(&self, intent: NotificationIntent) -> Result<(), NotificationError> {
        info!(
            to = intent.recipient.email.as_deref().unwrap_or("(no address on file)"),
            subject = %intent.subject,
            message = %intent.message,
            "renewal e-mail queued"
        );
        let mut outbox = self
            .sent
            .lock()
            .map_err(|_| NotificationError::Transport("outbox mutex poisoned".to_string()))?;
        if outbox.len() == OUTBOX_CAPACITY {
            outbox.pop_front();
        }
        outbox.push_back(intent);
        Ok(())
    }
}

impl LoggingNotificationPublisher {
    pub(crate) fn sent(&self) -> Vec<NotificationIntent> {
        self.sent
            .lock()
            .map(|guard| guard.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Collaborators for one process: the store (hydrated from the configured
/// snapshot and seeded with the demo agency when the tenant is missing), the
/// mock mailer and the service over both.
pub(crate) struct Runtime {
    pub(crate) tenant_id: TenantId,
    pub(crate) repository: Arc<InMemoryComplianceRepository>,
    pub(crate) publisher: Arc<LoggingNotificationPublisher>,
    pub(crate) service: Arc<AgencyService>,
}

impl Runtime {
    pub(crate) fn bootstrap(config: &AppConfig, today: NaiveDate) -> Result<Self, AppError> {
        let tenant_id = TenantId(config.storage.tenant_id.clone());
        let repository = Arc::new(InMemoryComplianceRepository::open(
            config.storage.data_path.clone(),
        )?);

        if !repository
            .has_tenant(&tenant_id)
            .map_err(ServiceError::from)?
        {
            repository
                .seed(demo_snapshot(&tenant_id, today))
                .map_err(ServiceError::from)?;
            info!(tenant = %tenant_id, "seeded demo agency");
        }

        Ok(Self::over(repository, tenant_id, CompliancePolicy::from(&config.compliance)))
    }

    pub(crate) fn over(
        repository: Arc<InMemoryComplianceRepository>,
        tenant_id: TenantId,
        policy: CompliancePolicy,
    ) -> Self {
        let publisher = Arc::new(LoggingNotificationPublisher::default());
        let service = Arc::new(ComplianceService::new(
            repository.clone(),
            publisher.clone(),
            policy,
        ));
        Self {
            tenant_id,
            repository,
            publisher,
            service,
        }
    }

    pub(crate) fn tenant(&self) -> Result<Tenant, AppError> {
        let tenant = self
            .repository
            .load_tenant(&self.tenant_id)
            .map_err(ServiceError::from)?;
        tenant.ok_or_else(|| {
            ServiceError::from(ComplianceError::UnknownTenant(self.tenant_id.clone())).into()
        })
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_role(raw: &str) -> Result<HolderRole, String> {
    raw.parse()
}

pub(crate) fn parse_status(raw: &str) -> Result<ComplianceStatus, String> {
    raw.parse()
}
