use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::workflows::credentials::{
    credential_router, BillingProfile, CeRecord, CeRecordId, ComplianceRepository,
    ComplianceService, ComplianceStatus, CompliancePolicy, Credential, CredentialCategory,
    CredentialId, CredentialOwner, Holder, HolderId, HolderRole, Jurisdiction, NotificationError,
    NotificationIntent, NotificationPublisher, PlanTier, RepositoryError, Tenant, TenantId,
};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid date")
}

pub(super) fn tenant_id() -> TenantId {
    TenantId("agency-1".to_string())
}

pub(super) fn tenant(max_seats: u32, current_seats: u32) -> Tenant {
    Tenant {
        id: tenant_id(),
        name: "Acme Insurance Agency".to_string(),
        plan: PlanTier::Team,
        max_seats,
        current_seats,
        billing: BillingProfile {
            email: Some("office@acme.test".to_string()),
            ..BillingProfile::default()
        },
    }
}

pub(super) fn holder(id: &str, name: &str, role: HolderRole) -> Holder {
    Holder {
        id: HolderId(id.to_string()),
        tenant_id: tenant_id(),
        name: name.to_string(),
        email: format!("{id}@acme.test"),
        role,
        regulatory: Default::default(),
    }
}

pub(super) fn roster() -> Vec<Holder> {
    vec![
        holder("user-1", "Alex Thompson", HolderRole::Admin),
        holder("user-2", "Sarah Johnson", HolderRole::Member),
        holder("user-3", "Mike Davis", HolderRole::Member),
    ]
}

pub(super) fn credential(id: &str, owner: CredentialOwner, expires_in: i64, resident: bool) -> Credential {
    Credential {
        id: CredentialId(id.to_string()),
        tenant_id: tenant_id(),
        owner,
        category: CredentialCategory::LifeAndHealth,
        jurisdiction: Jurisdiction::parse("CA"),
        reference_number: format!("CA-{id}"),
        issue_date: Some(today() - Duration::days(365)),
        expiry_date: today() + Duration::days(expires_in),
        status: ComplianceStatus::Active,
        resident,
        renewal_url: None,
        notes: None,
        documents: Vec::new(),
    }
}

pub(super) fn ce_record(id: &str, holder: &str, completed: u32) -> CeRecord {
    CeRecord {
        id: CeRecordId(id.to_string()),
        tenant_id: tenant_id(),
        holder_id: HolderId(holder.to_string()),
        jurisdiction: Jurisdiction::parse("CA"),
        hours_required: 24,
        hours_completed: completed,
        expiry_date: today() + Duration::days(200),
        course_name: Some("Ethics".to_string()),
        completion_date: None,
        provider: None,
    }
}

pub(super) type TestService = ComplianceService<MemoryRepository, MemoryNotifier>;

/// Service over a seeded agency with three holders on a five-seat plan.
pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryNotifier>) {
    let repository = Arc::new(MemoryRepository::seeded(tenant(5, 3), roster()));
    let notifier = Arc::new(MemoryNotifier::default());
    let service =
        ComplianceService::new(repository.clone(), notifier.clone(), CompliancePolicy::default());
    (service, repository, notifier)
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    credential_router(Arc::new(service), tenant_id())
}

#[derive(Default)]
struct Store {
    tenants: HashMap<TenantId, Tenant>,
    holders: Vec<Holder>,
    credentials: Vec<Credential>,
    ce_records: Vec<CeRecord>,
    batches: usize,
    tenant_saves_fail: bool,
    holder_deletes_fail: bool,
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    store: Arc<Mutex<Store>>,
}

impl MemoryRepository {
    pub(super) fn seeded(tenant: Tenant, holders: Vec<Holder>) -> Self {
        let mut store = Store::default();
        store.tenants.insert(tenant.id.clone(), tenant);
        store.holders = holders;
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub(super) fn insert_credentials(&self, credentials: Vec<Credential>) {
        self.store
            .lock()
            .expect("repository mutex poisoned")
            .credentials
            .extend(credentials);
    }

    pub(super) fn credentials(&self) -> Vec<Credential> {
        self.store
            .lock()
            .expect("repository mutex poisoned")
            .credentials
            .clone()
    }

    pub(super) fn holders(&self) -> Vec<Holder> {
        self.store
            .lock()
            .expect("repository mutex poisoned")
            .holders
            .clone()
    }

    pub(super) fn ce_records(&self) -> Vec<CeRecord> {
        self.store
            .lock()
            .expect("repository mutex poisoned")
            .ce_records
            .clone()
    }

    pub(super) fn tenant(&self) -> Tenant {
        self.store
            .lock()
            .expect("repository mutex poisoned")
            .tenants
            .get(&tenant_id())
            .cloned()
            .expect("seeded tenant")
    }

    pub(super) fn batches(&self) -> usize {
        self.store.lock().expect("repository mutex poisoned").batches
    }

    pub(super) fn fail_tenant_saves(&self) {
        self.store.lock().expect("repository mutex poisoned").tenant_saves_fail = true;
    }

    pub(super) fn fail_holder_deletes(&self) {
        self.store.lock().expect("repository mutex poisoned").holder_deletes_fail = true;
    }
}

impl ComplianceRepository for MemoryRepository {
    fn load_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard.tenants.get(id).cloned())
    }

    fn save_tenant(&self, tenant: Tenant) -> Result<(), RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        if guard.tenant_saves_fail {
            return Err(RepositoryError::Unavailable("tenant table offline".to_string()));
        }
        guard.tenants.insert(tenant.id.clone(), tenant);
        Ok(())
    }

    fn load_holders(&self, tenant: &TenantId) -> Result<Vec<Holder>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard
            .holders
            .iter()
            .filter(|holder| &holder.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn save_holder(&self, holder: Holder) -> Result<(), RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        match guard.holders.iter().position(|existing| existing.id == holder.id) {
            Some(index) => guard.holders[index] = holder,
            None => guard.holders.push(holder),
        }
        Ok(())
    }

    fn delete_holder(&self, id: &HolderId) -> Result<(), RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        if guard.holder_deletes_fail {
            return Err(RepositoryError::Unavailable("holder table offline".to_string()));
        }
        guard.holders.retain(|holder| &holder.id != id);
        Ok(())
    }

    fn load_credentials(&self, tenant: &TenantId) -> Result<Vec<Credential>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard
            .credentials
            .iter()
            .filter(|credential| &credential.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn save_credentials(&self, batch: Vec<Credential>) -> Result<(), RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        guard.batches += 1;
        for credential in batch {
            match guard
                .credentials
                .iter()
                .position(|existing| existing.id == credential.id)
            {
                Some(index) => guard.credentials[index] = credential,
                None => guard.credentials.push(credential),
            }
        }
        Ok(())
    }

    fn delete_credential(&self, id: &CredentialId) -> Result<(), RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        guard.credentials.retain(|credential| &credential.id != id);
        Ok(())
    }

    fn load_ce_records(&self, tenant: &TenantId) -> Result<Vec<CeRecord>, RepositoryError> {
        let guard = self.store.lock().expect("repository mutex poisoned");
        Ok(guard
            .ce_records
            .iter()
            .filter(|record| &record.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn save_ce_record(&self, record: CeRecord) -> Result<(), RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        match guard.ce_records.iter().position(|existing| existing.id == record.id) {
            Some(index) => guard.ce_records[index] = record,
            None => guard.ce_records.push(record),
        }
        Ok(())
    }

    fn delete_ce_record(&self, id: &CeRecordId) -> Result<(), RepositoryError> {
        let mut guard = self.store.lock().expect("repository mutex poisoned");
        guard.ce_records.retain(|record| &record.id != id);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    sent: Arc<Mutex<Vec<NotificationIntent>>>,
    failing: Arc<Mutex<Vec<CredentialId>>>,
}

impl MemoryNotifier {
    pub(super) fn sent(&self) -> Vec<NotificationIntent> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn fail_for(&self, id: &str) {
        self.failing
            .lock()
            .expect("notifier mutex poisoned")
            .push(CredentialId(id.to_string()));
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, intent: NotificationIntent) -> Result<(), NotificationError> {
        let failing = self.failing.lock().expect("notifier mutex poisoned");
        if failing.contains(&intent.credential_id) {
            return Err(NotificationError::Transport("smtp relay refused".to_string()));
        }
        drop(failing);

        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(intent);
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl ComplianceRepository for UnavailableRepository {
    fn load_tenant(&self, _id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_tenant(&self, _tenant: Tenant) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn load_holders(&self, _tenant: &TenantId) -> Result<Vec<Holder>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_holder(&self, _holder: Holder) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_holder(&self, _id: &HolderId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn load_credentials(&self, _tenant: &TenantId) -> Result<Vec<Credential>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_credentials(&self, _batch: Vec<Credential>) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_credential(&self, _id: &CredentialId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn load_ce_records(&self, _tenant: &TenantId) -> Result<Vec<CeRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_ce_record(&self, _record: CeRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_ce_record(&self, _id: &CeRecordId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
