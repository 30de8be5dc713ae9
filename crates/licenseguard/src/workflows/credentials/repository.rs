use super::domain::{
    CeRecord, CeRecordId, Credential, CredentialId, Holder, HolderId, Tenant, TenantId,
};
use super::renewals::NotificationIntent;

/// Storage abstraction so the engine can run against any durable store.
///
/// Implementations must give read-your-writes consistency within one logical
/// operation, and must apply a `save_credentials` batch as a single unit.
pub trait ComplianceRepository: Send + Sync {
    fn load_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError>;
    fn save_tenant(&self, tenant: Tenant) -> Result<(), RepositoryError>;

    fn load_holders(&self, tenant: &TenantId) -> Result<Vec<Holder>, RepositoryError>;
    fn save_holder(&self, holder: Holder) -> Result<(), RepositoryError>;
    fn delete_holder(&self, id: &HolderId) -> Result<(), RepositoryError>;

    fn load_credentials(&self, tenant: &TenantId) -> Result<Vec<Credential>, RepositoryError>;
    fn save_credentials(&self, batch: Vec<Credential>) -> Result<(), RepositoryError>;
    fn delete_credential(&self, id: &CredentialId) -> Result<(), RepositoryError>;

    fn save_credential(&self, credential: Credential) -> Result<(), RepositoryError> {
        self.save_credentials(vec![credential])
    }

    /// Remove several credentials. Stores that can delete in one unit should
    /// override this; the default stops at the first failure.
    fn delete_credentials(&self, ids: &[CredentialId]) -> Result<(), RepositoryError> {
        ids.iter().try_for_each(|id| self.delete_credential(id))
    }

    fn load_ce_records(&self, tenant: &TenantId) -> Result<Vec<CeRecord>, RepositoryError>;
    fn save_ce_record(&self, record: CeRecord) -> Result<(), RepositoryError>;
    fn delete_ce_record(&self, id: &CeRecordId) -> Result<(), RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for renewal reminders (e-mail, SMS, ticketing adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, intent: NotificationIntent) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
