mod mapping;
mod normalizer;
mod parser;

pub use mapping::ImportColumn;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::workflows::credentials::{
    normalize_resident, ComplianceError, CompliancePolicy, Credential, CredentialCategory,
    CredentialId, CredentialOwner, Jurisdiction, TenantId,
};

use mapping::ColumnMap;
use normalizer::{non_empty, parse_iso_date, parse_resident_flag};

/// Row number used for rejections that apply to the whole payload.
pub const BATCH_ROW: usize = 0;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read credential import: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a row (or the whole batch) was not imported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectionReason {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("{0} is required")]
    EmptyField(&'static str),
    #[error("{column} '{value}' is not a YYYY-MM-DD date")]
    InvalidDate { column: &'static str, value: String },
    #[error(transparent)]
    Compliance(#[from] ComplianceError),
    #[error("unreadable input: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    pub row_number: usize,
    #[serde(serialize_with = "reason_as_text")]
    pub reason: RejectionReason,
}

fn reason_as_text<S: Serializer>(reason: &RejectionReason, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutcome {
    pub accepted: Vec<Credential>,
    pub rejected: Vec<RowRejection>,
    /// Pre-existing records whose resident flag was cleared by an accepted row.
    pub cleared: Vec<Credential>,
}

impl ImportOutcome {
    pub fn batch_rejected(&self) -> bool {
        self.rejected
            .iter()
            .any(|rejection| rejection.row_number == BATCH_ROW)
    }

    fn reject_batch(reason: RejectionReason) -> Self {
        Self {
            rejected: vec![RowRejection {
                row_number: BATCH_ROW,
                reason,
            }],
            ..Self::default()
        }
    }
}

/// Turns a tabular credential export into validated records for one holder.
#[derive(Debug, Clone)]
pub struct CredentialImporter {
    tenant_id: TenantId,
    policy: CompliancePolicy,
}

impl CredentialImporter {
    pub fn new(tenant_id: TenantId, policy: CompliancePolicy) -> Self {
        Self { tenant_id, policy }
    }

    pub fn from_path<P: AsRef<Path>>(
        &self,
        path: P,
        default_holder: &CredentialOwner,
        existing: &[Credential],
        today: NaiveDate,
    ) -> Result<ImportOutcome, ImportError> {
        let file = std::fs::File::open(path)?;
        self.from_reader(file, default_holder, existing, today)
    }

    pub fn from_reader<R: Read>(
        &self,
        mut reader: R,
        default_holder: &CredentialOwner,
        existing: &[Credential],
        today: NaiveDate,
    ) -> Result<ImportOutcome, ImportError> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        Ok(self.import_rows(&raw, default_holder, existing, today))
    }

    /// Validate every row independently and assign accepted ones to
    /// `default_holder`. `existing` is the tenant's current credential set;
    /// only the default holder's records take part in resident normalization.
    pub fn import_rows(
        &self,
        raw: &str,
        default_holder: &CredentialOwner,
        existing: &[Credential],
        today: NaiveDate,
    ) -> ImportOutcome {
        let table = match parser::read_table(raw) {
            Ok(table) => table,
            Err(err) => {
                warn!(error = %err, "credential import header unreadable");
                return ImportOutcome::reject_batch(RejectionReason::Malformed(err.to_string()));
            }
        };

        let columns = match ColumnMap::from_headers(&table.headers) {
            Ok(columns) => columns,
            Err(missing) => {
                warn!(missing = ?missing, "credential import rejected");
                return ImportOutcome::reject_batch(RejectionReason::MissingColumns(missing));
            }
        };

        let mut owned: Vec<Credential> = existing
            .iter()
            .filter(|credential| {
                credential.tenant_id == self.tenant_id && credential.is_owned_by(default_holder)
            })
            .cloned()
            .collect();
        let mut cleared_ids: HashSet<CredentialId> = HashSet::new();
        let mut outcome = ImportOutcome::default();

        for row in table.rows {
            let candidate = row
                .cells
                .map_err(RejectionReason::Malformed)
                .and_then(|cells| self.build_credential(&columns, &cells, default_holder, today));

            match candidate {
                Ok(credential) => {
                    cleared_ids.extend(normalize_resident(&credential, &mut owned));
                    normalize_resident(&credential, &mut outcome.accepted);
                    outcome.accepted.push(credential);
                }
                Err(reason) => {
                    warn!(row = row.row_number, reason = %reason, "credential row rejected");
                    outcome.rejected.push(RowRejection {
                        row_number: row.row_number,
                        reason,
                    });
                }
            }
        }

        outcome.cleared = owned
            .into_iter()
            .filter(|credential| cleared_ids.contains(&credential.id))
            .collect();

        info!(
            tenant = %self.tenant_id,
            owner = %default_holder,
            accepted = outcome.accepted.len(),
            rejected = outcome.rejected.len(),
            cleared = outcome.cleared.len(),
            "credential import processed"
        );

        outcome
    }

    fn build_credential(
        &self,
        columns: &ColumnMap,
        cells: &StringRecord,
        owner: &CredentialOwner,
        today: NaiveDate,
    ) -> Result<Credential, RejectionReason> {
        if cells.len() != columns.width() {
            return Err(RejectionReason::ColumnCount {
                expected: columns.width(),
                found: cells.len(),
            });
        }

        let cell = |column: ImportColumn| non_empty(columns.get(cells, column));
        let required = |column: ImportColumn| {
            cell(column).ok_or(RejectionReason::EmptyField(column.header()))
        };

        let reference_number = required(ImportColumn::LicenseNumber)?;
        let state = required(ImportColumn::State)?;
        let expiry_raw = required(ImportColumn::ExpiryDate)?;
        let category = required(ImportColumn::Type)?;

        let expiry_date = parse_date(ImportColumn::ExpiryDate, expiry_raw)?;
        let issue_date = cell(ImportColumn::IssueDate)
            .map(|value| parse_date(ImportColumn::IssueDate, value))
            .transpose()?;
        self.policy.check_issue_date(issue_date, today)?;

        let credential = Credential {
            id: CredentialId::generate(),
            tenant_id: self.tenant_id.clone(),
            owner: owner.clone(),
            category: CredentialCategory::parse(category),
            jurisdiction: Jurisdiction::parse(state),
            reference_number: reference_number.to_string(),
            issue_date,
            expiry_date,
            status: Default::default(),
            resident: parse_resident_flag(columns.get(cells, ImportColumn::IsResidentState)),
            renewal_url: cell(ImportColumn::RenewalLink).map(str::to_string),
            notes: cell(ImportColumn::Notes).map(str::to_string),
            documents: Vec::new(),
        };

        Ok(credential.annotated(today))
    }
}

fn parse_date(column: ImportColumn, value: &str) -> Result<NaiveDate, RejectionReason> {
    parse_iso_date(value).ok_or_else(|| RejectionReason::InvalidDate {
        column: column.header(),
        value: value.to_string(),
    })
}
