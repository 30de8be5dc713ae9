use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{days_remaining, derive_status};

/// Identifier wrapper for tracked credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(pub String);

impl CredentialId {
    pub fn generate() -> Self {
        Self(format!("lic-{}", Uuid::new_v4()))
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for people tracked by an agency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(pub String);

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CeRecordId(pub String);

impl CeRecordId {
    pub fn generate() -> Self {
        Self(format!("ce-{}", Uuid::new_v4()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

/// Who a credential belongs to: a person on the roster, or the agency itself
/// (errors & omissions coverage, agency-level registrations).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "holder_id", rename_all = "snake_case")]
pub enum CredentialOwner {
    Holder(HolderId),
    Agency,
}

impl CredentialOwner {
    pub fn holder(id: impl Into<String>) -> Self {
        Self::Holder(HolderId(id.into()))
    }

    /// Parse the compact form used by query strings and the CLI: `agency`, or a holder id.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("agency") {
            Self::Agency
        } else {
            Self::Holder(HolderId(trimmed.to_string()))
        }
    }

    pub fn holder_id(&self) -> Option<&HolderId> {
        match self {
            Self::Holder(id) => Some(id),
            Self::Agency => None,
        }
    }
}

impl fmt::Display for CredentialOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Holder(id) => f.write_str(&id.0),
            Self::Agency => f.write_str("agency"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolderRole {
    Admin,
    Member,
}

impl HolderRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::Member => "Member",
        }
    }
}

impl FromStr for HolderRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            other => Err(format!("unknown role '{other}' (expected admin or member)")),
        }
    }
}

/// Compliance state derived from the expiry date. The stored copy on a
/// [`Credential`] is a display cache and is re-derived before any rule runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceStatus {
    #[default]
    Active,
    ExpiringSoon,
    Expired,
}

impl ComplianceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::ExpiringSoon => "Expiring Soon",
            Self::Expired => "Expired",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ExpiringSoon => "expiring-soon",
            Self::Expired => "expired",
        }
    }
}

impl FromStr for ComplianceStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "expiring-soon" | "expiring_soon" => Ok(Self::ExpiringSoon),
            "expired" => Ok(Self::Expired),
            other => Err(format!(
                "unknown status '{other}' (expected active, expiring-soon or expired)"
            )),
        }
    }
}

/// Credential kinds offered by the product. Labels are the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CredentialCategory {
    LifeAndHealth,
    PropertyAndCasualty,
    ErrorsAndOmissions,
    FixedAndVariableAnnuities,
    FinraSeries6,
    FinraSeries7,
    FinraSeries63,
    FinraSeries65,
    WorkersComp,
    Property,
    Liability,
    BusinessOwners,
    Certification { name: Option<String> },
    Other(String),
}

const CERTIFICATION_LABEL: &str = "Certification";

impl CredentialCategory {
    pub fn known() -> [Self; 13] {
        [
            Self::LifeAndHealth,
            Self::PropertyAndCasualty,
            Self::ErrorsAndOmissions,
            Self::FixedAndVariableAnnuities,
            Self::FinraSeries6,
            Self::FinraSeries7,
            Self::FinraSeries63,
            Self::FinraSeries65,
            Self::WorkersComp,
            Self::Property,
            Self::Liability,
            Self::BusinessOwners,
            Self::Certification { name: None },
        ]
    }

    pub fn label(&self) -> &str {
        match self {
            Self::LifeAndHealth => "Life & Health",
            Self::PropertyAndCasualty => "Property & Casualty",
            Self::ErrorsAndOmissions => "E&O Insurance",
            Self::FixedAndVariableAnnuities => "Fixed & Variable Annuities",
            Self::FinraSeries6 => "FINRA Series 6",
            Self::FinraSeries7 => "FINRA Series 7",
            Self::FinraSeries63 => "FINRA Series 63",
            Self::FinraSeries65 => "FINRA Series 65",
            Self::WorkersComp => "Workers Comp",
            Self::Property => "Property",
            Self::Liability => "Liability",
            Self::BusinessOwners => "Business Owners",
            Self::Certification { .. } => CERTIFICATION_LABEL,
            Self::Other(label) => label,
        }
    }

    /// Label including the certification sub-name, e.g. `Certification: CPCU`.
    pub fn display_name(&self) -> String {
        match self {
            Self::Certification {
                name: Some(name), ..
            } => format!("{CERTIFICATION_LABEL}: {name}"),
            other => other.label().to_string(),
        }
    }

    /// Kind equality: every certification matches every other certification.
    pub fn same_kind(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Certification { .. }, Self::Certification { .. }) => true,
            (Self::Other(left), Self::Other(right)) => left.eq_ignore_ascii_case(right),
            (left, right) => left == right,
        }
    }

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(rest) = strip_prefix_ignore_case(trimmed, CERTIFICATION_LABEL) {
            let name = rest.trim_start_matches([':', '-']).trim();
            if rest.is_empty() || rest.starts_with([':', '-', ' ']) {
                return Self::Certification {
                    name: (!name.is_empty()).then(|| name.to_string()),
                };
            }
        }

        Self::known()
            .into_iter()
            .find(|candidate| candidate.label().eq_ignore_ascii_case(trimmed))
            .unwrap_or_else(|| Self::Other(trimmed.to_string()))
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

impl From<String> for CredentialCategory {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<CredentialCategory> for String {
    fn from(value: CredentialCategory) -> Self {
        value.display_name()
    }
}

const MULTI_STATE_LABEL: &str = "Multi-State";

/// A state or region code, or the multi-jurisdiction sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Jurisdiction {
    State(String),
    MultiState,
}

impl Jurisdiction {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let compact: String = trimmed
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .collect();
        if compact.eq_ignore_ascii_case("multistate") {
            Self::MultiState
        } else {
            Self::State(trimmed.to_ascii_uppercase())
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::State(code) => code,
            Self::MultiState => MULTI_STATE_LABEL,
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<String> for Jurisdiction {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Jurisdiction> for String {
    fn from(value: Jurisdiction) -> Self {
        value.code().to_string()
    }
}

/// Reference to a file held by the document store. Content is never read here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: DocumentId,
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub media_type: String,
    pub content_handle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub tenant_id: TenantId,
    pub owner: CredentialOwner,
    pub category: CredentialCategory,
    pub jurisdiction: Jurisdiction,
    pub reference_number: String,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub status: ComplianceStatus,
    #[serde(default)]
    pub resident: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

impl Credential {
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        days_remaining(self.expiry_date, today)
    }

    pub fn current_status(&self, today: NaiveDate) -> ComplianceStatus {
        derive_status(self.expiry_date, today)
    }

    /// Overwrite the cached status with the one derived for `today`.
    pub fn refresh_status(&mut self, today: NaiveDate) -> ComplianceStatus {
        self.status = self.current_status(today);
        self.status
    }

    pub fn annotated(mut self, today: NaiveDate) -> Self {
        self.refresh_status(today);
        self
    }

    pub fn is_owned_by(&self, owner: &CredentialOwner) -> bool {
        &self.owner == owner
    }
}

/// Identifiers used only to pre-fill external renewal portals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatoryIdentifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub national_producer_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssn_last4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crd_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub id: HolderId,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    pub role: HolderRole,
    #[serde(default)]
    pub regulatory: RegulatoryIdentifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Individual,
    Team,
    Enterprise,
}

impl PlanTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Individual => "Individual",
            Self::Team => "Team",
            Self::Enterprise => "Enterprise",
        }
    }
}

/// Registration and contact details shown on invoices and renewal paperwork.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fein: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub plan: PlanTier,
    pub max_seats: u32,
    pub current_seats: u32,
    #[serde(default)]
    pub billing: BillingProfile,
}

impl Tenant {
    pub fn seats_available(&self) -> u32 {
        self.max_seats.saturating_sub(self.current_seats)
    }

    pub fn has_free_seat(&self) -> bool {
        self.current_seats < self.max_seats
    }
}

/// Continuing-education hours for one holder and one jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeRecord {
    pub id: CeRecordId,
    pub tenant_id: TenantId,
    pub holder_id: HolderId,
    pub jurisdiction: Jurisdiction,
    pub hours_required: u32,
    pub hours_completed: u32,
    pub expiry_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Rule violations raised by the engine's write path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComplianceError {
    #[error("issue date {issue_date} is more than {grace_days} days after {today}")]
    IssueDateTooFarAhead {
        issue_date: NaiveDate,
        today: NaiveDate,
        grace_days: i64,
    },
    #[error("{tenant} has no free seats ({current}/{max} in use)")]
    SeatLimitReached {
        tenant: TenantId,
        current: u32,
        max: u32,
    },
    #[error("tenant {0} not found")]
    UnknownTenant(TenantId),
    #[error("holder {0} already exists")]
    DuplicateHolder(HolderId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_round_trips_labels() {
        for category in CredentialCategory::known() {
            assert_eq!(CredentialCategory::parse(category.label()), category);
        }
        assert_eq!(
            CredentialCategory::parse("  life & HEALTH "),
            CredentialCategory::LifeAndHealth
        );
    }

    #[test]
    fn certification_carries_sub_name() {
        let parsed = CredentialCategory::parse("Certification: CPCU");
        assert_eq!(
            parsed,
            CredentialCategory::Certification {
                name: Some("CPCU".to_string())
            }
        );
        assert_eq!(parsed.display_name(), "Certification: CPCU");
        assert!(parsed.same_kind(&CredentialCategory::Certification { name: None }));
    }

    #[test]
    fn unknown_category_is_preserved() {
        let parsed = CredentialCategory::parse("State Producer");
        assert_eq!(parsed, CredentialCategory::Other("State Producer".to_string()));
        assert_eq!(parsed.label(), "State Producer");
        assert_eq!(
            CredentialCategory::parse("Certifications Board"),
            CredentialCategory::Other("Certifications Board".to_string())
        );
    }

    #[test]
    fn jurisdiction_recognizes_multi_state_spellings() {
        assert_eq!(Jurisdiction::parse("Multi-State"), Jurisdiction::MultiState);
        assert_eq!(Jurisdiction::parse("multi state"), Jurisdiction::MultiState);
        assert_eq!(Jurisdiction::parse(" ca "), Jurisdiction::State("CA".to_string()));
        assert_eq!(Jurisdiction::MultiState.code(), "Multi-State");
    }

    #[test]
    fn owner_parse_distinguishes_agency() {
        assert_eq!(CredentialOwner::parse("Agency"), CredentialOwner::Agency);
        assert_eq!(CredentialOwner::parse("user-2"), CredentialOwner::holder("user-2"));
    }

    #[test]
    fn owner_serializes_with_kind_tag() {
        let json = serde_json::to_value(CredentialOwner::holder("user-1")).expect("serialize");
        assert_eq!(json["kind"], "holder");
        assert_eq!(json["holder_id"], "user-1");

        let agency: CredentialOwner =
            serde_json::from_str(r#"{"kind":"agency"}"#).expect("deserialize");
        assert_eq!(agency, CredentialOwner::Agency);
    }

    #[test]
    fn tenant_seat_accounting() {
        let tenant = Tenant {
            id: TenantId("agency-1".to_string()),
            name: "Acme".to_string(),
            plan: PlanTier::Team,
            max_seats: 5,
            current_seats: 5,
            billing: BillingProfile::default(),
        };
        assert!(!tenant.has_free_seat());
        assert_eq!(tenant.seats_available(), 0);
    }

    #[test]
    fn status_parses_query_values() {
        assert_eq!(
            "expiring-soon".parse::<ComplianceStatus>(),
            Ok(ComplianceStatus::ExpiringSoon)
        );
        assert!("soon".parse::<ComplianceStatus>().is_err());
        assert_eq!("Admin".parse::<HolderRole>(), Ok(HolderRole::Admin));
    }
}
