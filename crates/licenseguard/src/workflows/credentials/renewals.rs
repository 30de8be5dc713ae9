use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Credential, CredentialId, CredentialOwner, TenantId};
use super::views::TenantViewBuilder;

/// Fixed reminder points before expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RenewalThreshold {
    #[serde(rename = "90-day")]
    NinetyDays,
    #[serde(rename = "60-day")]
    SixtyDays,
    #[serde(rename = "30-day")]
    ThirtyDays,
}

impl RenewalThreshold {
    pub const fn ordered() -> [Self; 3] {
        [Self::NinetyDays, Self::SixtyDays, Self::ThirtyDays]
    }

    pub const fn days(self) -> i64 {
        match self {
            Self::NinetyDays => 90,
            Self::SixtyDays => 60,
            Self::ThirtyDays => 30,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NinetyDays => "90-day",
            Self::SixtyDays => "60-day",
            Self::ThirtyDays => "30-day",
        }
    }

    /// The threshold landing exactly on `days_remaining`, if any.
    pub fn crossed_at(days_remaining: i64) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|threshold| threshold.days() == days_remaining)
    }
}

/// Credentials whose remaining days equal a threshold today.
///
/// The scheduler is expected to run once per calendar day; each threshold then
/// fires exactly once per credential.
pub fn select_notifications(
    credentials: &[Credential],
    today: NaiveDate,
) -> Vec<(&Credential, RenewalThreshold)> {
    credentials
        .iter()
        .filter_map(|credential| {
            RenewalThreshold::crossed_at(credential.days_remaining(today))
                .map(|threshold| (credential, threshold))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecipient {
    pub owner: CredentialOwner,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// What the notification collaborator should send; never sent from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub credential_id: CredentialId,
    pub tenant_id: TenantId,
    pub threshold: RenewalThreshold,
    pub days_remaining: i64,
    pub expiry_date: NaiveDate,
    pub recipient: NotificationRecipient,
    pub subject: String,
    pub message: String,
}

/// Turns threshold crossings into addressed notification intents.
#[derive(Debug)]
pub struct RenewalScheduler<'a> {
    views: &'a TenantViewBuilder<'a>,
}

impl<'a> RenewalScheduler<'a> {
    pub fn new(views: &'a TenantViewBuilder<'a>) -> Self {
        Self { views }
    }

    pub fn intents(&self, credentials: &[Credential]) -> Vec<NotificationIntent> {
        let today = self.views.today();
        select_notifications(credentials, today)
            .into_iter()
            .map(|(credential, threshold)| self.intent_for(credential, threshold))
            .collect()
    }

    fn intent_for(&self, credential: &Credential, threshold: RenewalThreshold) -> NotificationIntent {
        let label = credential.category.display_name();
        let days = threshold.days();

        let mut message = format!(
            "Your {label} license ({}) expires in {days} days.\nExpiry Date: {}",
            credential.reference_number,
            credential.expiry_date.format("%b %-d, %Y"),
        );
        if let Some(link) = credential.renewal_url.as_deref() {
            message.push_str("\nRenewal Link: ");
            message.push_str(link);
        }

        NotificationIntent {
            credential_id: credential.id.clone(),
            tenant_id: credential.tenant_id.clone(),
            threshold,
            days_remaining: days,
            expiry_date: credential.expiry_date,
            recipient: NotificationRecipient {
                owner: credential.owner.clone(),
                display_name: self.views.display_name(&credential.owner),
                email: self.views.contact_email(&credential.owner),
            },
            subject: format!("License Renewal Alert - {label}"),
            message,
        }
    }
}
