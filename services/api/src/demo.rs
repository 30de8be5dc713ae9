use crate::infra::{InMemoryComplianceRepository, Runtime, StoreSnapshot};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use licenseguard::error::AppError;
use licenseguard::workflows::credentials::{
    BillingProfile, CeProgress, CeRecord, CeRecordId, ComplianceStatus, CompliancePolicy,
    Credential, CredentialCategory, CredentialFilter, CredentialId, CredentialOwner,
    CredentialView, DashboardSummary, Holder, HolderId, HolderRole, Jurisdiction, PlanTier,
    RegulatoryIdentifiers, Tenant, TenantId, UpcomingRenewal, Viewer,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the reporting date (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

/// The sample agency shipped with the product: three people on a five-seat
/// team plan and five credentials spread across every status. Dates are
/// relative to `today` so the walkthrough always has something to show.
pub(crate) fn demo_snapshot(tenant_id: &TenantId, today: NaiveDate) -> StoreSnapshot {
    let at = |offset: i64| today + Duration::days(offset);
    let person = |id: &str, name: &str, email: &str, role: HolderRole| Holder {
        id: HolderId(id.to_string()),
        tenant_id: tenant_id.clone(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        regulatory: RegulatoryIdentifiers::default(),
    };
    let license = |id: &str,
                   owner: CredentialOwner,
                   category: CredentialCategory,
                   jurisdiction: &str,
                   reference: &str,
                   issued: i64,
                   expires: i64| Credential {
        id: CredentialId(id.to_string()),
        tenant_id: tenant_id.clone(),
        owner,
        category,
        jurisdiction: Jurisdiction::parse(jurisdiction),
        reference_number: reference.to_string(),
        issue_date: Some(at(issued)),
        expiry_date: at(expires),
        status: ComplianceStatus::default(),
        resident: false,
        renewal_url: None,
        notes: None,
        documents: Vec::new(),
    };

    let mut primary = license(
        "lic-1",
        CredentialOwner::holder("user-1"),
        CredentialCategory::LifeAndHealth,
        "CA",
        "CA-12345678",
        -700,
        30,
    );
    primary.resident = true;
    primary.renewal_url = Some("https://insurance.ca.gov/renewals".to_string());
    primary.notes = Some("Primary California producer license".to_string());

    let mut casualty = license(
        "lic-3",
        CredentialOwner::holder("user-1"),
        CredentialCategory::PropertyAndCasualty,
        "TX",
        "TX-99887766",
        -310,
        420,
    );
    casualty.renewal_url = Some("https://tdi.texas.gov/renewals".to_string());

    let mut annuities = license(
        "lic-4",
        CredentialOwner::holder("user-2"),
        CredentialCategory::FixedAndVariableAnnuities,
        "FL",
        "FVA-2024-001",
        -305,
        60,
    );
    annuities.notes = Some("Need 24 hours of CE credits".to_string());

    let mut coverage = license(
        "lic-5",
        CredentialOwner::Agency,
        CredentialCategory::ErrorsAndOmissions,
        "Multi-State",
        "EO-2024-789",
        -320,
        45,
    );
    coverage.notes = Some("$1M coverage, renewal needed".to_string());

    StoreSnapshot {
        tenants: vec![Tenant {
            id: tenant_id.clone(),
            name: "Acme Insurance Agency".to_string(),
            plan: PlanTier::Team,
            max_seats: 5,
            current_seats: 3,
            billing: BillingProfile {
                email: Some("billing@acmeinsurance.com".to_string()),
                ..BillingProfile::default()
            },
        }],
        holders: vec![
            person("user-1", "Alex Thompson", "admin@acmeinsurance.com", HolderRole::Admin),
            person("user-2", "Sarah Johnson", "sarah@acmeinsurance.com", HolderRole::Member),
            person("user-3", "Mike Davis", "mike@acmeinsurance.com", HolderRole::Member),
        ],
        credentials: vec![
            primary,
            license(
                "lic-2",
                CredentialOwner::holder("user-1"),
                CredentialCategory::LifeAndHealth,
                "NY",
                "NY-87654321",
                -750,
                -20,
            ),
            casualty,
            annuities,
            coverage,
        ],
        ce_records: vec![CeRecord {
            id: CeRecordId("ce-1".to_string()),
            tenant_id: tenant_id.clone(),
            holder_id: HolderId("user-2".to_string()),
            jurisdiction: Jurisdiction::parse("FL"),
            hours_required: 24,
            hours_completed: 6,
            expiry_date: at(60),
            course_name: Some("Annuity Suitability".to_string()),
            completion_date: None,
            provider: None,
        }],
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let tenant_id = TenantId("agency-1".to_string());
    let repository = Arc::new(InMemoryComplianceRepository::with_snapshot(demo_snapshot(
        &tenant_id, today,
    )));
    let runtime = Runtime::over(repository, tenant_id.clone(), CompliancePolicy::default());
    let service = &runtime.service;

    println!("LicenseGuard demo ({today})");
    render_tenant(&runtime.tenant()?);

    let admin = Viewer::new("user-1", HolderRole::Admin);
    let dashboard = service.dashboard(&tenant_id, &admin, today)?;
    render_dashboard(&dashboard);

    let view = service.view(&tenant_id, &admin, &CredentialFilter::default(), today)?;
    println!("\nAgency view (administrator)");
    render_view(&view);

    let member = Viewer::new("user-2", HolderRole::Member);
    let view = service.view(&tenant_id, &member, &CredentialFilter::default(), today)?;
    println!("\nMy credentials (Sarah Johnson)");
    render_view(&view);

    let calendar = service.calendar(&tenant_id, &admin, None, today)?;
    println!(
        "\nRenewal calendar ({} day window)",
        calendar.window_days
    );
    render_upcoming(&calendar.upcoming);

    let progress = service.ce_progress(&tenant_id, &member, today)?;
    println!("\nContinuing education (Sarah Johnson)");
    render_ce(&progress);

    let report = service.dispatch_renewals(&tenant_id, today)?;
    if report.published.is_empty() {
        println!("\nRenewal reminders: none due today");
    } else {
        println!("\nRenewal reminders sent today");
        for intent in &report.published {
            println!(
                "  - [{}] {} -> {}",
                intent.threshold.label(),
                intent.subject,
                intent
                    .recipient
                    .email
                    .as_deref()
                    .unwrap_or(intent.recipient.display_name.as_str())
            );
        }
    }

    Ok(())
}

pub(crate) fn render_tenant(tenant: &Tenant) {
    println!(
        "{} | {} plan | {} of {} seats used, {} available",
        tenant.name,
        tenant.plan.label(),
        tenant.current_seats,
        tenant.max_seats,
        tenant.seats_available()
    );
}

pub(crate) fn render_dashboard(summary: &DashboardSummary) {
    println!(
        "- {} credentials | {} active | {} expiring soon | {} expired | {} team members",
        summary.total,
        summary.active,
        summary.expiring_soon,
        summary.expired,
        summary.team_members
    );
    if !summary.recent.is_empty() {
        println!("Recently added:");
        for credential in &summary.recent {
            println!("  - {}", describe(credential));
        }
    }
    if !summary.upcoming.is_empty() {
        println!("Upcoming renewals:");
        render_upcoming(&summary.upcoming);
    }
}

pub(crate) fn render_view(view: &CredentialView) {
    println!(
        "- {} active | {} expiring soon | {} expired",
        view.counts.active, view.counts.expiring_soon, view.counts.expired
    );
    match &view.groups {
        Some(groups) => {
            for group in groups {
                println!(
                    "  {} ({} credentials)",
                    group.display_name,
                    group.credentials.len()
                );
                for credential in &group.credentials {
                    println!("    - {}", describe(credential));
                }
            }
        }
        None => {
            for credential in &view.credentials {
                println!("  - {}", describe(credential));
            }
        }
    }
}

pub(crate) fn render_upcoming(upcoming: &[UpcomingRenewal]) {
    if upcoming.is_empty() {
        println!("  (nothing due)");
    }
    for entry in upcoming {
        println!(
            "  - {} days: {} {} ({})",
            entry.days_remaining,
            entry.credential.category.display_name(),
            entry.credential.reference_number,
            entry.display_name
        );
    }
}

fn render_ce(progress: &[CeProgress]) {
    if progress.is_empty() {
        println!("  (no CE requirements on file)");
    }
    for entry in progress {
        println!(
            "  - {}: {}/{} hours ({:.0}%) | {} days left{}",
            entry.record.jurisdiction,
            entry.record.hours_completed,
            entry.record.hours_required,
            entry.percent_complete,
            entry.days_remaining,
            if entry.is_complete { " | complete" } else { "" }
        );
    }
}

fn describe(credential: &Credential) -> String {
    let mut line = format!(
        "{} {} [{}] expires {} - {}",
        credential.category.display_name(),
        credential.reference_number,
        credential.jurisdiction,
        credential.expiry_date,
        credential.status.label()
    );
    if credential.resident {
        line.push_str(" (resident)");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid date")
    }

    #[test]
    fn demo_agency_covers_every_status() {
        let tenant_id = TenantId("agency-1".to_string());
        let snapshot = demo_snapshot(&tenant_id, today());

        let statuses: Vec<_> = snapshot
            .credentials
            .iter()
            .map(|credential| credential.current_status(today()))
            .collect();
        assert!(statuses.contains(&ComplianceStatus::Active));
        assert!(statuses.contains(&ComplianceStatus::ExpiringSoon));
        assert!(statuses.contains(&ComplianceStatus::Expired));

        let tenant = &snapshot.tenants[0];
        assert_eq!(tenant.current_seats as usize, snapshot.holders.len());
        assert_eq!(tenant.plan.label(), "Team");
        assert_eq!(tenant.seats_available(), 2);
        assert_eq!(
            snapshot
                .credentials
                .iter()
                .filter(|credential| credential.resident)
                .count(),
            1
        );
    }

    #[test]
    fn demo_runs_end_to_end() {
        run_demo(DemoArgs {
            today: Some(today()),
        })
        .expect("demo completes");
    }
}
