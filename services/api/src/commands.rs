use crate::demo::{render_dashboard, render_tenant, render_upcoming, render_view};
use crate::infra::{parse_date, parse_role, parse_status, Runtime};
use chrono::{Local, NaiveDate};
use clap::Args;
use licenseguard::config::AppConfig;
use licenseguard::error::AppError;
use licenseguard::workflows::credentials::{
    ComplianceStatus, CredentialFilter, CredentialOwner, HolderRole, Viewer,
};
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// Spreadsheet export (CSV) to import
    #[arg(long)]
    pub(crate) file: PathBuf,
    /// Holder id receiving the rows, or `agency` for agency-level credentials
    #[arg(long)]
    pub(crate) holder: String,
    /// Evaluation date for status and issue-date checks (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Validate and report without saving anything
    #[arg(long)]
    pub(crate) dry_run: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Holder id of the person viewing the report
    #[arg(long)]
    pub(crate) viewer: String,
    /// Viewer role: admin or member
    #[arg(long, value_parser = parse_role, default_value = "member")]
    pub(crate) role: HolderRole,
    /// Only show credentials in this status (active, expiring-soon, expired)
    #[arg(long, value_parser = parse_status)]
    pub(crate) status: Option<ComplianceStatus>,
    /// Case-insensitive search over reference number, jurisdiction and category
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Evaluation date for the report (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct RenewalArgs {
    /// Evaluation date for reminder thresholds (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Send the reminders instead of only listing them
    #[arg(long)]
    pub(crate) dispatch: bool,
}

fn resolve_today(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let ImportArgs {
        file,
        holder,
        today,
        dry_run,
    } = args;
    let today = resolve_today(today);
    let config = AppConfig::load()?;
    let runtime = Runtime::bootstrap(&config, today)?;

    let raw = fs::read_to_string(&file)?;
    let owner = CredentialOwner::parse(&holder);
    let outcome = runtime
        .service
        .import(&runtime.tenant_id, &raw, &owner, today, dry_run)?;

    println!(
        "Import of {} for {}{}",
        file.display(),
        owner,
        if dry_run { " (dry run)" } else { "" }
    );
    println!(
        "- {} accepted | {} rejected | {} resident flags cleared",
        outcome.accepted.len(),
        outcome.rejected.len(),
        outcome.cleared.len()
    );
    for credential in &outcome.accepted {
        println!(
            "  + {} {} [{}] {}",
            credential.category.display_name(),
            credential.reference_number,
            credential.jurisdiction,
            credential.status.label()
        );
    }
    for rejection in &outcome.rejected {
        println!("  ! row {}: {}", rejection.row_number, rejection.reason);
    }

    if outcome.batch_rejected() {
        return Err(AppError::Usage(
            "import rejected: the header row is unusable".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        viewer,
        role,
        status,
        search,
        today,
    } = args;
    let today = resolve_today(today);
    let config = AppConfig::load()?;
    let runtime = Runtime::bootstrap(&config, today)?;

    let viewer = Viewer::new(viewer, role);
    let mut filter = CredentialFilter::default();
    if let Some(status) = status {
        filter = filter.with_status(status);
    }
    if let Some(search) = search {
        filter = filter.with_search(search);
    }

    let dashboard = runtime
        .service
        .dashboard(&runtime.tenant_id, &viewer, today)?;
    let view = runtime
        .service
        .view(&runtime.tenant_id, &viewer, &filter, today)?;

    println!(
        "Compliance report for {} as {} ({today})",
        viewer.holder_id,
        viewer.role.label()
    );
    render_tenant(&runtime.tenant()?);
    render_dashboard(&dashboard);
    println!("\nCredentials");
    render_view(&view);
    Ok(())
}

pub(crate) fn run_renewals(args: RenewalArgs) -> Result<(), AppError> {
    let today = resolve_today(args.today);
    let config = AppConfig::load()?;
    let runtime = Runtime::bootstrap(&config, today)?;

    if !args.dispatch {
        let intents = runtime
            .service
            .pending_notifications(&runtime.tenant_id, today)?;
        println!("Renewal reminders due on {today}: {}", intents.len());
        for intent in &intents {
            println!(
                "  - [{}] {} for {}",
                intent.threshold.label(),
                intent.subject,
                intent.recipient.display_name
            );
        }

        let admin = Viewer::new("cli", HolderRole::Admin);
        let upcoming = runtime
            .service
            .upcoming(&runtime.tenant_id, &admin, None, None, today)?;
        println!(
            "\nDue within {} days",
            runtime.service.policy().dashboard_window_days()
        );
        render_upcoming(&upcoming);
        return Ok(());
    }

    let report = runtime
        .service
        .dispatch_renewals(&runtime.tenant_id, today)?;
    println!(
        "Dispatched {} of {} renewal reminders for {today}",
        report.published.len(),
        report.evaluated
    );
    for failure in &report.failed {
        println!("  ! {}: {}", failure.credential_id, failure.error);
    }
    println!("Mock mailer outbox: {} messages", runtime.publisher.sent().len());
    Ok(())
}
