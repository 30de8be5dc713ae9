use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;

use super::domain::{
    CeRecord, CeRecordId, ComplianceStatus, Credential, CredentialCategory, CredentialId,
    CredentialOwner, DocumentRef, Holder, HolderId, HolderRole, Jurisdiction,
    RegulatoryIdentifiers, Tenant, TenantId,
};
use super::repository::{ComplianceRepository, NotificationPublisher};
use super::service::{ComplianceService, ServiceError};
use super::views::{CredentialFilter, Viewer};

/// Shared handler state: the service plus the tenant this process serves.
pub struct CredentialApi<R, N> {
    service: Arc<ComplianceService<R, N>>,
    tenant_id: TenantId,
}

impl<R, N> Clone for CredentialApi<R, N> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            tenant_id: self.tenant_id.clone(),
        }
    }
}

/// Router builder exposing the credential, renewal, roster, and CE endpoints.
pub fn credential_router<R, N>(service: Arc<ComplianceService<R, N>>, tenant_id: TenantId) -> Router
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/credentials",
            get(list_handler::<R, N>).post(save_handler::<R, N>),
        )
        .route(
            "/api/v1/credentials/:credential_id",
            delete(delete_credential_handler::<R, N>),
        )
        .route("/api/v1/credentials/import", post(import_handler::<R, N>))
        .route("/api/v1/renewals/upcoming", get(upcoming_handler::<R, N>))
        .route("/api/v1/renewals/dispatch", post(dispatch_handler::<R, N>))
        .route("/api/v1/calendar", get(calendar_handler::<R, N>))
        .route("/api/v1/dashboard", get(dashboard_handler::<R, N>))
        .route("/api/v1/holders", post(add_holder_handler::<R, N>))
        .route(
            "/api/v1/holders/:holder_id",
            delete(remove_holder_handler::<R, N>).put(update_holder_handler::<R, N>),
        )
        .route(
            "/api/v1/ce-records",
            get(ce_list_handler::<R, N>).post(ce_save_handler::<R, N>),
        )
        .route(
            "/api/v1/ce-records/:record_id",
            delete(ce_delete_handler::<R, N>),
        )
        .with_state(CredentialApi { service, tenant_id })
}

/// Query parameters shared by the read endpoints. Authentication happens
/// upstream; the caller states who is looking.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ViewerQuery {
    viewer: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    today: Option<NaiveDate>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    jurisdiction: Option<String>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    window: Option<i64>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    month: Option<u32>,
}

impl ViewerQuery {
    fn viewer(&self) -> Result<Viewer, String> {
        let role = match self.role.as_deref() {
            Some(raw) => raw.parse::<HolderRole>()?,
            None => HolderRole::Member,
        };
        Ok(Viewer::new(self.viewer.trim(), role))
    }

    fn filter(&self) -> Result<CredentialFilter, String> {
        let mut filter = CredentialFilter::default();
        if let Some(status) = self.status.as_deref() {
            filter = filter.with_status(status.parse::<ComplianceStatus>()?);
        }
        if let Some(owner) = self.owner.as_deref() {
            filter = filter.with_owner(CredentialOwner::parse(owner));
        }
        if let Some(category) = self.category.as_deref() {
            filter = filter.with_category(CredentialCategory::parse(category));
        }
        if let Some(jurisdiction) = self.jurisdiction.as_deref() {
            filter = filter.with_jurisdiction(Jurisdiction::parse(jurisdiction));
        }
        if let Some(search) = self.search.as_deref() {
            filter = filter.with_search(search);
        }
        Ok(filter)
    }

    fn month(&self) -> Result<Option<(i32, u32)>, String> {
        match (self.year, self.month) {
            (Some(year), Some(month)) if (1..=12).contains(&month) => Ok(Some((year, month))),
            (None, None) => Ok(None),
            _ => Err("calendar month needs year and month (1-12)".to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DateQuery {
    #[serde(default)]
    today: Option<NaiveDate>,
}

fn resolve_today(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

/// Body for creating or replacing a credential. A missing id creates a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialInput {
    #[serde(default)]
    pub id: Option<CredentialId>,
    pub owner: CredentialOwner,
    pub category: CredentialCategory,
    pub jurisdiction: Jurisdiction,
    pub reference_number: String,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub resident: bool,
    #[serde(default)]
    pub renewal_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

impl CredentialInput {
    fn into_credential(self, tenant_id: TenantId) -> Credential {
        Credential {
            id: self.id.unwrap_or_else(CredentialId::generate),
            tenant_id,
            owner: self.owner,
            category: self.category,
            jurisdiction: self.jurisdiction,
            reference_number: self.reference_number.trim().to_string(),
            issue_date: self.issue_date,
            expiry_date: self.expiry_date,
            status: ComplianceStatus::default(),
            resident: self.resident,
            renewal_url: self.renewal_url,
            notes: self.notes,
            documents: self.documents,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    /// `agency` or a holder id.
    pub holder: String,
    pub csv: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderInput {
    pub id: HolderId,
    pub name: String,
    pub email: String,
    pub role: HolderRole,
    #[serde(default)]
    pub regulatory: RegulatoryIdentifiers,
}

impl HolderInput {
    fn into_holder(self, tenant_id: TenantId) -> Holder {
        Holder {
            id: self.id,
            tenant_id,
            name: self.name,
            email: self.email,
            role: self.role,
            regulatory: self.regulatory,
        }
    }
}

#[derive(Debug, Serialize)]
struct HolderAdded {
    holder: Holder,
    tenant: Tenant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CeRecordInput {
    #[serde(default)]
    pub id: Option<CeRecordId>,
    pub holder_id: HolderId,
    pub jurisdiction: Jurisdiction,
    pub hours_required: u32,
    #[serde(default)]
    pub hours_completed: u32,
    pub expiry_date: NaiveDate,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub provider: Option<String>,
}

impl CeRecordInput {
    fn into_record(self, tenant_id: TenantId) -> CeRecord {
        CeRecord {
            id: self.id.unwrap_or_else(CeRecordId::generate),
            tenant_id,
            holder_id: self.holder_id,
            jurisdiction: self.jurisdiction,
            hours_required: self.hours_required,
            hours_completed: self.hours_completed,
            expiry_date: self.expiry_date,
            course_name: self.course_name,
            completion_date: self.completion_date,
            provider: self.provider,
        }
    }
}

pub(crate) async fn list_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Query(query): Query<ViewerQuery>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let (viewer, filter) = match query.viewer().and_then(|viewer| Ok((viewer, query.filter()?))) {
        Ok(parsed) => parsed,
        Err(message) => return bad_request(message),
    };

    match api
        .service
        .view(&api.tenant_id, &viewer, &filter, resolve_today(query.today))
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Query(date): Query<DateQuery>,
    Json(input): Json<CredentialInput>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let credential = input.into_credential(api.tenant_id.clone());
    match api
        .service
        .save_credential(credential, resolve_today(date.today))
    {
        Ok(saved) => (StatusCode::CREATED, Json(saved)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_credential_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Path(credential_id): Path<String>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match api
        .service
        .delete_credential(&api.tenant_id, &CredentialId(credential_id))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn import_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Json(request): Json<ImportRequest>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let owner = CredentialOwner::parse(&request.holder);
    match api.service.import(
        &api.tenant_id,
        &request.csv,
        &owner,
        resolve_today(request.today),
        request.dry_run,
    ) {
        Ok(outcome) if outcome.batch_rejected() => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(outcome)).into_response()
        }
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn upcoming_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Query(query): Query<ViewerQuery>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let viewer = match query.viewer() {
        Ok(viewer) => viewer,
        Err(message) => return bad_request(message),
    };

    match api.service.upcoming(
        &api.tenant_id,
        &viewer,
        query.window,
        query.limit,
        resolve_today(query.today),
    ) {
        Ok(upcoming) => (StatusCode::OK, Json(upcoming)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn calendar_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Query(query): Query<ViewerQuery>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let (viewer, month) = match query.viewer().and_then(|viewer| Ok((viewer, query.month()?))) {
        Ok(parsed) => parsed,
        Err(message) => return bad_request(message),
    };

    match api
        .service
        .calendar(&api.tenant_id, &viewer, month, resolve_today(query.today))
    {
        Ok(calendar) => (StatusCode::OK, Json(calendar)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dashboard_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Query(query): Query<ViewerQuery>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let viewer = match query.viewer() {
        Ok(viewer) => viewer,
        Err(message) => return bad_request(message),
    };

    match api
        .service
        .dashboard(&api.tenant_id, &viewer, resolve_today(query.today))
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dispatch_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Query(date): Query<DateQuery>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match api
        .service
        .dispatch_renewals(&api.tenant_id, resolve_today(date.today))
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_holder_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Json(input): Json<HolderInput>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let holder = input.into_holder(api.tenant_id.clone());
    match api.service.add_holder(holder.clone()) {
        Ok(tenant) => (StatusCode::CREATED, Json(HolderAdded { holder, tenant })).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_holder_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Path(holder_id): Path<String>,
    Json(input): Json<HolderInput>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    if input.id.0 != holder_id {
        return bad_request("holder id in path and body differ".to_string());
    }

    match api
        .service
        .update_holder(input.into_holder(api.tenant_id.clone()))
    {
        Ok(holder) => (StatusCode::OK, Json(holder)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remove_holder_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Path(holder_id): Path<String>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match api
        .service
        .remove_holder(&api.tenant_id, &HolderId(holder_id))
    {
        Ok(removed) => (StatusCode::OK, Json(removed)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ce_list_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Query(query): Query<ViewerQuery>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let viewer = match query.viewer() {
        Ok(viewer) => viewer,
        Err(message) => return bad_request(message),
    };

    match api
        .service
        .ce_progress(&api.tenant_id, &viewer, resolve_today(query.today))
    {
        Ok(progress) => (StatusCode::OK, Json(progress)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ce_save_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Json(input): Json<CeRecordInput>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match api
        .service
        .save_ce_record(input.into_record(api.tenant_id.clone()))
    {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn ce_delete_handler<R, N>(
    State(api): State<CredentialApi<R, N>>,
    Path(record_id): Path<String>,
) -> Response
where
    R: ComplianceRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match api
        .service
        .delete_ce_record(&api.tenant_id, &CeRecordId(record_id))
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

fn bad_request(message: String) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn error_response(error: ServiceError) -> Response {
    let payload = json!({ "error": error.to_string() });
    let status = AppError::from(error).status();
    (status, Json(payload)).into_response()
}
