// src/api.rs
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode as AxumStatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{authenticate, AuthStore, Caller};
use crate::date_range::{
    parse_display_date, parse_iso_date, today, DatePeriod, DateRange, ReportPreset,
    SeriesGranularity,
};
use crate::directory::{
    fetch_activity_categories, fetch_departments, fetch_member_directory, fetch_programs,
    fetch_role_directory, DirectoryStore, MemberListing,
};
use crate::error::AppError;
use crate::functions::{admin_organization, handle_admin_list_users, handle_seed_test_users};
use crate::labels::{LabelCache, LabelSource, LabelStore};
use crate::models::{
    ActivityCategory, Department, Organization, OrganizationLabels, Program, TimesheetEntry,
    UserRole, ALL_ENTRY_STATUSES,
};
use crate::navigation::{navigation_for, NavItem, StatusBadge};
use crate::reporting::{build_report, report_to_csv, ReportSummary};
use crate::roles::Role;
use crate::timesheets::{
    can_oversee, create_entry, review_entry, settings_for, submit_entry, CreateEntryRequest,
    ReviewRequest, TimesheetStore,
};
use crate::validation::{validate_organization_input, OrganizationInput};

/// Everything the server needs from the backend.
pub trait ClockwiseStore: AuthStore + DirectoryStore + LabelStore + TimesheetStore {}

impl<T> ClockwiseStore for T where T: AuthStore + DirectoryStore + LabelStore + TimesheetStore {}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClockwiseStore>,
    pub labels: LabelCache,
}

pub fn build_router(state: AppState) -> Router {
    let functions_routes = Router::new()
        .route(
            "/admin-list-users",
            get(handle_admin_list_users).post(handle_admin_list_users),
        )
        .route("/seed-test-users", post(handle_seed_test_users));

    let api_routes = Router::new()
        .route("/me", get(handle_me))
        .route("/directory/members", get(handle_member_directory))
        .route("/directory/{role}", get(handle_role_directory))
        .route("/departments", get(handle_departments))
        .route("/departments/{id}/programs", get(handle_department_programs))
        .route("/activity-categories", get(handle_activity_categories))
        .route("/timesheets", post(handle_create_entry))
        .route("/timesheets/{id}/submit", post(handle_submit_entry))
        .route("/timesheets/{id}/review", post(handle_review_entry))
        .route("/reports/summary", get(handle_report_summary))
        .route("/reports/export", get(handle_report_export))
        .route("/organization", put(handle_update_organization))
        .route("/organization/labels", put(handle_update_labels));

    Router::new()
        .route("/health", get(health_check))
        .nest("/functions/v1", functions_routes)
        .nest("/api", api_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn require_role(caller: &Caller) -> Result<&UserRole, AppError> {
    caller
        .role
        .as_ref()
        .ok_or_else(|| AppError::Forbidden("No role assigned to this account".to_string()))
}

fn require_organization(caller: &Caller) -> Result<&str, AppError> {
    caller.organization_id().ok_or_else(|| {
        AppError::BadRequest("Account is not assigned to an organization".to_string())
    })
}

// --- Profile & navigation ---

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<&'static str>,
    pub role_label: Option<String>,
    pub organization_id: Option<String>,
    pub department_id: Option<String>,
    pub label_source: LabelSource,
    pub navigation: Vec<NavItem>,
    pub status_badges: Vec<StatusBadge>,
}

async fn handle_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    let labels = state
        .labels
        .resolver(&*state.store, caller.organization_id())
        .await;
    let role = caller.role_kind();

    Ok(Json(MeResponse {
        user_id: caller.id().to_string(),
        email: caller.user.email.clone(),
        role: role.map(|r| r.key()),
        role_label: role.map(|r| labels.role_label(r).to_string()),
        organization_id: caller.organization_id().map(String::from),
        department_id: caller.department_id().map(String::from),
        label_source: labels.source(),
        navigation: role.map(|r| navigation_for(r, &labels)).unwrap_or_default(),
        status_badges: ALL_ENTRY_STATUSES
            .into_iter()
            .map(StatusBadge::for_status)
            .collect(),
    }))
}

// --- Directory ---

async fn handle_member_directory(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MemberListing>>, AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    if !require_role(&caller)?.role.is_manager_class() {
        return Err(AppError::Forbidden(
            "Member directory is limited to managers".to_string(),
        ));
    }
    let organization_id = require_organization(&caller)?;
    Ok(Json(
        fetch_member_directory(&*state.store, organization_id).await,
    ))
}

/// Accepts the stored code or the display key (`hod` and `manager` alike).
async fn handle_role_directory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(role): Path<String>,
) -> Result<Json<Vec<MemberListing>>, AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    if !require_role(&caller)?.role.is_manager_class() {
        return Err(AppError::Forbidden(
            "Directories are limited to managers".to_string(),
        ));
    }
    let organization_id = require_organization(&caller)?;
    let role = Role::parse(&role)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown role '{}'", role)))?;
    Ok(Json(
        fetch_role_directory(&*state.store, organization_id, role).await,
    ))
}

async fn handle_departments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Department>>, AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    let organization_id = require_organization(&caller)?;
    Ok(Json(fetch_departments(&*state.store, organization_id).await))
}

/// Another organization's department answers 404, same as a missing one.
async fn handle_department_programs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(department_id): Path<String>,
) -> Result<Json<Vec<Program>>, AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    let organization_id = require_organization(&caller)?;
    let department = state
        .store
        .department(&department_id)
        .await?
        .filter(|d| d.organization_id.as_deref() == Some(organization_id))
        .ok_or_else(|| AppError::NotFound(format!("Department {} not found", department_id)))?;
    Ok(Json(fetch_programs(&*state.store, &department.id).await))
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub department_id: Option<String>,
}

async fn handle_activity_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<ActivityCategory>>, AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    let organization_id = require_organization(&caller)?;
    let department_id = query.department_id.as_deref().or(caller.department_id());
    Ok(Json(
        fetch_activity_categories(&*state.store, organization_id, department_id).await,
    ))
}

// --- Timesheets ---

async fn handle_create_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateEntryRequest>,
) -> Result<(AxumStatusCode, Json<TimesheetEntry>), AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    let entry = create_entry(&*state.store, caller.id(), &request).await?;
    Ok((AxumStatusCode::CREATED, Json(entry)))
}

async fn handle_submit_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(entry_id): Path<String>,
) -> Result<Json<TimesheetEntry>, AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    Ok(Json(
        submit_entry(&*state.store, caller.id(), &entry_id).await?,
    ))
}

async fn handle_review_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(entry_id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<TimesheetEntry>, AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    let reviewer = require_role(&caller)?;
    let entry = state
        .store
        .get_entry(&entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Timesheet entry {} not found", entry_id)))?;
    let owner = state.store.role_for_user(&entry.user_id).await?;
    let updated = review_entry(&*state.store, reviewer, &entry, owner.as_ref(), &request).await?;
    Ok(Json(updated))
}

// --- Reports ---

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub user_id: Option<String>,
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub granularity: Option<String>,
}

/// Bounds come as `YYYY-MM-DD` or as typed in the UI, `DD/MM/YYYY`.
fn parse_bound(value: Option<&str>, name: &str) -> Result<Option<NaiveDate>, AppError> {
    value
        .map(|v| {
            parse_iso_date(v).or_else(|| parse_display_date(v)).ok_or_else(|| {
                AppError::BadRequest(format!("{} must be YYYY-MM-DD or DD/MM/YYYY", name))
            })
        })
        .transpose()
}

/// Report presets first, then the dashboard periods (`today`). Period
/// defaults to the current week, granularity to daily.
pub fn resolve_report_range(
    query: &ReportQuery,
    today: NaiveDate,
) -> Result<(DateRange, SeriesGranularity), AppError> {
    let from = parse_bound(query.from.as_deref(), "from")?;
    let to = parse_bound(query.to.as_deref(), "to")?;
    let period = query.period.as_deref().unwrap_or("week");

    let range = match ReportPreset::parse(period, from, to) {
        Some(preset) => preset.range(today),
        None => DatePeriod::parse(period, from, to)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown period '{}'", period)))?
            .range(today),
    };
    let granularity = match query.granularity.as_deref() {
        None => SeriesGranularity::Daily,
        Some(key) => SeriesGranularity::parse(key)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown granularity '{}'", key)))?,
    };
    Ok((range, granularity))
}

/// The caller's own id unless they asked for someone they oversee.
async fn report_subject(
    state: &AppState,
    caller: &Caller,
    requested: Option<&str>,
) -> Result<String, AppError> {
    let target = match requested {
        Some(id) if id != caller.id() => id,
        _ => return Ok(caller.id().to_string()),
    };
    let viewer = require_role(caller)?;
    let owner = state
        .store
        .role_for_user(target)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", target)))?;
    if !can_oversee(viewer, &owner) {
        return Err(AppError::Forbidden(
            "Not allowed to view this user's reports".to_string(),
        ));
    }
    Ok(target.to_string())
}

async fn load_report(
    state: &AppState,
    headers: &HeaderMap,
    query: &ReportQuery,
) -> Result<(ReportSummary, Vec<TimesheetEntry>), AppError> {
    let caller = authenticate(&*state.store, headers).await?;
    let (range, granularity) = resolve_report_range(query, today())?;
    let subject = report_subject(state, &caller, query.user_id.as_deref()).await?;

    let entries = state
        .store
        .entries_for_user(&subject, range.start_date(), range.end_date())
        .await?;
    let settings = settings_for(&*state.store, &subject).await?;
    let report = build_report(&entries, range, granularity, &settings)?;
    info!(
        "Report for {} from {} to {}: {} entries",
        subject,
        range.start_date(),
        range.end_date(),
        report.entry_count
    );
    Ok((report, entries))
}

async fn handle_report_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportSummary>, AppError> {
    let (report, _) = load_report(&state, &headers, &query).await?;
    Ok(Json(report))
}

async fn handle_report_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    let (report, entries) = load_report(&state, &headers, &query).await?;
    let csv = report_to_csv(&report, &entries)?;
    let filename = format!(
        "timesheet-report-{}-{}.csv",
        report.range.start_date(),
        report.range.end_date()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response())
}

// --- Organization settings ---

async fn handle_update_organization(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<OrganizationInput>,
) -> Result<Json<Organization>, AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    let organization_id = admin_organization(&caller, "edit the organization")?;
    let input = OrganizationInput {
        name: input.name.trim().to_string(),
        code: input.code.trim().to_string(),
    };
    validate_organization_input(&input)?;
    let organization = state
        .store
        .update_organization(organization_id, &input)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Organization {} not found", organization_id))
        })?;
    info!(
        "Organization {} renamed to {} ({})",
        organization.id, organization.name, organization.code
    );
    Ok(Json(organization))
}

/// Replaces the terminology overrides and drops the cached copy so the next
/// request sees them.
async fn handle_update_labels(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<OrganizationLabels>,
) -> Result<Json<OrganizationLabels>, AppError> {
    let caller = authenticate(&*state.store, &headers).await?;
    let organization_id = admin_organization(&caller, "edit terminology")?;
    let labels = OrganizationLabels {
        organization_id: organization_id.to_string(),
        ..request
    };
    let saved = state.store.save_organization_labels(&labels).await?;
    state.labels.invalidate(organization_id).await;
    Ok(Json(saved))
}
