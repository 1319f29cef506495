//! Reimbursement service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{
    error::{ErsError, ErsResult},
    lifecycle::{NewEmployeeForm, ProfileForm},
    middleware::auth_middleware,
    models::{
        Identity, ReimbursementRequest, RequestId, RequestResponse, StatusFilter, User, UserId,
    },
    state::AppState,
};

/// Request for user login
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "userID", alias = "userId")]
    pub user_id: UserId,
    pub password: String,
}

/// Response for user login
#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: User,
}

/// Body of a new reimbursement request
#[derive(Deserialize)]
pub struct SubmitRequest {
    pub amount: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// A manager's decision on a request
#[derive(Deserialize)]
pub struct ResolveRequest {
    pub approved: bool,
}

/// `?status=all|pending|resolved`, defaulting to all
#[derive(Deserialize, Default)]
pub struct StatusQuery {
    #[serde(default)]
    pub status: StatusFilter,
}

/// Create the router for the reimbursement service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/requests", post(submit_request).get(list_own_requests))
        .route("/requests/:id", get(get_request))
        .route("/employees", get(list_employees).post(add_employee))
        .route("/employees/:id", get(get_employee))
        .route("/employees/:id/requests", get(list_employee_requests))
        .route("/manage/requests", get(list_all_requests))
        .route("/manage/requests/:id", put(resolve_request))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(login))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "reimbursement-service"
    }))
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ErsResult<impl IntoResponse> {
    let user = state
        .users
        .authenticate(payload.user_id, &payload.password)
        .await?
        .ok_or(ErsError::Unauthorized)?;

    let token = state.jwt_service.generate_token(&user.identity())?;

    info!("User {} logged in as {}", user.user_id, user.role());

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_service.token_expiry(),
        user,
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ErsResult<impl IntoResponse> {
    let user = state
        .users
        .get_profile(&identity, identity.user_id)
        .await?;
    Ok(Json(user))
}

/// Replace the caller's profile and return the stored result
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(form): Json<ProfileForm>,
) -> ErsResult<impl IntoResponse> {
    if !state.users.update_profile(&identity, form).await? {
        return Err(ErsError::NotFound(format!(
            "User {} not found",
            identity.user_id
        )));
    }

    let user = state
        .users
        .get_profile(&identity, identity.user_id)
        .await?;
    Ok(Json(user))
}

pub async fn submit_request(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<SubmitRequest>,
) -> ErsResult<impl IntoResponse> {
    let request_id = state
        .requests
        .submit_new_request(
            &identity,
            &payload.amount,
            &payload.category,
            &payload.description,
        )
        .await?;

    let request = state.requests.view_request(&identity, request_id).await?;
    Ok((StatusCode::CREATED, Json(RequestResponse::from(request))))
}

pub async fn list_own_requests(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<StatusQuery>,
) -> ErsResult<impl IntoResponse> {
    let requests = state
        .requests
        .list_requests(&identity, identity.user_id, query.status)
        .await?;
    Ok(Json(into_responses(requests)))
}

pub async fn get_request(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<RequestId>,
) -> ErsResult<impl IntoResponse> {
    let request = state.requests.view_request(&identity, id).await?;
    Ok(Json(RequestResponse::from(request)))
}

pub async fn list_employees(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ErsResult<impl IntoResponse> {
    let employees = state.users.list_all_employees(&identity).await?;
    Ok(Json(employees))
}

pub async fn add_employee(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(form): Json<NewEmployeeForm>,
) -> ErsResult<impl IntoResponse> {
    let user_id = state.users.add_new_employee(&identity, form).await?;
    Ok((StatusCode::CREATED, Json(json!({ "userID": user_id }))))
}

pub async fn get_employee(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<UserId>,
) -> ErsResult<impl IntoResponse> {
    let employee = state.users.view_employee(&identity, id).await?;
    Ok(Json(employee))
}

pub async fn list_employee_requests(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<UserId>,
    Query(query): Query<StatusQuery>,
) -> ErsResult<impl IntoResponse> {
    identity.require_manager()?;

    let requests = state
        .requests
        .list_requests(&identity, id, query.status)
        .await?;
    Ok(Json(into_responses(requests)))
}

pub async fn list_all_requests(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<StatusQuery>,
) -> ErsResult<impl IntoResponse> {
    let requests = state
        .requests
        .list_all_requests(&identity, query.status)
        .await?;
    Ok(Json(into_responses(requests)))
}

/// Resolve a request and return it in its final state
pub async fn resolve_request(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<RequestId>,
    Json(payload): Json<ResolveRequest>,
) -> ErsResult<impl IntoResponse> {
    if !state
        .requests
        .resolve_request(&identity, id, payload.approved)
        .await?
    {
        return Err(ErsError::AlreadyResolved);
    }

    let request = state.requests.view_request(&identity, id).await?;
    Ok(Json(RequestResponse::from(request)))
}

fn into_responses(requests: Vec<ReimbursementRequest>) -> Vec<RequestResponse> {
    requests.into_iter().map(RequestResponse::from).collect()
}
