use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{
        dto::{CreateUserRequest, LoginRequest, LoginResponse, RegisterRequest},
        errors::AuthError,
        extractors::AuthUser,
    },
    state::AppState,
    users::PublicUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth", post(create).get(find_all))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/check-token", get(check_token))
        .route("/auth/:id", get(find_user_by_id))
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AuthError> {
    let user = state.auth.create(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AuthError> {
    let res = state.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    Ok(Json(state.auth.login(payload).await?))
}

#[instrument(skip(state, _caller))]
pub async fn find_all(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<PublicUser>>, AuthError> {
    Ok(Json(state.auth.find_all().await?))
}

#[instrument(skip(state, _caller))]
pub async fn find_user_by_id(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, AuthError> {
    Ok(Json(state.auth.find_user_by_id(id).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn check_token(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<LoginResponse>, AuthError> {
    Ok(Json(state.auth.check_token(user)?))
}
