// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{AdminUser, AuthResponse, LoginUserPayload, RegisterUserPayload},
};

// Handler de registro
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Autenticação",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail já cadastrado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let token = app_state
        .auth_service
        .register_user(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token })))
}

// Handler de login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Autenticação",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login efetuado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<LoginUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let token = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(AuthResponse { token }))
}

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Autenticação",
    responses(
        (status = 200, description = "Usuário logado com papel e permissões", body = AdminUser),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<AdminUser> {
    Json(user)
}
