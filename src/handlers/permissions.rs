// src/handlers/permissions.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::begin_audited,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{
            PermPermissionsCreate, PermPermissionsDelete, PermPermissionsRead,
            PermPermissionsUpdate, RequirePermission,
        },
    },
    models::{
        auth::AdminUser,
        permissions::{
            system_modules, ApplyTemplatePayload, ReplacePermissionsPayload, RoleTemplate,
            RoleTemplatePayload, SetPermissionFlagPayload, SystemModule, UpdateAdminUserPayload,
        },
    },
};

inventory::submit! { SystemModule::new("permissions", "Permissões") }

// GET /api/permissions/modules
#[utoipa::path(
    get,
    path = "/api/permissions/modules",
    tag = "Permissões",
    responses(
        (status = 200, description = "Módulos registrados no sistema", body = Vec<SystemModule>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_modules(_guard: RequirePermission<PermPermissionsRead>) -> impl IntoResponse {
    Json(system_modules())
}

// GET /api/permissions/users
#[utoipa::path(
    get,
    path = "/api/permissions/users",
    tag = "Permissões",
    responses(
        (status = 200, description = "Usuários administrativos com papel e permissões", body = Vec<AdminUser>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermPermissionsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let users = app_state
        .permission_service
        .list_users(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(users))
}

// GET /api/permissions/users/{id}
#[utoipa::path(
    get,
    path = "/api/permissions/users/{id}",
    tag = "Permissões",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Usuário", body = AdminUser),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermPermissionsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = app_state
        .permission_service
        .get_user(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(user))
}

// PUT /api/permissions/users/{id}
#[utoipa::path(
    put,
    path = "/api/permissions/users/{id}",
    tag = "Permissões",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    request_body = UpdateAdminUserPayload,
    responses(
        (status = 200, description = "Usuário atualizado", body = AdminUser),
        (status = 403, description = "Apenas o prefeito promove a prefeito")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermPermissionsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAdminUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .permission_service
        .update_user(&mut *tx, &user.0, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// PATCH /api/permissions/users/{id}/flags
#[utoipa::path(
    patch,
    path = "/api/permissions/users/{id}/flags",
    tag = "Permissões",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    request_body = SetPermissionFlagPayload,
    responses(
        (status = 200, description = "Flag alterada; as demais ficam como estavam", body = AdminUser),
        (status = 400, description = "Módulo desconhecido")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_permission_flag(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermPermissionsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetPermissionFlagPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .permission_service
        .set_permission_flag(&mut *tx, id, &payload.module_id, payload.action, payload.value)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// PUT /api/permissions/users/{id}/permissions
#[utoipa::path(
    put,
    path = "/api/permissions/users/{id}/permissions",
    tag = "Permissões",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    request_body = ReplacePermissionsPayload,
    responses(
        (status = 200, description = "Permissões substituídas", body = AdminUser),
        (status = 400, description = "Módulo desconhecido")
    ),
    security(("api_jwt" = []))
)]
pub async fn replace_permissions(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermPermissionsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplacePermissionsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .permission_service
        .replace_permissions(&mut *tx, id, &payload.permissions)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// POST /api/permissions/users/{id}/apply-template
#[utoipa::path(
    post,
    path = "/api/permissions/users/{id}/apply-template",
    tag = "Permissões",
    params(("id" = Uuid, Path, description = "ID do usuário")),
    request_body = ApplyTemplatePayload,
    responses(
        (status = 200, description = "Permissões do modelo copiadas para o usuário", body = AdminUser),
        (status = 404, description = "Modelo ou usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn apply_template(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermPermissionsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApplyTemplatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .permission_service
        .apply_template(&mut *tx, id, payload.template_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// GET /api/permissions/templates
#[utoipa::path(
    get,
    path = "/api/permissions/templates",
    tag = "Permissões",
    responses(
        (status = 200, description = "Modelos de cargo", body = Vec<RoleTemplate>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_templates(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermPermissionsRead>,
) -> Result<impl IntoResponse, ApiError> {
    let templates = app_state
        .permission_service
        .list_templates()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(templates))
}

// POST /api/permissions/templates
#[utoipa::path(
    post,
    path = "/api/permissions/templates",
    tag = "Permissões",
    request_body = RoleTemplatePayload,
    responses(
        (status = 201, description = "Modelo criado", body = RoleTemplate),
        (status = 409, description = "Nome já utilizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_template(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermPermissionsCreate>,
    Json(payload): Json<RoleTemplatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let template = app_state
        .permission_service
        .create_template(&mut *tx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(template)))
}

// PUT /api/permissions/templates/{id}
#[utoipa::path(
    put,
    path = "/api/permissions/templates/{id}",
    tag = "Permissões",
    params(("id" = Uuid, Path, description = "ID do modelo")),
    request_body = RoleTemplatePayload,
    responses(
        (status = 200, description = "Modelo atualizado", body = RoleTemplate),
        (status = 404, description = "Modelo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_template(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermPermissionsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleTemplatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let template = app_state
        .permission_service
        .update_template(&mut *tx, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(template))
}

// DELETE /api/permissions/templates/{id}
#[utoipa::path(
    delete,
    path = "/api/permissions/templates/{id}",
    tag = "Permissões",
    params(("id" = Uuid, Path, description = "ID do modelo")),
    responses(
        (status = 204, description = "Modelo removido"),
        (status = 404, description = "Modelo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_template(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermPermissionsDelete>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .permission_service
        .delete_template(&mut *tx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
