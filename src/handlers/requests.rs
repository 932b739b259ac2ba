// src/handlers/requests.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::begin_audited,
        error::{ApiError, AppError},
        pagination::{Page, PageParams},
    },
    config::AppState,
    handlers::{file_response, read_upload, UploadForm},
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermRequestsCreate, PermRequestsRead, PermRequestsUpdate, RequirePermission},
    },
    models::{
        permissions::SystemModule,
        requests::{
            AddCommentPayload, CreateRequestPayload, ForwardRequestPayload, RequestAttachment,
            RequestComment, RequestDetail, RequestFilter, RequestListItem, UpdateStatusPayload,
            REQUEST_FIELDS,
        },
    },
};

inventory::submit! { SystemModule::new("requests", "Solicitações") }

// GET /api/requests
#[utoipa::path(
    get,
    path = "/api/requests",
    tag = "Solicitações",
    params(RequestFilter, PageParams),
    responses(
        (status = 200, description = "Solicitações filtradas e paginadas", body = Page<RequestListItem>),
        (status = 400, description = "Campo de ordenação inválido"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_requests(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermRequestsRead>,
    Query(filter): Query<RequestFilter>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .resolve(&REQUEST_FIELDS)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .request_service
        .list(&filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// POST /api/requests
#[utoipa::path(
    post,
    path = "/api/requests",
    tag = "Solicitações",
    request_body = CreateRequestPayload,
    responses(
        (status = 201, description = "Solicitação aberta", body = RequestListItem),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_request(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermRequestsCreate>,
    Json(payload): Json<CreateRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .request_service
        .create(&mut *tx, &user.0, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(RequestListItem::from(request))))
}

// GET /api/requests/{id}
#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    tag = "Solicitações",
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    responses(
        (status = 200, description = "Detalhe com comentários, anexos, histórico e ações disponíveis", body = RequestDetail),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_request(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermRequestsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .request_service
        .get_detail(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detail))
}

// GET /api/requests/protocol/{protocol}
#[utoipa::path(
    get,
    path = "/api/requests/protocol/{protocol}",
    tag = "Solicitações",
    params(("protocol" = String, Path, description = "Número do protocolo")),
    responses(
        (status = 200, description = "Solicitação do protocolo", body = RequestListItem),
        (status = 404, description = "Protocolo inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_by_protocol(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermRequestsRead>,
    Path(protocol): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let request = app_state
        .request_service
        .find_by_protocol(protocol.trim())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(RequestListItem::from(request)))
}

// PATCH /api/requests/{id}/status
#[utoipa::path(
    patch,
    path = "/api/requests/{id}/status",
    tag = "Solicitações",
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = RequestListItem),
        (status = 422, description = "Transição não permitida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermRequestsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .request_service
        .update_status(&mut *tx, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(RequestListItem::from(request)))
}

// POST /api/requests/{id}/forward
#[utoipa::path(
    post,
    path = "/api/requests/{id}/forward",
    tag = "Solicitações",
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    request_body = ForwardRequestPayload,
    responses(
        (status = 200, description = "Encaminhada para outro departamento", body = RequestListItem),
        (status = 422, description = "Solicitação concluída ou cancelada")
    ),
    security(("api_jwt" = []))
)]
pub async fn forward_request(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermRequestsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ForwardRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .request_service
        .forward(&mut *tx, &user.0, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(RequestListItem::from(request)))
}

// POST /api/requests/{id}/comments
#[utoipa::path(
    post,
    path = "/api/requests/{id}/comments",
    tag = "Solicitações",
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    request_body = AddCommentPayload,
    responses(
        (status = 201, description = "Comentário adicionado", body = RequestComment)
    ),
    security(("api_jwt" = []))
)]
pub async fn add_comment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermRequestsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddCommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let comment = app_state
        .request_service
        .add_comment(&mut *tx, &user.0, id, &payload.text)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(comment)))
}

// POST /api/requests/{id}/attachments
#[utoipa::path(
    post,
    path = "/api/requests/{id}/attachments",
    tag = "Solicitações",
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Anexo gravado", body = RequestAttachment),
        (status = 400, description = "Arquivo ausente, vazio ou grande demais")
    ),
    security(("api_jwt" = []))
)]
pub async fn upload_attachment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermRequestsUpdate>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (file, _) = read_upload(multipart)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let attachment = app_state
        .request_service
        .upload_attachment(tx, id, file)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(attachment)))
}

// GET /api/requests/{id}/attachments/{attachment_id}
#[utoipa::path(
    get,
    path = "/api/requests/{id}/attachments/{attachment_id}",
    tag = "Solicitações",
    params(
        ("id" = Uuid, Path, description = "ID da solicitação"),
        ("attachment_id" = Uuid, Path, description = "ID do anexo")
    ),
    responses(
        (status = 200, description = "Conteúdo do arquivo", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 404, description = "Anexo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn download_attachment(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermRequestsRead>,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, ApiError> {
    let (attachment, bytes) = app_state
        .request_service
        .download_attachment(id, attachment_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let content_type = attachment
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");
    Ok(file_response(bytes, content_type, &attachment.file_name))
}

// GET /api/requests/{id}/receipt
#[utoipa::path(
    get,
    path = "/api/requests/{id}/receipt",
    tag = "Solicitações",
    params(("id" = Uuid, Path, description = "ID da solicitação")),
    responses(
        (status = 200, description = "Comprovante do protocolo em PDF", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_receipt(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermRequestsRead>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let pdf_bytes = app_state
        .document_service
        .generate_request_receipt(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // Abre no navegador em vez de forçar o download
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"protocolo_{}.pdf\"", id),
        ),
    ];

    Ok((headers, pdf_bytes).into_response())
}
