// src/handlers/chat.rs

use axum::{
    extract::{Path, Query, State},
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
        pagination::{Page, PageParams},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermChatCreate, PermChatRead, PermChatUpdate, RequirePermission},
    },
    models::{
        chat::{
            AddTagPayload, ChatViewer, Conversation, ConversationFilter, CreateConversationPayload,
            LinkProtocolPayload, Message, MessagesQuery, SendMessagePayload, CONVERSATION_FIELDS,
        },
        permissions::SystemModule,
    },
};

inventory::submit! { SystemModule::new("chat", "Chat") }

// GET /api/chat/conversations
#[utoipa::path(
    get,
    path = "/api/chat/conversations",
    tag = "Chat",
    params(ConversationFilter, PageParams),
    responses(
        (status = 200, description = "Conversas visíveis para quem consulta", body = Page<Conversation>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_conversations(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermChatRead>,
    Query(filter): Query<ConversationFilter>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .resolve(&CONVERSATION_FIELDS)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let viewer = match filter.participant_id {
        Some(participant) => ChatViewer::Citizen(participant),
        None => ChatViewer::Admin,
    };

    let result = app_state
        .chat_service
        .list_conversations(viewer, &filter, &page)
        .await;

    Ok(Json(result))
}

// POST /api/chat/conversations
#[utoipa::path(
    post,
    path = "/api/chat/conversations",
    tag = "Chat",
    request_body = CreateConversationPayload,
    responses(
        (status = 201, description = "Conversa criada", body = Conversation),
        (status = 200, description = "Conversa aberta existente reaproveitada", body = Conversation)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_conversation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermChatCreate>,
    Json(payload): Json<CreateConversationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let (conversation, created) = app_state
        .chat_service
        .create_conversation(tx, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(conversation)))
}

// GET /api/chat/conversations/active
#[utoipa::path(
    get,
    path = "/api/chat/conversations/active",
    tag = "Chat",
    responses(
        (status = 200, description = "Conversa selecionada pelo usuário (null se nenhuma)", body = Conversation)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_active_conversation(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermChatRead>,
) -> Json<Option<Conversation>> {
    Json(app_state.chat_service.active_conversation(user.0.id).await)
}

// GET /api/chat/conversations/{id}
#[utoipa::path(
    get,
    path = "/api/chat/conversations/{id}",
    tag = "Chat",
    params(("id" = Uuid, Path, description = "ID da conversa")),
    responses(
        (status = 200, description = "Conversa", body = Conversation),
        (status = 404, description = "Conversa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_conversation(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermChatRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = app_state
        .chat_service
        .get_conversation(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(conversation))
}

// POST /api/chat/conversations/{id}/select
#[utoipa::path(
    post,
    path = "/api/chat/conversations/{id}/select",
    tag = "Chat",
    params(("id" = Uuid, Path, description = "ID da conversa")),
    responses(
        (status = 200, description = "Conversa ativa; contador de não lidas zerado", body = Conversation),
        (status = 404, description = "Conversa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn select_conversation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermChatRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let conversation = app_state
        .chat_service
        .set_active_conversation(tx, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(conversation))
}

// GET /api/chat/conversations/{id}/messages
#[utoipa::path(
    get,
    path = "/api/chat/conversations/{id}/messages",
    tag = "Chat",
    params(("id" = Uuid, Path, description = "ID da conversa"), MessagesQuery),
    responses(
        (status = 200, description = "Mensagens em ordem cronológica", body = Vec<Message>),
        (status = 404, description = "Conversa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_messages(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermChatRead>,
    Path(id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // Com `before` o cliente está rolando para o topo: busca a página anterior
    let messages = if query.before.is_some() || query.limit.is_some() {
        app_state
            .chat_service
            .load_more_messages(id, query.cursor(), query.limit)
            .await
    } else {
        app_state.chat_service.messages(id).await
    }
    .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(messages))
}

// POST /api/chat/conversations/{id}/messages
#[utoipa::path(
    post,
    path = "/api/chat/conversations/{id}/messages",
    tag = "Chat",
    params(("id" = Uuid, Path, description = "ID da conversa")),
    request_body = SendMessagePayload,
    responses(
        (status = 201, description = "Mensagem enviada", body = Message),
        (status = 422, description = "Conversa encerrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_message(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermChatUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let message = app_state
        .chat_service
        .send_message(tx, &user.0, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(message)))
}

// POST /api/chat/conversations/{id}/close
#[utoipa::path(
    post,
    path = "/api/chat/conversations/{id}/close",
    tag = "Chat",
    params(("id" = Uuid, Path, description = "ID da conversa")),
    responses(
        (status = 200, description = "Conversa encerrada", body = Conversation)
    ),
    security(("api_jwt" = []))
)]
pub async fn close_conversation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermChatUpdate>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let conversation = app_state
        .chat_service
        .close_conversation(tx, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(conversation))
}

// POST /api/chat/conversations/{id}/tags
#[utoipa::path(
    post,
    path = "/api/chat/conversations/{id}/tags",
    tag = "Chat",
    params(("id" = Uuid, Path, description = "ID da conversa")),
    request_body = AddTagPayload,
    responses(
        (status = 200, description = "Etiqueta aplicada", body = Conversation)
    ),
    security(("api_jwt" = []))
)]
pub async fn add_tag(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermChatUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddTagPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let conversation = app_state
        .chat_service
        .add_tag(tx, id, payload.tag.trim())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(conversation))
}

// POST /api/chat/conversations/{id}/protocol
#[utoipa::path(
    post,
    path = "/api/chat/conversations/{id}/protocol",
    tag = "Chat",
    params(("id" = Uuid, Path, description = "ID da conversa")),
    request_body = LinkProtocolPayload,
    responses(
        (status = 200, description = "Protocolo vinculado", body = Conversation),
        (status = 404, description = "Conversa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn link_protocol(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermChatUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LinkProtocolPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let conversation = app_state
        .chat_service
        .link_protocol(tx, id, payload.protocol_number.trim())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(conversation))
}
