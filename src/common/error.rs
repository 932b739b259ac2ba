// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::field_map::to_camel_case;
use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Erros de domínio. A tradução para o usuário final acontece em `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Permissão negada: {0}")]
    Forbidden(String),

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Encaminhamento não permitido no status {0}")]
    ForwardNotAllowed(String),

    #[error("Conversa encerrada: {0}")]
    ConversationClosed(uuid::Uuid),

    #[error("Módulo desconhecido: {0}")]
    UnknownModule(String),

    #[error("Módulo repetido na lista de permissões: {0}")]
    DuplicateModule(String),

    #[error("Campo de ordenação inválido: {0}")]
    InvalidSortField(String),

    #[error("Arquivo inválido: {0}")]
    InvalidUpload(String),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    #[error("Erro de armazenamento: {0}")]
    StorageError(#[from] std::io::Error),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` carrega o contexto de qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Erro já traduzido, pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::UnknownModule(_)
            | AppError::DuplicateModule(_)
            | AppError::InvalidSortField(_)
            | AppError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists | AppError::UniqueConstraintViolation(_) => {
                StatusCode::CONFLICT
            }
            AppError::InvalidStatusTransition { .. }
            | AppError::ForwardNotAllowed(_)
            | AppError::ConversationClosed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Chave de tradução no `I18nStore`.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "error.validation",
            AppError::EmailAlreadyExists => "error.email_exists",
            AppError::InvalidCredentials => "error.invalid_credentials",
            AppError::InvalidToken => "error.invalid_token",
            AppError::UserNotFound => "error.user_not_found",
            AppError::Forbidden(_) => "error.forbidden",
            AppError::ResourceNotFound(_) => "error.not_found",
            AppError::UniqueConstraintViolation(_) => "error.conflict",
            AppError::InvalidStatusTransition { .. } => "error.invalid_transition",
            AppError::ForwardNotAllowed(_) => "error.forward_not_allowed",
            AppError::ConversationClosed(_) => "error.conversation_closed",
            AppError::UnknownModule(_) => "error.unknown_module",
            AppError::DuplicateModule(_) => "error.duplicate_module",
            AppError::InvalidSortField(_) => "error.invalid_sort_field",
            AppError::InvalidUpload(_) => "error.invalid_upload",
            _ => "error.internal",
        }
    }

    fn args(&self) -> Vec<String> {
        match self {
            AppError::Forbidden(slug) => vec![slug.clone()],
            AppError::ResourceNotFound(what) => vec![what.clone()],
            AppError::UniqueConstraintViolation(what) => vec![what.clone()],
            AppError::InvalidStatusTransition { from, to } => vec![from.clone(), to.clone()],
            AppError::ForwardNotAllowed(status) => vec![status.clone()],
            AppError::ConversationClosed(id) => vec![id.to_string()],
            AppError::UnknownModule(module) | AppError::DuplicateModule(module) => {
                vec![module.clone()]
            }
            AppError::InvalidSortField(field) => vec![field.clone()],
            AppError::InvalidUpload(reason) => vec![reason.clone()],
            _ => vec![],
        }
    }

    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let args = self.args();
        let error = store.translate(&locale.0, self.code(), &args);

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            let code = e.message.as_deref().unwrap_or(e.code.as_ref());
                            store
                                .lookup(&locale.0, &format!("validation.{}", code))
                                .unwrap_or(code)
                                .to_string()
                        })
                        .collect();
                    details.insert(to_camel_case(&field), messages);
                }
                Some(json!(details))
            }
            _ => None,
        };

        ApiError { status, error, details }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Usado pelos middlewares, que não têm acesso ao idioma da requisição.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::fallback())
            .into_response()
    }
}

/// Traduz violação de unicidade do Postgres para `UniqueConstraintViolation`.
pub fn map_unique_violation(e: sqlx::Error, what: impl Into<String>) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(what.into());
        }
    }
    e.into()
}

/// Como `map_unique_violation`, e também traduz chave estrangeira inexistente
/// (ex: matrícula de aluno que não existe) para `ResourceNotFound`.
pub fn map_reference_violation(
    e: sqlx::Error,
    duplicate: impl Into<String>,
    missing: impl Into<String>,
) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_foreign_key_violation() {
            return AppError::ResourceNotFound(missing.into());
        }
    }
    map_unique_violation(e, duplicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 10, message = "min_10_chars"))]
        description: String,
    }

    #[test]
    fn validation_errors_carry_translated_field_details() {
        let store = I18nStore::new();
        let err = Payload { description: "curta".into() }.validate().unwrap_err();

        let api = AppError::ValidationError(err).to_api_error(&Locale("pt".into()), &store);

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("details");
        let messages = details["description"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].as_str().unwrap().contains("10"));
    }

    #[test]
    fn forbidden_transition_maps_to_unprocessable_entity() {
        let store = I18nStore::new();
        let api = AppError::InvalidStatusTransition {
            from: "completed".into(),
            to: "open".into(),
        }
        .to_api_error(&Locale("en".into()), &store);

        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(api.error.contains("completed"));
        assert!(api.error.contains("open"));
        assert!(api.details.is_none());
    }

    #[test]
    fn unknown_language_falls_back_to_portuguese() {
        let store = I18nStore::new();
        let api = AppError::UserNotFound.to_api_error(&Locale("de".into()), &store);
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.error, "Usuário não encontrado.");
    }
}
