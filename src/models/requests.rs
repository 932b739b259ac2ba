// src/models/requests.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::common::field_map::FieldMap;

pub const REQUEST_FIELDS: FieldMap = FieldMap::new(
    "unified_requests",
    &[
        ("protocolNumber", "protocol_number"),
        ("title", "title"),
        ("targetDepartment", "target_department"),
        ("priority", "priority"),
        ("status", "status"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ],
    "created_at",
);

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "request_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "requester_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequesterType {
    Citizen,
    Employee,
    Department,
}

/// Ações que a tela de detalhe pode oferecer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestAction {
    Start,
    Complete,
    Cancel,
    Forward,
    Comment,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestStatus::Open => "Aberta",
            RequestStatus::InProgress => "Em andamento",
            RequestStatus::Completed => "Concluída",
            RequestStatus::Cancelled => "Cancelada",
        }
    }

    /// `open -> in_progress -> completed` ou `open -> cancelled`.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Open, RequestStatus::InProgress)
                | (RequestStatus::InProgress, RequestStatus::Completed)
                | (RequestStatus::Open, RequestStatus::Cancelled)
        )
    }

    pub fn can_forward(&self) -> bool {
        matches!(self, RequestStatus::Open | RequestStatus::InProgress)
    }

    pub fn available_actions(&self) -> Vec<RequestAction> {
        match self {
            RequestStatus::Open => vec![
                RequestAction::Start,
                RequestAction::Cancel,
                RequestAction::Forward,
                RequestAction::Comment,
            ],
            RequestStatus::InProgress => vec![
                RequestAction::Complete,
                RequestAction::Forward,
                RequestAction::Comment,
            ],
            RequestStatus::Completed | RequestStatus::Cancelled => vec![RequestAction::Comment],
        }
    }
}

impl RequestPriority {
    pub fn label(&self) -> &'static str {
        match self {
            RequestPriority::Low => "Baixa",
            RequestPriority::Medium => "Média",
            RequestPriority::High => "Alta",
            RequestPriority::Urgent => "Urgente",
        }
    }
}

// --- ENTIDADES ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedRequest {
    pub id: Uuid,
    #[schema(example = "2026000042")]
    pub protocol_number: String,
    #[schema(example = "Reparo de poste")]
    pub title: String,
    #[schema(example = "Poste com lâmpada queimada na Rua das Flores, 120")]
    pub description: String,
    pub requester_type: RequesterType,
    pub requester_id: Option<Uuid>,
    #[schema(example = "João da Silva")]
    pub requester_name: String,
    #[schema(example = "Obras")]
    pub target_department: String,
    pub priority: RequestPriority,
    pub status: RequestStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestComment {
    pub id: Uuid,
    pub request_id: Uuid,
    pub author_id: Option<Uuid>,
    pub author_name: String,
    pub text: String,
    /// Comentário gerado por um encaminhamento
    pub is_forward: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestAttachment {
    pub id: Uuid,
    pub request_id: Uuid,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub storage_path: String,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub request_id: Uuid,
    pub from_status: Option<RequestStatus>,
    pub to_status: RequestStatus,
    pub changed_by: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Linha da listagem, já com os rótulos usados nos Badges.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestListItem {
    #[serde(flatten)]
    pub request: UnifiedRequest,
    #[schema(value_type = String, example = "Alta")]
    pub priority_label: &'static str,
    #[schema(value_type = String, example = "Aberta")]
    pub status_label: &'static str,
}

impl From<UnifiedRequest> for RequestListItem {
    fn from(request: UnifiedRequest) -> Self {
        Self {
            priority_label: request.priority.label(),
            status_label: request.status.label(),
            request,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: UnifiedRequest,
    #[schema(value_type = String)]
    pub priority_label: &'static str,
    #[schema(value_type = String)]
    pub status_label: &'static str,
    pub available_actions: Vec<RequestAction>,
    pub comments: Vec<RequestComment>,
    pub attachments: Vec<RequestAttachment>,
    pub status_history: Vec<StatusHistoryEntry>,
}

impl RequestDetail {
    pub fn new(
        request: UnifiedRequest,
        comments: Vec<RequestComment>,
        attachments: Vec<RequestAttachment>,
        status_history: Vec<StatusHistoryEntry>,
    ) -> Self {
        Self {
            priority_label: request.priority.label(),
            status_label: request.status.label(),
            available_actions: request.status.available_actions(),
            request,
            comments,
            attachments,
            status_history,
        }
    }
}

// --- FILTROS E PAYLOADS ---

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub requester_type: Option<RequesterType>,
    pub priority: Option<RequestPriority>,
    /// Departamento de destino
    pub department: Option<String>,
    /// Busca em protocolo, título e descrição
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestPayload {
    #[validate(length(min = 3, max = 200, message = "required"))]
    #[schema(example = "Reparo de poste")]
    pub title: String,

    #[validate(length(min = 10, message = "min_10_chars"))]
    #[schema(example = "Poste com lâmpada queimada na Rua das Flores, 120")]
    pub description: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Obras")]
    pub target_department: String,

    #[schema(example = "high")]
    pub priority: RequestPriority,

    /// Se ausente, o solicitante é o próprio servidor logado
    pub requester_type: Option<RequesterType>,
    pub requester_id: Option<Uuid>,
    pub requester_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    #[schema(example = "in_progress")]
    pub status: RequestStatus,
    #[validate(length(max = 2000, message = "max_length"))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequestPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Iluminação Pública")]
    pub target_department: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Demanda é de competência da Iluminação Pública")]
    pub comment: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCommentPayload {
    #[validate(length(min = 1, max = 5000, message = "required"))]
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [RequestStatus; 4] = [
        RequestStatus::Open,
        RequestStatus::InProgress,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
    ];

    fn sample(status: RequestStatus, priority: RequestPriority) -> UnifiedRequest {
        UnifiedRequest {
            id: Uuid::new_v4(),
            protocol_number: "2026000001".into(),
            title: "Reparo de poste".into(),
            description: "Poste apagado há uma semana".into(),
            requester_type: RequesterType::Citizen,
            requester_id: None,
            requester_name: "João".into(),
            target_department: "Obras".into(),
            priority,
            status,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn only_linear_transitions_are_allowed() {
        let allowed: Vec<_> = ALL
            .iter()
            .flat_map(|from| ALL.iter().map(move |to| (*from, *to)))
            .filter(|(from, to)| from.can_transition_to(*to))
            .collect();

        assert_eq!(
            allowed,
            vec![
                (RequestStatus::Open, RequestStatus::InProgress),
                (RequestStatus::Open, RequestStatus::Cancelled),
                (RequestStatus::InProgress, RequestStatus::Completed),
            ]
        );
    }

    #[test]
    fn terminal_requests_never_offer_forward() {
        for status in [RequestStatus::Completed, RequestStatus::Cancelled] {
            assert!(!status.can_forward());
            assert!(!status.available_actions().contains(&RequestAction::Forward));
        }
    }

    #[test]
    fn open_request_offers_cancel_and_start() {
        let actions = RequestStatus::Open.available_actions();
        assert!(actions.contains(&RequestAction::Cancel));
        assert!(actions.contains(&RequestAction::Start));
        assert!(RequestStatus::InProgress.available_actions().contains(&RequestAction::Forward));
    }

    #[test]
    fn new_high_priority_request_shows_alta_and_aberta() {
        let payload = CreateRequestPayload {
            title: "Reparo de poste".into(),
            description: "Poste apagado na esquina".into(),
            target_department: "Obras".into(),
            priority: RequestPriority::High,
            requester_type: None,
            requester_id: None,
            requester_name: None,
        };
        assert!(payload.validate().is_ok());

        let row = RequestListItem::from(sample(RequestStatus::Open, payload.priority));
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["priorityLabel"], "Alta");
        assert_eq!(json["statusLabel"], "Aberta");
        assert_eq!(json["targetDepartment"], "Obras");
        assert_eq!(json["status"], "open");
    }

    #[test]
    fn short_description_is_rejected() {
        let payload = CreateRequestPayload {
            title: "Reparo de poste".into(),
            description: "curta".into(),
            target_department: "Obras".into(),
            priority: RequestPriority::High,
            requester_type: None,
            requester_id: None,
            requester_name: None,
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("description"));
    }

    #[test]
    fn detail_exposes_actions_for_its_status() {
        let detail = RequestDetail::new(sample(RequestStatus::Completed, RequestPriority::Low), vec![], vec![], vec![]);
        assert_eq!(detail.available_actions, vec![RequestAction::Comment]);
        assert_eq!(detail.status_label, "Concluída");
    }
}
