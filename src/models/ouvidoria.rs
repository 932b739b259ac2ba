// src/models/ouvidoria.rs

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::common::{field_map::FieldMap, validation::CrossFieldRules};

pub const CASE_FIELDS: FieldMap = FieldMap::new(
    "ouvidoria_cases",
    &[
        ("protocolNumber", "protocol_number"),
        ("kind", "kind"),
        ("subject", "subject"),
        ("department", "department"),
        ("status", "status"),
        ("deadline", "deadline"),
        ("createdAt", "created_at"),
    ],
    "created_at",
);

/// Prazo legal de resposta ao cidadão.
pub const RESPONSE_DEADLINE_DAYS: u64 = 30;

pub fn response_deadline(opened_on: NaiveDate) -> NaiveDate {
    opened_on
        .checked_add_days(Days::new(RESPONSE_DEADLINE_DAYS))
        .unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ouvidoria_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OuvidoriaKind {
    Complaint,
    Suggestion,
    Compliment,
    Information,
    Report,
}

impl OuvidoriaKind {
    pub fn label(&self) -> &'static str {
        match self {
            OuvidoriaKind::Complaint => "Reclamação",
            OuvidoriaKind::Suggestion => "Sugestão",
            OuvidoriaKind::Compliment => "Elogio",
            OuvidoriaKind::Information => "Pedido de informação",
            OuvidoriaKind::Report => "Denúncia",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "ouvidoria_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OuvidoriaStatus {
    Received,
    UnderAnalysis,
    Answered,
    Closed,
}

impl OuvidoriaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OuvidoriaStatus::Received => "received",
            OuvidoriaStatus::UnderAnalysis => "under_analysis",
            OuvidoriaStatus::Answered => "answered",
            OuvidoriaStatus::Closed => "closed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OuvidoriaStatus::Received => "Recebida",
            OuvidoriaStatus::UnderAnalysis => "Em análise",
            OuvidoriaStatus::Answered => "Respondida",
            OuvidoriaStatus::Closed => "Encerrada",
        }
    }

    /// `received -> under_analysis -> answered -> closed`; `received -> closed` arquiva.
    pub fn can_transition_to(&self, next: OuvidoriaStatus) -> bool {
        matches!(
            (self, next),
            (OuvidoriaStatus::Received, OuvidoriaStatus::UnderAnalysis)
                | (OuvidoriaStatus::UnderAnalysis, OuvidoriaStatus::Answered)
                | (OuvidoriaStatus::Answered, OuvidoriaStatus::Closed)
                | (OuvidoriaStatus::Received, OuvidoriaStatus::Closed)
        )
    }

    /// Ainda aguardando resposta da prefeitura
    pub fn is_pending(&self) -> bool {
        matches!(self, OuvidoriaStatus::Received | OuvidoriaStatus::UnderAnalysis)
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OuvidoriaCase {
    pub id: Uuid,
    #[schema(example = "OUV-2026-000017")]
    pub protocol_number: String,
    pub kind: OuvidoriaKind,
    #[schema(example = "Demora no atendimento da UBS Centro")]
    pub subject: String,
    pub description: String,
    pub anonymous: bool,
    pub citizen_name: Option<String>,
    pub citizen_email: Option<String>,
    pub citizen_phone: Option<String>,
    #[schema(example = "Saúde")]
    pub department: Option<String>,
    pub status: OuvidoriaStatus,
    pub deadline: NaiveDate,
    pub response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OuvidoriaCase {
    /// Manifestações anônimas nunca expõem dados de contato.
    pub fn redacted(mut self) -> Self {
        if self.anonymous {
            self.citizen_name = None;
            self.citizen_email = None;
            self.citizen_phone = None;
        }
        self
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_pending() && self.deadline < today
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OuvidoriaUpdate {
    pub id: Uuid,
    pub case_id: Uuid,
    pub status: OuvidoriaStatus,
    pub note: String,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseListItem {
    #[serde(flatten)]
    pub case: OuvidoriaCase,
    #[schema(value_type = String, example = "Reclamação")]
    pub kind_label: &'static str,
    #[schema(value_type = String, example = "Recebida")]
    pub status_label: &'static str,
    pub overdue: bool,
}

impl CaseListItem {
    pub fn new(case: OuvidoriaCase, today: NaiveDate) -> Self {
        Self {
            kind_label: case.kind.label(),
            status_label: case.status.label(),
            overdue: case.is_overdue(today),
            case: case.redacted(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetail {
    #[serde(flatten)]
    pub item: CaseListItem,
    pub updates: Vec<OuvidoriaUpdate>,
}

// --- FILTROS E PAYLOADS ---

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CaseFilter {
    pub status: Option<OuvidoriaStatus>,
    pub kind: Option<OuvidoriaKind>,
    pub department: Option<String>,
    /// Apenas manifestações pendentes com prazo vencido
    pub overdue: Option<bool>,
    /// Busca em protocolo, assunto e descrição
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCasePayload {
    pub kind: OuvidoriaKind,
    #[validate(length(min = 3, max = 200, message = "required"))]
    pub subject: String,
    #[validate(length(min = 10, message = "min_10_chars"))]
    pub description: String,
    #[serde(default)]
    pub anonymous: bool,
    pub citizen_name: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub citizen_email: Option<String>,
    pub citizen_phone: Option<String>,
    pub department: Option<String>,
}

impl CrossFieldRules for CreateCasePayload {
    fn cross_field_rules(&self, errors: &mut ValidationErrors) {
        if self.anonymous {
            return;
        }
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        if !filled(&self.citizen_name) || !(filled(&self.citizen_email) || filled(&self.citizen_phone)) {
            errors.add("citizen_name", ValidationError::new("contact_required"));
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCaseStatusPayload {
    pub status: OuvidoriaStatus,
    #[validate(length(min = 1, max = 2000, message = "required"))]
    pub note: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RespondCasePayload {
    #[validate(length(min = 10, message = "min_10_chars"))]
    pub response: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignDepartmentPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Saúde")]
    pub department: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::AppError;

    fn sample(anonymous: bool, status: OuvidoriaStatus, deadline: NaiveDate) -> OuvidoriaCase {
        OuvidoriaCase {
            id: Uuid::new_v4(),
            protocol_number: "OUV-2026-000001".into(),
            kind: OuvidoriaKind::Complaint,
            subject: "Buraco na via".into(),
            description: "Buraco enorme na Av. Brasil".into(),
            anonymous,
            citizen_name: Some("Carla".into()),
            citizen_email: Some("carla@email.com".into()),
            citizen_phone: None,
            department: None,
            status,
            deadline,
            response: None,
            responded_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn deadline_is_thirty_days_after_opening() {
        assert_eq!(response_deadline(date(2026, 1, 15)), date(2026, 2, 14));
    }

    #[test]
    fn transitions_follow_the_case_workflow() {
        use OuvidoriaStatus::*;
        assert!(Received.can_transition_to(UnderAnalysis));
        assert!(Received.can_transition_to(Closed));
        assert!(UnderAnalysis.can_transition_to(Answered));
        assert!(Answered.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(Received));
        assert!(!Received.can_transition_to(Answered));
        assert!(!UnderAnalysis.can_transition_to(Closed));
    }

    #[test]
    fn anonymous_cases_hide_contact() {
        let item = CaseListItem::new(sample(true, OuvidoriaStatus::Received, date(2026, 2, 1)), date(2026, 1, 1));
        assert!(item.case.citizen_name.is_none());
        assert!(item.case.citizen_email.is_none());

        let item = CaseListItem::new(sample(false, OuvidoriaStatus::Received, date(2026, 2, 1)), date(2026, 1, 1));
        assert_eq!(item.case.citizen_name.as_deref(), Some("Carla"));
    }

    #[test]
    fn only_pending_cases_become_overdue() {
        let today = date(2026, 3, 1);
        assert!(sample(false, OuvidoriaStatus::UnderAnalysis, date(2026, 2, 1)).is_overdue(today));
        assert!(!sample(false, OuvidoriaStatus::Answered, date(2026, 2, 1)).is_overdue(today));
        assert!(!sample(false, OuvidoriaStatus::Received, date(2026, 3, 1)).is_overdue(today));
    }

    #[test]
    fn identified_case_requires_name_and_contact() {
        let mut payload = CreateCasePayload {
            kind: OuvidoriaKind::Suggestion,
            subject: "Mais ônibus".into(),
            description: "Aumentar a frota da linha 12".into(),
            anonymous: false,
            citizen_name: Some("Carla".into()),
            citizen_email: None,
            citizen_phone: None,
            department: None,
        };
        match payload.validate_all() {
            Err(AppError::ValidationError(errors)) => {
                assert!(errors.field_errors().contains_key("citizen_name"))
            }
            other => panic!("esperava erro de validação, veio {:?}", other),
        }

        payload.citizen_phone = Some("(11) 99999-0000".into());
        assert!(payload.validate_all().is_ok());

        payload.citizen_name = None;
        payload.citizen_phone = None;
        payload.anonymous = true;
        assert!(payload.validate_all().is_ok());
    }
}
