// src/models/health.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::common::{
    field_map::FieldMap,
    validation::{check_date_range, validate_cpf, validate_non_negative, CrossFieldRules},
};

pub const TFD_FIELDS: FieldMap = FieldMap::new(
    "tfd_referrals",
    &[
        ("patientName", "patient_name"),
        ("destinationCity", "destination_city"),
        ("specialty", "specialty"),
        ("appointmentDate", "appointment_date"),
        ("status", "status"),
        ("createdAt", "created_at"),
    ],
    "appointment_date",
);

pub const PROGRAM_FIELDS: FieldMap = FieldMap::new(
    "health_programs",
    &[
        ("name", "name"),
        ("coordinator", "coordinator"),
        ("targetAudience", "target_audience"),
        ("startDate", "start_date"),
        ("status", "status"),
        ("participantsCount", "participants_count"),
        ("createdAt", "created_at"),
    ],
    "start_date",
);

// ---
// TFD (Tratamento Fora de Domicílio)
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tfd_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TfdStatus {
    PendingDocuments,
    UnderReview,
    Approved,
    TransportScheduled,
    Completed,
    Cancelled,
}

impl TfdStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TfdStatus::PendingDocuments => "pending_documents",
            TfdStatus::UnderReview => "under_review",
            TfdStatus::Approved => "approved",
            TfdStatus::TransportScheduled => "transport_scheduled",
            TfdStatus::Completed => "completed",
            TfdStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TfdStatus::PendingDocuments => "Documentação pendente",
            TfdStatus::UnderReview => "Em análise",
            TfdStatus::Approved => "Aprovado",
            TfdStatus::TransportScheduled => "Transporte agendado",
            TfdStatus::Completed => "Concluído",
            TfdStatus::Cancelled => "Cancelado",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TfdStatus::Completed | TfdStatus::Cancelled)
    }

    /// `transport_scheduled` só é alcançado pela etapa de transporte, não por troca direta.
    pub fn can_transition_to(&self, next: TfdStatus) -> bool {
        use TfdStatus::*;
        match (self, next) {
            (PendingDocuments, UnderReview)
            | (UnderReview, PendingDocuments)
            | (UnderReview, Approved)
            | (TransportScheduled, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn accepts_transport(&self) -> bool {
        matches!(self, TfdStatus::Approved | TfdStatus::TransportScheduled)
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TfdReferral {
    pub id: Uuid,
    #[schema(example = "José Aparecido")]
    pub patient_name: String,
    pub patient_cpf: String,
    pub patient_phone: Option<String>,
    #[schema(example = "São Paulo")]
    pub destination_city: String,
    #[schema(example = "Oncologia")]
    pub specialty: String,
    pub hospital: Option<String>,
    pub appointment_date: NaiveDate,
    pub needs_companion: bool,
    pub status: TfdStatus,
    pub vehicle: Option<String>,
    pub driver_name: Option<String>,
    pub departure_at: Option<DateTime<Utc>>,
    /// Ajuda de custo (alimentação/hospedagem)
    #[schema(example = 150.0)]
    pub cost_allowance: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TfdDocument {
    pub id: Uuid,
    pub referral_id: Uuid,
    #[schema(example = "laudo_medico")]
    pub document_kind: String,
    pub file_name: String,
    pub content_type: Option<String>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub storage_path: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TfdDetail {
    #[serde(flatten)]
    pub referral: TfdReferral,
    #[schema(value_type = String, example = "Em análise")]
    pub status_label: &'static str,
    pub documents: Vec<TfdDocument>,
}

impl TfdDetail {
    pub fn new(referral: TfdReferral, documents: Vec<TfdDocument>) -> Self {
        Self {
            status_label: referral.status.label(),
            referral,
            documents,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TfdFilter {
    pub status: Option<TfdStatus>,
    pub destination_city: Option<String>,
    pub specialty: Option<String>,
    /// Consultas a partir desta data
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Busca por nome ou CPF do paciente
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TfdPayload {
    #[validate(length(min = 3, max = 200, message = "required"))]
    pub patient_name: String,
    #[validate(custom(function = "validate_cpf"))]
    #[schema(example = "123.456.789-01")]
    pub patient_cpf: String,
    pub patient_phone: Option<String>,
    #[validate(length(min = 1, message = "required"))]
    pub destination_city: String,
    #[validate(length(min = 1, message = "required"))]
    pub specialty: String,
    pub hospital: Option<String>,
    pub appointment_date: NaiveDate,
    #[serde(default)]
    pub needs_companion: bool,
    #[validate(length(max = 2000, message = "max_length"))]
    pub notes: Option<String>,
}

impl CrossFieldRules for TfdPayload {}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTfdStatusPayload {
    pub status: TfdStatus,
}

/// Etapa de transporte: veículo, motorista, saída e ajuda de custo.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignTransportPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Van Saúde 02 - ABC1D23")]
    pub vehicle: String,
    #[validate(length(min = 3, message = "required"))]
    pub driver_name: String,
    pub departure_at: DateTime<Utc>,
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(example = 150.0)]
    pub cost_allowance: Option<Decimal>,
}

impl CrossFieldRules for AssignTransportPayload {}

// ---
// Programas de saúde
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "program_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProgramStatus {
    Planned,
    Active,
    Finished,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthProgram {
    pub id: Uuid,
    #[schema(example = "Hiperdia")]
    pub name: String,
    pub description: Option<String>,
    pub coordinator: String,
    #[schema(example = "Hipertensos e diabéticos")]
    pub target_audience: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: ProgramStatus,
    pub budget: Option<Decimal>,
    pub participants_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProgramFilter {
    pub status: Option<ProgramStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgramPayload {
    #[validate(length(min = 3, max = 200, message = "required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 3, message = "required"))]
    pub coordinator: String,
    #[validate(length(min = 1, message = "required"))]
    pub target_audience: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ProgramStatus>,
    #[validate(custom(function = "validate_non_negative"))]
    pub budget: Option<Decimal>,
    #[validate(range(min = 0, message = "negative_value"))]
    pub participants_count: Option<i32>,
}

impl CrossFieldRules for ProgramPayload {
    fn cross_field_rules(&self, errors: &mut ValidationErrors) {
        check_date_range(self.start_date, self.end_date, "end_date", errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn referral_flow_reaches_transport_only_through_assignment() {
        use TfdStatus::*;
        assert!(PendingDocuments.can_transition_to(UnderReview));
        assert!(UnderReview.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(TransportScheduled));
        assert!(TransportScheduled.can_transition_to(Completed));
        assert!(Approved.accepts_transport());
        assert!(!UnderReview.accepts_transport());
    }

    #[test]
    fn any_open_referral_can_be_cancelled_but_terminal_ones_cannot() {
        use TfdStatus::*;
        for status in [PendingDocuments, UnderReview, Approved, TransportScheduled] {
            assert!(status.can_transition_to(Cancelled), "{:?}", status);
        }
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn transport_with_negative_allowance_is_rejected() {
        let payload = AssignTransportPayload {
            vehicle: "Van 02".into(),
            driver_name: "Marcos".into(),
            departure_at: Utc::now(),
            cost_allowance: Some(Decimal::from_str("-10").unwrap()),
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("cost_allowance"));
    }

    #[test]
    fn program_cannot_end_before_it_starts() {
        let payload = ProgramPayload {
            name: "Hiperdia".into(),
            description: None,
            coordinator: "Dra. Helena".into(),
            target_audience: "Hipertensos".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 1),
            status: None,
            budget: Some(Decimal::from(5000)),
            participants_count: Some(40),
        };
        assert!(payload.validate().is_ok());
        assert!(payload.validate_all().is_err());
    }
}
