// src/models/education.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::common::{
    field_map::FieldMap,
    validation::{check_date_range, validate_cpf, CrossFieldRules},
};

pub const STUDENT_FIELDS: FieldMap = FieldMap::new(
    "students",
    &[
        ("fullName", "full_name"),
        ("birthDate", "birth_date"),
        ("schoolName", "school_name"),
        ("grade", "grade"),
        ("status", "status"),
        ("createdAt", "created_at"),
    ],
    "full_name",
);

pub const TEACHER_FIELDS: FieldMap = FieldMap::new(
    "teachers",
    &[
        ("fullName", "full_name"),
        ("subject", "subject"),
        ("schoolName", "school_name"),
        ("hireDate", "hire_date"),
        ("status", "status"),
        ("createdAt", "created_at"),
    ],
    "full_name",
);

pub const ENROLLMENT_FIELDS: FieldMap = FieldMap::new(
    "enrollments",
    &[
        ("studentName", "student_name"),
        ("schoolName", "school_name"),
        ("grade", "grade"),
        ("year", "school_year"),
        ("status", "status"),
        ("createdAt", "created_at"),
    ],
    "created_at",
);

pub const DIET_FIELDS: FieldMap = FieldMap::new(
    "special_diets",
    &[
        ("studentName", "student_name"),
        ("restriction", "restriction"),
        ("startDate", "start_date"),
        ("endDate", "end_date"),
        ("active", "active"),
        ("createdAt", "created_at"),
    ],
    "start_date",
);

pub const MENU_FIELDS: FieldMap = FieldMap::new(
    "school_menus",
    &[
        ("schoolName", "school_name"),
        ("menuDate", "menu_date"),
        ("mealType", "meal_type"),
        ("calories", "calories"),
        ("createdAt", "created_at"),
    ],
    "menu_date",
);

pub const FEEDBACK_FIELDS: FieldMap = FieldMap::new(
    "meal_feedback",
    &[
        ("schoolName", "school_name"),
        ("rating", "rating"),
        ("createdAt", "created_at"),
    ],
    "created_at",
);

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "student_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
    Transferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "teacher_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TeacherStatus {
    Active,
    OnLeave,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "enrollment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Pending,
    Approved,
    Rejected,
}

impl EnrollmentStatus {
    pub const ALL: [EnrollmentStatus; 3] = [
        EnrollmentStatus::Pending,
        EnrollmentStatus::Approved,
        EnrollmentStatus::Rejected,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "Pendente",
            EnrollmentStatus::Approved => "Aprovada",
            EnrollmentStatus::Rejected => "Rejeitada",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "meal_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Snack,
    Dinner,
}

// --- ALUNOS ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    #[schema(example = "Pedro Henrique Lima")]
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub cpf: Option<String>,
    pub guardian_name: String,
    pub guardian_phone: Option<String>,
    #[schema(example = "EMEF Monteiro Lobato")]
    pub school_name: String,
    #[schema(example = "5º ano")]
    pub grade: String,
    pub class_name: Option<String>,
    pub special_needs: Option<String>,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StudentFilter {
    pub status: Option<StudentStatus>,
    pub school_name: Option<String>,
    pub grade: Option<String>,
    /// Busca por nome do aluno, responsável ou CPF
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentPayload {
    #[validate(length(min = 3, max = 200, message = "required"))]
    pub full_name: String,
    pub birth_date: NaiveDate,
    #[validate(custom(function = "validate_cpf"))]
    #[schema(example = "123.456.789-01")]
    pub cpf: Option<String>,
    #[validate(length(min = 3, message = "required"))]
    pub guardian_name: String,
    pub guardian_phone: Option<String>,
    #[validate(length(min = 1, message = "required"))]
    pub school_name: String,
    #[validate(length(min = 1, message = "required"))]
    pub grade: String,
    pub class_name: Option<String>,
    pub special_needs: Option<String>,
    pub status: Option<StudentStatus>,
}

impl CrossFieldRules for StudentPayload {}

// --- PROFESSORES ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(example = "Matemática")]
    pub subject: String,
    pub school_name: String,
    pub hire_date: Option<NaiveDate>,
    pub status: TeacherStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TeacherFilter {
    pub status: Option<TeacherStatus>,
    pub school_name: Option<String>,
    pub subject: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherPayload {
    #[validate(length(min = 3, max = 200, message = "required"))]
    pub full_name: String,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "required"))]
    pub school_name: String,
    pub hire_date: Option<NaiveDate>,
    pub status: Option<TeacherStatus>,
}

impl CrossFieldRules for TeacherPayload {}

// --- MATRÍCULAS ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub school_name: String,
    pub grade: String,
    pub class_name: Option<String>,
    #[serde(rename = "year")]
    #[schema(example = 2026)]
    pub school_year: i32,
    pub status: EnrollmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EnrollmentFilter {
    pub status: Option<EnrollmentStatus>,
    pub school_name: Option<String>,
    pub year: Option<i32>,
    pub student_id: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentPayload {
    pub student_id: Uuid,
    #[validate(length(min = 1, message = "required"))]
    pub school_name: String,
    #[validate(length(min = 1, message = "required"))]
    pub grade: String,
    pub class_name: Option<String>,
    #[validate(range(min = 2000, max = 2100, message = "invalid_year"))]
    pub year: i32,
    pub status: Option<EnrollmentStatus>,
    #[validate(length(max = 2000, message = "max_length"))]
    pub notes: Option<String>,
}

impl CrossFieldRules for EnrollmentPayload {}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: EnrollmentStatus,
    #[schema(value_type = String, example = "Aprovada")]
    pub label: &'static str,
    pub count: i64,
    /// round(count / total * 100)
    pub percentage: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStats {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}

/// Histograma por status. Status sem matrícula aparecem com zero.
pub fn enrollment_stats(counts: &[(EnrollmentStatus, i64)]) -> EnrollmentStats {
    let total: i64 = counts.iter().map(|(_, c)| c).sum();
    let by_status = EnrollmentStatus::ALL
        .iter()
        .map(|status| {
            let count = counts
                .iter()
                .filter(|(s, _)| s == status)
                .map(|(_, c)| c)
                .sum::<i64>();
            let percentage = if total == 0 {
                0
            } else {
                (count as f64 / total as f64 * 100.0).round() as i64
            };
            StatusCount {
                status: *status,
                label: status.label(),
                count,
                percentage,
            }
        })
        .collect();

    EnrollmentStats { total, by_status }
}

// --- ALIMENTAÇÃO ESCOLAR ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecialDiet {
    pub id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    #[schema(example = "Intolerância à lactose")]
    pub restriction: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DietFilter {
    pub student_id: Option<Uuid>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DietPayload {
    pub student_id: Uuid,
    #[validate(length(min = 3, max = 200, message = "required"))]
    pub restriction: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub active: Option<bool>,
}

impl CrossFieldRules for DietPayload {
    fn cross_field_rules(&self, errors: &mut ValidationErrors) {
        check_date_range(self.start_date, self.end_date, "end_date", errors);
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchoolMenu {
    pub id: Uuid,
    pub school_name: String,
    pub menu_date: NaiveDate,
    pub meal_type: MealType,
    #[schema(example = "Arroz, feijão, frango assado e salada")]
    pub description: String,
    pub calories: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MenuFilter {
    pub school_name: Option<String>,
    pub meal_type: Option<MealType>,
    /// Cardápios a partir desta data
    pub from: Option<NaiveDate>,
    /// Cardápios até esta data
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MenuPayload {
    #[validate(length(min = 1, message = "required"))]
    pub school_name: String,
    pub menu_date: NaiveDate,
    pub meal_type: MealType,
    #[validate(length(min = 3, max = 1000, message = "required"))]
    pub description: String,
    #[validate(range(min = 0, message = "negative_value"))]
    pub calories: Option<i32>,
}

impl CrossFieldRules for MenuPayload {}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MealFeedback {
    pub id: Uuid,
    pub menu_id: Option<Uuid>,
    pub school_name: String,
    pub rating: i16,
    pub comment: Option<String>,
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FeedbackFilter {
    pub school_name: Option<String>,
    pub menu_id: Option<Uuid>,
    pub min_rating: Option<i16>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPayload {
    pub menu_id: Option<Uuid>,
    #[validate(length(min = 1, message = "required"))]
    pub school_name: String,
    #[validate(range(min = 1, max = 5, message = "invalid_rating"))]
    pub rating: i16,
    #[validate(length(max = 2000, message = "max_length"))]
    pub comment: Option<String>,
    pub author_name: Option<String>,
}

impl CrossFieldRules for FeedbackPayload {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_every_status_with_rounded_percentages() {
        let stats = enrollment_stats(&[
            (EnrollmentStatus::Pending, 2),
            (EnrollmentStatus::Approved, 3),
            (EnrollmentStatus::Rejected, 1),
        ]);

        assert_eq!(stats.total, 6);
        assert_eq!(stats.by_status.len(), 3);
        assert_eq!(stats.by_status.iter().map(|s| s.count).sum::<i64>(), 6);

        let pct: Vec<_> = stats.by_status.iter().map(|s| (s.status, s.percentage)).collect();
        assert_eq!(
            pct,
            vec![
                (EnrollmentStatus::Pending, 33),
                (EnrollmentStatus::Approved, 50),
                (EnrollmentStatus::Rejected, 17),
            ]
        );
    }

    #[test]
    fn stats_without_enrollments_are_all_zero() {
        let stats = enrollment_stats(&[]);
        assert_eq!(stats.total, 0);
        assert!(stats.by_status.iter().all(|s| s.count == 0 && s.percentage == 0));
    }

    #[test]
    fn diet_ending_before_it_starts_is_rejected() {
        let payload = DietPayload {
            student_id: Uuid::new_v4(),
            restriction: "Doença celíaca".into(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 4, 1),
            active: None,
        };
        match payload.validate_all() {
            Err(crate::common::error::AppError::ValidationError(errors)) => {
                assert!(errors.field_errors().contains_key("end_date"));
            }
            other => panic!("esperava erro de validação, veio {:?}", other),
        }
    }

    #[test]
    fn feedback_rating_must_be_between_one_and_five() {
        let mut payload = FeedbackPayload {
            menu_id: None,
            school_name: "EMEF Monteiro Lobato".into(),
            rating: 6,
            comment: None,
            author_name: None,
        };
        assert!(payload.validate().is_err());
        payload.rating = 5;
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn enrollment_serializes_school_year_as_year() {
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            student_name: "Pedro".into(),
            school_name: "EMEF Monteiro Lobato".into(),
            grade: "5º ano".into(),
            class_name: None,
            school_year: 2026,
            status: EnrollmentStatus::Pending,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&enrollment).unwrap();
        assert_eq!(json["year"], 2026);
        assert_eq!(json["studentName"], "Pedro");
    }
}
