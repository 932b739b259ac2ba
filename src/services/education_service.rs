// src/services/education_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
    },
    db::EducationRepository,
    models::education::{
        enrollment_stats, DietFilter, DietPayload, Enrollment, EnrollmentFilter,
        EnrollmentPayload, EnrollmentStats, FeedbackFilter, FeedbackPayload, MealFeedback,
        MenuFilter, MenuPayload, SchoolMenu, SpecialDiet, Student, StudentFilter, StudentPayload,
        Teacher, TeacherFilter, TeacherPayload,
    },
};

fn not_found(what: &str, id: Uuid) -> AppError {
    AppError::ResourceNotFound(format!("{} {}", what, id))
}

#[derive(Clone)]
pub struct EducationService {
    repo: EducationRepository,
}

impl EducationService {
    pub fn new(repo: EducationRepository) -> Self {
        Self { repo }
    }

    // =========================================================================
    //  1. ALUNOS
    // =========================================================================

    pub async fn list_students(
        &self,
        filter: &StudentFilter,
        page: &PageRequest,
    ) -> Result<Page<Student>, AppError> {
        self.repo.list_students(filter, page).await
    }

    pub async fn get_student(&self, id: Uuid) -> Result<Student, AppError> {
        self.repo
            .find_student(id)
            .await?
            .ok_or_else(|| not_found("Aluno", id))
    }

    pub async fn create_student<'e, E>(
        &self,
        executor: E,
        payload: &StudentPayload,
    ) -> Result<Student, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let student = self.repo.create_student(executor, payload).await?;
        tracing::info!("Aluno cadastrado: {} ({})", student.full_name, student.school_name);
        Ok(student)
    }

    pub async fn update_student<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &StudentPayload,
    ) -> Result<Student, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_student(executor, id, payload)
            .await?
            .ok_or_else(|| not_found("Aluno", id))
    }

    // =========================================================================
    //  2. PROFESSORES
    // =========================================================================

    pub async fn list_teachers(
        &self,
        filter: &TeacherFilter,
        page: &PageRequest,
    ) -> Result<Page<Teacher>, AppError> {
        self.repo.list_teachers(filter, page).await
    }

    pub async fn get_teacher(&self, id: Uuid) -> Result<Teacher, AppError> {
        self.repo
            .find_teacher(id)
            .await?
            .ok_or_else(|| not_found("Professor", id))
    }

    pub async fn create_teacher<'e, E>(
        &self,
        executor: E,
        payload: &TeacherPayload,
    ) -> Result<Teacher, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_teacher(executor, payload).await
    }

    pub async fn update_teacher<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &TeacherPayload,
    ) -> Result<Teacher, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_teacher(executor, id, payload)
            .await?
            .ok_or_else(|| not_found("Professor", id))
    }

    // =========================================================================
    //  3. MATRÍCULAS
    // =========================================================================

    pub async fn list_enrollments(
        &self,
        filter: &EnrollmentFilter,
        page: &PageRequest,
    ) -> Result<Page<Enrollment>, AppError> {
        self.repo.list_enrollments(filter, page).await
    }

    pub async fn get_enrollment(&self, id: Uuid) -> Result<Enrollment, AppError> {
        self.repo
            .find_enrollment(id)
            .await?
            .ok_or_else(|| not_found("Matrícula", id))
    }

    pub async fn create_enrollment<'e, E>(
        &self,
        executor: E,
        payload: &EnrollmentPayload,
    ) -> Result<Enrollment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_enrollment(executor, payload).await
    }

    pub async fn update_enrollment<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &EnrollmentPayload,
    ) -> Result<Enrollment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_enrollment(executor, id, payload)
            .await?
            .ok_or_else(|| not_found("Matrícula", id))
    }

    /// Distribuição das matrículas por status (opcionalmente de um ano letivo).
    pub async fn enrollment_stats(&self, year: Option<i32>) -> Result<EnrollmentStats, AppError> {
        let counts = self.repo.count_enrollments_by_status(year).await?;
        Ok(enrollment_stats(&counts))
    }

    // =========================================================================
    //  4. ALIMENTAÇÃO ESCOLAR
    // =========================================================================

    pub async fn list_diets(
        &self,
        filter: &DietFilter,
        page: &PageRequest,
    ) -> Result<Page<SpecialDiet>, AppError> {
        self.repo.list_diets(filter, page).await
    }

    pub async fn get_diet(&self, id: Uuid) -> Result<SpecialDiet, AppError> {
        self.repo
            .find_diet(id)
            .await?
            .ok_or_else(|| not_found("Dieta", id))
    }

    pub async fn create_diet<'e, E>(
        &self,
        executor: E,
        payload: &DietPayload,
    ) -> Result<SpecialDiet, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_diet(executor, payload).await
    }

    pub async fn update_diet<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &DietPayload,
    ) -> Result<SpecialDiet, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_diet(executor, id, payload)
            .await?
            .ok_or_else(|| not_found("Dieta", id))
    }

    pub async fn list_menus(
        &self,
        filter: &MenuFilter,
        page: &PageRequest,
    ) -> Result<Page<SchoolMenu>, AppError> {
        self.repo.list_menus(filter, page).await
    }

    pub async fn get_menu(&self, id: Uuid) -> Result<SchoolMenu, AppError> {
        self.repo
            .find_menu(id)
            .await?
            .ok_or_else(|| not_found("Cardápio", id))
    }

    pub async fn create_menu<'e, E>(
        &self,
        executor: E,
        payload: &MenuPayload,
    ) -> Result<SchoolMenu, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_menu(executor, payload).await
    }

    pub async fn update_menu<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &MenuPayload,
    ) -> Result<SchoolMenu, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_menu(executor, id, payload)
            .await?
            .ok_or_else(|| not_found("Cardápio", id))
    }

    pub async fn list_feedback(
        &self,
        filter: &FeedbackFilter,
        page: &PageRequest,
    ) -> Result<Page<MealFeedback>, AppError> {
        self.repo.list_feedback(filter, page).await
    }

    pub async fn create_feedback<'e, E>(
        &self,
        executor: E,
        payload: &FeedbackPayload,
    ) -> Result<MealFeedback, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_feedback(executor, payload).await
    }
}
