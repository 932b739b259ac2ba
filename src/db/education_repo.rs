// src/db/education_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        error::{map_reference_violation, map_unique_violation, AppError},
        pagination::{Page, PageRequest},
    },
    db::{fetch_page, search_pattern},
    models::education::{
        DietFilter, DietPayload, Enrollment, EnrollmentFilter, EnrollmentPayload, EnrollmentStatus,
        FeedbackFilter, FeedbackPayload, MealFeedback, MenuFilter, MenuPayload, SchoolMenu,
        SpecialDiet, Student, StudentFilter, StudentPayload, StudentStatus, Teacher, TeacherFilter,
        TeacherPayload, TeacherStatus,
    },
};

const STUDENT_COLUMNS: &str = "id, full_name, birth_date, cpf, guardian_name, guardian_phone, school_name, grade, class_name, special_needs, status, created_at, updated_at";
const TEACHER_COLUMNS: &str = "id, full_name, email, phone, subject, school_name, hire_date, status, created_at, updated_at";
const MENU_COLUMNS: &str = "id, school_name, menu_date, meal_type, description, calories, created_at, updated_at";
const FEEDBACK_COLUMNS: &str = "id, menu_id, school_name, rating, comment, author_name, created_at";

// Matrículas e dietas saem junto com o nome do aluno.
const ENROLLMENT_SOURCE: &str = "(SELECT e.*, s.full_name AS student_name FROM enrollments e JOIN students s ON s.id = e.student_id) AS enrollments";
const DIET_SOURCE: &str = "(SELECT d.*, s.full_name AS student_name FROM special_diets d JOIN students s ON s.id = d.student_id) AS special_diets";

#[derive(Clone)]
pub struct EducationRepository {
    pool: PgPool,
}

impl EducationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ALUNOS
    // =========================================================================

    pub async fn list_students(
        &self,
        filter: &StudentFilter,
        page: &PageRequest,
    ) -> Result<Page<Student>, AppError> {
        let search = search_pattern(filter.search.as_deref());
        fetch_page(
            &self.pool,
            "students",
            |qb: &mut QueryBuilder<'static, Postgres>| {
                if let Some(status) = filter.status {
                    qb.push(" AND status = ").push_bind(status);
                }
                if let Some(school) = filter.school_name.clone() {
                    qb.push(" AND school_name = ").push_bind(school);
                }
                if let Some(grade) = filter.grade.clone() {
                    qb.push(" AND grade = ").push_bind(grade);
                }
                if let Some(pattern) = search.clone() {
                    qb.push(" AND (full_name ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR guardian_name ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR cpf ILIKE ")
                        .push_bind(pattern)
                        .push(")");
                }
            },
            page,
        )
        .await
    }

    pub async fn find_student(&self, id: Uuid) -> Result<Option<Student>, AppError> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE id = $1",
            STUDENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    pub async fn create_student<'e, E>(
        &self,
        executor: E,
        payload: &StudentPayload,
    ) -> Result<Student, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Student>(&format!(
            r#"
            INSERT INTO students (
                full_name, birth_date, cpf, guardian_name, guardian_phone,
                school_name, grade, class_name, special_needs, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            STUDENT_COLUMNS
        ))
        .bind(&payload.full_name)
        .bind(payload.birth_date)
        .bind(&payload.cpf)
        .bind(&payload.guardian_name)
        .bind(&payload.guardian_phone)
        .bind(&payload.school_name)
        .bind(&payload.grade)
        .bind(&payload.class_name)
        .bind(&payload.special_needs)
        .bind(payload.status.unwrap_or(StudentStatus::Active))
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "CPF do aluno"))
    }

    pub async fn update_student<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &StudentPayload,
    ) -> Result<Option<Student>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Student>(&format!(
            r#"
            UPDATE students
            SET full_name = $2, birth_date = $3, cpf = $4, guardian_name = $5,
                guardian_phone = $6, school_name = $7, grade = $8, class_name = $9,
                special_needs = $10, status = COALESCE($11, status), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            STUDENT_COLUMNS
        ))
        .bind(id)
        .bind(&payload.full_name)
        .bind(payload.birth_date)
        .bind(&payload.cpf)
        .bind(&payload.guardian_name)
        .bind(&payload.guardian_phone)
        .bind(&payload.school_name)
        .bind(&payload.grade)
        .bind(&payload.class_name)
        .bind(&payload.special_needs)
        .bind(payload.status)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, "CPF do aluno"))
    }

    // =========================================================================
    //  PROFESSORES
    // =========================================================================

    pub async fn list_teachers(
        &self,
        filter: &TeacherFilter,
        page: &PageRequest,
    ) -> Result<Page<Teacher>, AppError> {
        let search = search_pattern(filter.search.as_deref());
        fetch_page(
            &self.pool,
            "teachers",
            |qb: &mut QueryBuilder<'static, Postgres>| {
                if let Some(status) = filter.status {
                    qb.push(" AND status = ").push_bind(status);
                }
                if let Some(school) = filter.school_name.clone() {
                    qb.push(" AND school_name = ").push_bind(school);
                }
                if let Some(subject) = filter.subject.clone() {
                    qb.push(" AND subject = ").push_bind(subject);
                }
                if let Some(pattern) = search.clone() {
                    qb.push(" AND (full_name ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR email ILIKE ")
                        .push_bind(pattern)
                        .push(")");
                }
            },
            page,
        )
        .await
    }

    pub async fn find_teacher(&self, id: Uuid) -> Result<Option<Teacher>, AppError> {
        let teacher = sqlx::query_as::<_, Teacher>(&format!(
            "SELECT {} FROM teachers WHERE id = $1",
            TEACHER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(teacher)
    }

    pub async fn create_teacher<'e, E>(
        &self,
        executor: E,
        payload: &TeacherPayload,
    ) -> Result<Teacher, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Teacher>(&format!(
            r#"
            INSERT INTO teachers (full_name, email, phone, subject, school_name, hire_date, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            TEACHER_COLUMNS
        ))
        .bind(&payload.full_name)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(&payload.subject)
        .bind(&payload.school_name)
        .bind(payload.hire_date)
        .bind(payload.status.unwrap_or(TeacherStatus::Active))
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "E-mail do professor"))
    }

    pub async fn update_teacher<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &TeacherPayload,
    ) -> Result<Option<Teacher>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Teacher>(&format!(
            r#"
            UPDATE teachers
            SET full_name = $2, email = $3, phone = $4, subject = $5, school_name = $6,
                hire_date = $7, status = COALESCE($8, status), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TEACHER_COLUMNS
        ))
        .bind(id)
        .bind(&payload.full_name)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(&payload.subject)
        .bind(&payload.school_name)
        .bind(payload.hire_date)
        .bind(payload.status)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, "E-mail do professor"))
    }

    // =========================================================================
    //  MATRÍCULAS
    // =========================================================================

    pub async fn list_enrollments(
        &self,
        filter: &EnrollmentFilter,
        page: &PageRequest,
    ) -> Result<Page<Enrollment>, AppError> {
        let search = search_pattern(filter.search.as_deref());
        fetch_page(
            &self.pool,
            ENROLLMENT_SOURCE,
            |qb: &mut QueryBuilder<'static, Postgres>| {
                if let Some(status) = filter.status {
                    qb.push(" AND status = ").push_bind(status);
                }
                if let Some(school) = filter.school_name.clone() {
                    qb.push(" AND school_name = ").push_bind(school);
                }
                if let Some(year) = filter.year {
                    qb.push(" AND school_year = ").push_bind(year);
                }
                if let Some(student_id) = filter.student_id {
                    qb.push(" AND student_id = ").push_bind(student_id);
                }
                if let Some(pattern) = search.clone() {
                    qb.push(" AND student_name ILIKE ").push_bind(pattern);
                }
            },
            page,
        )
        .await
    }

    pub async fn find_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, AppError> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT * FROM {} WHERE id = $1",
            ENROLLMENT_SOURCE
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enrollment)
    }

    pub async fn create_enrollment<'e, E>(
        &self,
        executor: E,
        payload: &EnrollmentPayload,
    ) -> Result<Enrollment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Enrollment>(
            r#"
            WITH inserted AS (
                INSERT INTO enrollments (student_id, school_name, grade, class_name, school_year, status, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT i.*, s.full_name AS student_name
            FROM inserted i JOIN students s ON s.id = i.student_id
            "#,
        )
        .bind(payload.student_id)
        .bind(&payload.school_name)
        .bind(&payload.grade)
        .bind(&payload.class_name)
        .bind(payload.year)
        .bind(payload.status.unwrap_or(EnrollmentStatus::Pending))
        .bind(&payload.notes)
        .fetch_one(executor)
        .await
        .map_err(|e| map_reference_violation(e, "Matrícula", "Aluno"))
    }

    pub async fn update_enrollment<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &EnrollmentPayload,
    ) -> Result<Option<Enrollment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Enrollment>(
            r#"
            WITH updated AS (
                UPDATE enrollments
                SET student_id = $2, school_name = $3, grade = $4, class_name = $5,
                    school_year = $6, status = COALESCE($7, status), notes = $8, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT u.*, s.full_name AS student_name
            FROM updated u JOIN students s ON s.id = u.student_id
            "#,
        )
        .bind(id)
        .bind(payload.student_id)
        .bind(&payload.school_name)
        .bind(&payload.grade)
        .bind(&payload.class_name)
        .bind(payload.year)
        .bind(payload.status)
        .bind(&payload.notes)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_reference_violation(e, "Matrícula", "Aluno"))
    }

    /// Contagem por status (opcionalmente de um ano letivo).
    pub async fn count_enrollments_by_status(
        &self,
        year: Option<i32>,
    ) -> Result<Vec<(EnrollmentStatus, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (EnrollmentStatus, i64)>(
            r#"
            SELECT status, COUNT(*)
            FROM enrollments
            WHERE ($1::int IS NULL OR school_year = $1)
            GROUP BY status
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // =========================================================================
    //  DIETAS ESPECIAIS
    // =========================================================================

    pub async fn list_diets(
        &self,
        filter: &DietFilter,
        page: &PageRequest,
    ) -> Result<Page<SpecialDiet>, AppError> {
        let search = search_pattern(filter.search.as_deref());
        fetch_page(
            &self.pool,
            DIET_SOURCE,
            |qb: &mut QueryBuilder<'static, Postgres>| {
                if let Some(student_id) = filter.student_id {
                    qb.push(" AND student_id = ").push_bind(student_id);
                }
                if let Some(active) = filter.active {
                    qb.push(" AND active = ").push_bind(active);
                }
                if let Some(pattern) = search.clone() {
                    qb.push(" AND (student_name ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR restriction ILIKE ")
                        .push_bind(pattern)
                        .push(")");
                }
            },
            page,
        )
        .await
    }

    pub async fn find_diet(&self, id: Uuid) -> Result<Option<SpecialDiet>, AppError> {
        let diet = sqlx::query_as::<_, SpecialDiet>(&format!(
            "SELECT * FROM {} WHERE id = $1",
            DIET_SOURCE
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(diet)
    }

    pub async fn create_diet<'e, E>(
        &self,
        executor: E,
        payload: &DietPayload,
    ) -> Result<SpecialDiet, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, SpecialDiet>(
            r#"
            WITH inserted AS (
                INSERT INTO special_diets (student_id, restriction, description, start_date, end_date, active)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            )
            SELECT i.*, s.full_name AS student_name
            FROM inserted i JOIN students s ON s.id = i.student_id
            "#,
        )
        .bind(payload.student_id)
        .bind(&payload.restriction)
        .bind(&payload.description)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .bind(payload.active.unwrap_or(true))
        .fetch_one(executor)
        .await
        .map_err(|e| map_reference_violation(e, "Dieta", "Aluno"))
    }

    pub async fn update_diet<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &DietPayload,
    ) -> Result<Option<SpecialDiet>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, SpecialDiet>(
            r#"
            WITH updated AS (
                UPDATE special_diets
                SET student_id = $2, restriction = $3, description = $4, start_date = $5,
                    end_date = $6, active = COALESCE($7, active), updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT u.*, s.full_name AS student_name
            FROM updated u JOIN students s ON s.id = u.student_id
            "#,
        )
        .bind(id)
        .bind(payload.student_id)
        .bind(&payload.restriction)
        .bind(&payload.description)
        .bind(payload.start_date)
        .bind(payload.end_date)
        .bind(payload.active)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_reference_violation(e, "Dieta", "Aluno"))
    }

    // =========================================================================
    //  CARDÁPIOS
    // =========================================================================

    pub async fn list_menus(
        &self,
        filter: &MenuFilter,
        page: &PageRequest,
    ) -> Result<Page<SchoolMenu>, AppError> {
        fetch_page(
            &self.pool,
            "school_menus",
            |qb: &mut QueryBuilder<'static, Postgres>| {
                if let Some(school) = filter.school_name.clone() {
                    qb.push(" AND school_name = ").push_bind(school);
                }
                if let Some(meal_type) = filter.meal_type {
                    qb.push(" AND meal_type = ").push_bind(meal_type);
                }
                if let Some(from) = filter.from {
                    qb.push(" AND menu_date >= ").push_bind(from);
                }
                if let Some(to) = filter.to {
                    qb.push(" AND menu_date <= ").push_bind(to);
                }
            },
            page,
        )
        .await
    }

    pub async fn find_menu(&self, id: Uuid) -> Result<Option<SchoolMenu>, AppError> {
        let menu = sqlx::query_as::<_, SchoolMenu>(&format!(
            "SELECT {} FROM school_menus WHERE id = $1",
            MENU_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(menu)
    }

    pub async fn create_menu<'e, E>(
        &self,
        executor: E,
        payload: &MenuPayload,
    ) -> Result<SchoolMenu, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, SchoolMenu>(&format!(
            r#"
            INSERT INTO school_menus (school_name, menu_date, meal_type, description, calories)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            MENU_COLUMNS
        ))
        .bind(&payload.school_name)
        .bind(payload.menu_date)
        .bind(payload.meal_type)
        .bind(&payload.description)
        .bind(payload.calories)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, "Cardápio para esta escola, data e refeição"))
    }

    pub async fn update_menu<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &MenuPayload,
    ) -> Result<Option<SchoolMenu>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, SchoolMenu>(&format!(
            r#"
            UPDATE school_menus
            SET school_name = $2, menu_date = $3, meal_type = $4, description = $5,
                calories = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            MENU_COLUMNS
        ))
        .bind(id)
        .bind(&payload.school_name)
        .bind(payload.menu_date)
        .bind(payload.meal_type)
        .bind(&payload.description)
        .bind(payload.calories)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, "Cardápio para esta escola, data e refeição"))
    }

    // =========================================================================
    //  AVALIAÇÕES DA MERENDA
    // =========================================================================

    pub async fn list_feedback(
        &self,
        filter: &FeedbackFilter,
        page: &PageRequest,
    ) -> Result<Page<MealFeedback>, AppError> {
        fetch_page(
            &self.pool,
            "meal_feedback",
            |qb: &mut QueryBuilder<'static, Postgres>| {
                if let Some(school) = filter.school_name.clone() {
                    qb.push(" AND school_name = ").push_bind(school);
                }
                if let Some(menu_id) = filter.menu_id {
                    qb.push(" AND menu_id = ").push_bind(menu_id);
                }
                if let Some(min_rating) = filter.min_rating {
                    qb.push(" AND rating >= ").push_bind(min_rating);
                }
            },
            page,
        )
        .await
    }

    pub async fn create_feedback<'e, E>(
        &self,
        executor: E,
        payload: &FeedbackPayload,
    ) -> Result<MealFeedback, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, MealFeedback>(&format!(
            r#"
            INSERT INTO meal_feedback (menu_id, school_name, rating, comment, author_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            FEEDBACK_COLUMNS
        ))
        .bind(payload.menu_id)
        .bind(&payload.school_name)
        .bind(payload.rating)
        .bind(&payload.comment)
        .bind(&payload.author_name)
        .fetch_one(executor)
        .await
        .map_err(|e| map_reference_violation(e, "Avaliação", "Cardápio"))
    }
}
