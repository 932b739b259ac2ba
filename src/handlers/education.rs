// src/handlers/education.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::begin_audited,
        error::{ApiError, AppError},
        pagination::{Page, PageParams},
        validation::CrossFieldRules,
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{
            PermEnrollmentsCreate, PermEnrollmentsRead, PermEnrollmentsUpdate,
            PermSchoolMealsCreate, PermSchoolMealsRead, PermSchoolMealsUpdate, PermStudentsCreate,
            PermStudentsRead, PermStudentsUpdate, PermTeachersCreate, PermTeachersRead,
            PermTeachersUpdate, RequirePermission,
        },
    },
    models::{
        education::{
            DietFilter, DietPayload, Enrollment, EnrollmentFilter, EnrollmentPayload,
            EnrollmentStats, FeedbackFilter, FeedbackPayload, MealFeedback, MenuFilter,
            MenuPayload, SchoolMenu, SpecialDiet, Student, StudentFilter, StudentPayload, Teacher,
            TeacherFilter, TeacherPayload, DIET_FIELDS, ENROLLMENT_FIELDS, FEEDBACK_FIELDS,
            MENU_FIELDS, STUDENT_FIELDS, TEACHER_FIELDS,
        },
        permissions::SystemModule,
    },
};

inventory::submit! { SystemModule::new("students", "Alunos") }
inventory::submit! { SystemModule::new("teachers", "Professores") }
inventory::submit! { SystemModule::new("enrollments", "Matrículas") }
inventory::submit! { SystemModule::new("school_meals", "Alimentação Escolar") }

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsQuery {
    /// Ano letivo; sem ele, todas as matrículas
    pub year: Option<i32>,
}

// =============================================================================
//  1. ALUNOS
// =============================================================================

// GET /api/students
#[utoipa::path(
    get,
    path = "/api/students",
    tag = "Educação",
    params(StudentFilter, PageParams),
    responses(
        (status = 200, description = "Alunos", body = Page<Student>),
        (status = 400, description = "Campo de ordenação inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_students(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermStudentsRead>,
    Query(filter): Query<StudentFilter>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .resolve(&STUDENT_FIELDS)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .education_service
        .list_students(&filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// GET /api/students/{id}
#[utoipa::path(
    get,
    path = "/api/students/{id}",
    tag = "Educação",
    params(("id" = Uuid, Path, description = "ID do aluno")),
    responses(
        (status = 200, description = "Aluno", body = Student),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_student(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermStudentsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .education_service
        .get_student(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

// POST /api/students
#[utoipa::path(
    post,
    path = "/api/students",
    tag = "Educação",
    request_body = StudentPayload,
    responses(
        (status = 201, description = "Aluno cadastrado", body = Student),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_student(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermStudentsCreate>,
    Json(payload): Json<StudentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .education_service
        .create_student(&mut *tx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(item)))
}

// PUT /api/students/{id}
#[utoipa::path(
    put,
    path = "/api/students/{id}",
    tag = "Educação",
    params(("id" = Uuid, Path, description = "ID do aluno")),
    request_body = StudentPayload,
    responses(
        (status = 200, description = "Atualizado", body = Student),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_student(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermStudentsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StudentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .education_service
        .update_student(&mut *tx, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

// =============================================================================
//  2. PROFESSORES
// =============================================================================

// GET /api/teachers
#[utoipa::path(
    get,
    path = "/api/teachers",
    tag = "Educação",
    params(TeacherFilter, PageParams),
    responses(
        (status = 200, description = "Professores", body = Page<Teacher>),
        (status = 400, description = "Campo de ordenação inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_teachers(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermTeachersRead>,
    Query(filter): Query<TeacherFilter>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .resolve(&TEACHER_FIELDS)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .education_service
        .list_teachers(&filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// GET /api/teachers/{id}
#[utoipa::path(
    get,
    path = "/api/teachers/{id}",
    tag = "Educação",
    params(("id" = Uuid, Path, description = "ID do professor")),
    responses(
        (status = 200, description = "Professor", body = Teacher),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_teacher(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermTeachersRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .education_service
        .get_teacher(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

// POST /api/teachers
#[utoipa::path(
    post,
    path = "/api/teachers",
    tag = "Educação",
    request_body = TeacherPayload,
    responses(
        (status = 201, description = "Professor cadastrado", body = Teacher),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_teacher(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermTeachersCreate>,
    Json(payload): Json<TeacherPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .education_service
        .create_teacher(&mut *tx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(item)))
}

// PUT /api/teachers/{id}
#[utoipa::path(
    put,
    path = "/api/teachers/{id}",
    tag = "Educação",
    params(("id" = Uuid, Path, description = "ID do professor")),
    request_body = TeacherPayload,
    responses(
        (status = 200, description = "Atualizado", body = Teacher),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_teacher(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermTeachersUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TeacherPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .education_service
        .update_teacher(&mut *tx, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

// =============================================================================
//  3. MATRÍCULAS
// =============================================================================

// GET /api/enrollments
#[utoipa::path(
    get,
    path = "/api/enrollments",
    tag = "Educação",
    params(EnrollmentFilter, PageParams),
    responses(
        (status = 200, description = "Matrículas", body = Page<Enrollment>),
        (status = 400, description = "Campo de ordenação inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_enrollments(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermEnrollmentsRead>,
    Query(filter): Query<EnrollmentFilter>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .resolve(&ENROLLMENT_FIELDS)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .education_service
        .list_enrollments(&filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// GET /api/enrollments/{id}
#[utoipa::path(
    get,
    path = "/api/enrollments/{id}",
    tag = "Educação",
    params(("id" = Uuid, Path, description = "ID da matrícula")),
    responses(
        (status = 200, description = "Matrícula", body = Enrollment),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_enrollment(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermEnrollmentsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .education_service
        .get_enrollment(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

// POST /api/enrollments
#[utoipa::path(
    post,
    path = "/api/enrollments",
    tag = "Educação",
    request_body = EnrollmentPayload,
    responses(
        (status = 201, description = "Matrícula registrada", body = Enrollment),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_enrollment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermEnrollmentsCreate>,
    Json(payload): Json<EnrollmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .education_service
        .create_enrollment(&mut *tx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(item)))
}

// PUT /api/enrollments/{id}
#[utoipa::path(
    put,
    path = "/api/enrollments/{id}",
    tag = "Educação",
    params(("id" = Uuid, Path, description = "ID da matrícula")),
    request_body = EnrollmentPayload,
    responses(
        (status = 200, description = "Atualizado", body = Enrollment),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_enrollment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermEnrollmentsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EnrollmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .education_service
        .update_enrollment(&mut *tx, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

// GET /api/enrollments/stats
#[utoipa::path(
    get,
    path = "/api/enrollments/stats",
    tag = "Educação",
    params(StatsQuery),
    responses(
        (status = 200, description = "Total e percentual por status", body = EnrollmentStats)
    ),
    security(("api_jwt" = []))
)]
pub async fn enrollment_stats(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermEnrollmentsRead>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = app_state
        .education_service
        .enrollment_stats(query.year)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(stats))
}

// =============================================================================
//  4. ALIMENTAÇÃO ESCOLAR
// =============================================================================

// GET /api/school-meals/diets
#[utoipa::path(
    get,
    path = "/api/school-meals/diets",
    tag = "Educação",
    params(DietFilter, PageParams),
    responses(
        (status = 200, description = "Dietas especiais", body = Page<SpecialDiet>),
        (status = 400, description = "Campo de ordenação inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_diets(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermSchoolMealsRead>,
    Query(filter): Query<DietFilter>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .resolve(&DIET_FIELDS)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .education_service
        .list_diets(&filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// GET /api/school-meals/diets/{id}
#[utoipa::path(
    get,
    path = "/api/school-meals/diets/{id}",
    tag = "Educação",
    params(("id" = Uuid, Path, description = "ID da dieta")),
    responses(
        (status = 200, description = "Dieta especial", body = SpecialDiet),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_diet(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermSchoolMealsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .education_service
        .get_diet(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

// POST /api/school-meals/diets
#[utoipa::path(
    post,
    path = "/api/school-meals/diets",
    tag = "Educação",
    request_body = DietPayload,
    responses(
        (status = 201, description = "Dieta registrada", body = SpecialDiet),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_diet(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermSchoolMealsCreate>,
    Json(payload): Json<DietPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .education_service
        .create_diet(&mut *tx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(item)))
}

// PUT /api/school-meals/diets/{id}
#[utoipa::path(
    put,
    path = "/api/school-meals/diets/{id}",
    tag = "Educação",
    params(("id" = Uuid, Path, description = "ID da dieta")),
    request_body = DietPayload,
    responses(
        (status = 200, description = "Atualizado", body = SpecialDiet),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_diet(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermSchoolMealsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DietPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .education_service
        .update_diet(&mut *tx, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

// GET /api/school-meals/menus
#[utoipa::path(
    get,
    path = "/api/school-meals/menus",
    tag = "Educação",
    params(MenuFilter, PageParams),
    responses(
        (status = 200, description = "Cardápios", body = Page<SchoolMenu>),
        (status = 400, description = "Campo de ordenação inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_menus(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermSchoolMealsRead>,
    Query(filter): Query<MenuFilter>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .resolve(&MENU_FIELDS)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .education_service
        .list_menus(&filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// GET /api/school-meals/menus/{id}
#[utoipa::path(
    get,
    path = "/api/school-meals/menus/{id}",
    tag = "Educação",
    params(("id" = Uuid, Path, description = "ID do cardápio")),
    responses(
        (status = 200, description = "Cardápio", body = SchoolMenu),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_menu(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermSchoolMealsRead>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .education_service
        .get_menu(id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

// POST /api/school-meals/menus
#[utoipa::path(
    post,
    path = "/api/school-meals/menus",
    tag = "Educação",
    request_body = MenuPayload,
    responses(
        (status = 201, description = "Cardápio criado", body = SchoolMenu),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_menu(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermSchoolMealsCreate>,
    Json(payload): Json<MenuPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .education_service
        .create_menu(&mut *tx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(item)))
}

// PUT /api/school-meals/menus/{id}
#[utoipa::path(
    put,
    path = "/api/school-meals/menus/{id}",
    tag = "Educação",
    params(("id" = Uuid, Path, description = "ID do cardápio")),
    request_body = MenuPayload,
    responses(
        (status = 200, description = "Atualizado", body = SchoolMenu),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_menu(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermSchoolMealsUpdate>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MenuPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .education_service
        .update_menu(&mut *tx, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(item))
}

// GET /api/school-meals/feedback
#[utoipa::path(
    get,
    path = "/api/school-meals/feedback",
    tag = "Educação",
    params(FeedbackFilter, PageParams),
    responses(
        (status = 200, description = "Avaliações das refeições", body = Page<MealFeedback>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_feedback(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermSchoolMealsRead>,
    Query(filter): Query<FeedbackFilter>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let page = params
        .resolve(&FEEDBACK_FIELDS)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state
        .education_service
        .list_feedback(&filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(result))
}

// POST /api/school-meals/feedback
#[utoipa::path(
    post,
    path = "/api/school-meals/feedback",
    tag = "Educação",
    request_body = FeedbackPayload,
    responses(
        (status = 201, description = "Avaliação registrada", body = MealFeedback),
        (status = 400, description = "Nota fora de 1 a 5")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_feedback(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermSchoolMealsCreate>,
    Json(payload): Json<FeedbackPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate_all()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut tx = begin_audited(&app_state, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let feedback = app_state
        .education_service
        .create_feedback(&mut *tx, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(feedback)))
}
