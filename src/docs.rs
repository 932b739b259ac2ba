// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::common;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "Prefeitura - Painel Administrativo"),
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Dashboard ---
        handlers::dashboard::get_summary,

        // --- Chat ---
        handlers::chat::list_conversations,
        handlers::chat::create_conversation,
        handlers::chat::get_active_conversation,
        handlers::chat::get_conversation,
        handlers::chat::select_conversation,
        handlers::chat::list_messages,
        handlers::chat::send_message,
        handlers::chat::close_conversation,
        handlers::chat::add_tag,
        handlers::chat::link_protocol,

        // --- Solicitações ---
        handlers::requests::list_requests,
        handlers::requests::create_request,
        handlers::requests::get_request,
        handlers::requests::get_by_protocol,
        handlers::requests::update_status,
        handlers::requests::forward_request,
        handlers::requests::add_comment,
        handlers::requests::upload_attachment,
        handlers::requests::download_attachment,
        handlers::requests::get_receipt,

        // --- Permissões ---
        handlers::permissions::list_modules,
        handlers::permissions::list_users,
        handlers::permissions::get_user,
        handlers::permissions::update_user,
        handlers::permissions::set_permission_flag,
        handlers::permissions::replace_permissions,
        handlers::permissions::apply_template,
        handlers::permissions::list_templates,
        handlers::permissions::create_template,
        handlers::permissions::update_template,
        handlers::permissions::delete_template,

        // --- Educação ---
        handlers::education::list_students,
        handlers::education::get_student,
        handlers::education::create_student,
        handlers::education::update_student,
        handlers::education::list_teachers,
        handlers::education::get_teacher,
        handlers::education::create_teacher,
        handlers::education::update_teacher,
        handlers::education::list_enrollments,
        handlers::education::get_enrollment,
        handlers::education::create_enrollment,
        handlers::education::update_enrollment,
        handlers::education::enrollment_stats,
        handlers::education::list_diets,
        handlers::education::get_diet,
        handlers::education::create_diet,
        handlers::education::update_diet,
        handlers::education::list_menus,
        handlers::education::get_menu,
        handlers::education::create_menu,
        handlers::education::update_menu,
        handlers::education::list_feedback,
        handlers::education::create_feedback,

        // --- Ouvidoria ---
        handlers::ouvidoria::list_cases,
        handlers::ouvidoria::create_case,
        handlers::ouvidoria::get_case,
        handlers::ouvidoria::update_case_status,
        handlers::ouvidoria::respond_case,
        handlers::ouvidoria::assign_department,

        // --- Saúde ---
        handlers::health::list_referrals,
        handlers::health::create_referral,
        handlers::health::get_referral,
        handlers::health::update_referral,
        handlers::health::update_referral_status,
        handlers::health::assign_transport,
        handlers::health::upload_document,
        handlers::health::download_document,
        handlers::health::list_programs,
        handlers::health::get_program,
        handlers::health::create_program,
        handlers::health::update_program,
    ),
    components(
        schemas(
            common::pagination::SortDir,
            handlers::UploadForm,

            // --- Auth ---
            models::auth::AdminRole,
            models::auth::AdminUser,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Permissões ---
            models::permissions::SystemModule,
            models::permissions::CrudAction,
            models::permissions::ModulePermission,
            models::permissions::RoleTemplate,
            models::permissions::RoleTemplatePayload,
            models::permissions::SetPermissionFlagPayload,
            models::permissions::ReplacePermissionsPayload,
            models::permissions::ApplyTemplatePayload,
            models::permissions::UpdateAdminUserPayload,

            // --- Solicitações ---
            models::requests::RequestStatus,
            models::requests::RequestPriority,
            models::requests::RequesterType,
            models::requests::RequestAction,
            models::requests::UnifiedRequest,
            models::requests::RequestComment,
            models::requests::RequestAttachment,
            models::requests::StatusHistoryEntry,
            models::requests::RequestListItem,
            models::requests::RequestDetail,
            models::requests::CreateRequestPayload,
            models::requests::UpdateStatusPayload,
            models::requests::ForwardRequestPayload,
            models::requests::AddCommentPayload,

            // --- Chat ---
            models::chat::ConversationType,
            models::chat::ConversationStatus,
            models::chat::Conversation,
            models::chat::MessageAttachment,
            models::chat::Reaction,
            models::chat::Message,
            models::chat::CreateConversationPayload,
            models::chat::SendMessagePayload,
            models::chat::AddTagPayload,
            models::chat::LinkProtocolPayload,

            // --- Educação ---
            models::education::StudentStatus,
            models::education::TeacherStatus,
            models::education::EnrollmentStatus,
            models::education::MealType,
            models::education::Student,
            models::education::StudentPayload,
            models::education::Teacher,
            models::education::TeacherPayload,
            models::education::Enrollment,
            models::education::EnrollmentPayload,
            models::education::StatusCount,
            models::education::EnrollmentStats,
            models::education::SpecialDiet,
            models::education::DietPayload,
            models::education::SchoolMenu,
            models::education::MenuPayload,
            models::education::MealFeedback,
            models::education::FeedbackPayload,

            // --- Ouvidoria ---
            models::ouvidoria::OuvidoriaKind,
            models::ouvidoria::OuvidoriaStatus,
            models::ouvidoria::OuvidoriaCase,
            models::ouvidoria::OuvidoriaUpdate,
            models::ouvidoria::CaseListItem,
            models::ouvidoria::CaseDetail,
            models::ouvidoria::CreateCasePayload,
            models::ouvidoria::UpdateCaseStatusPayload,
            models::ouvidoria::RespondCasePayload,
            models::ouvidoria::AssignDepartmentPayload,

            // --- Saúde ---
            models::health::TfdStatus,
            models::health::TfdReferral,
            models::health::TfdDocument,
            models::health::TfdDetail,
            models::health::TfdPayload,
            models::health::UpdateTfdStatusPayload,
            models::health::AssignTransportPayload,
            models::health::ProgramStatus,
            models::health::HealthProgram,
            models::health::ProgramPayload,

            // --- Dashboard ---
            models::dashboard::RequestStatusCount,
            models::dashboard::DashboardSummary,
        )
    ),
    tags(
        (name = "Autenticação", description = "Cadastro, login e usuário logado"),
        (name = "Dashboard", description = "Contadores do painel inicial"),
        (name = "Chat", description = "Atendimento ao cidadão e conversas internas"),
        (name = "Solicitações", description = "Protocolos unificados entre departamentos"),
        (name = "Permissões", description = "Permissões CRUD por módulo e modelos de cargo"),
        (name = "Educação", description = "Alunos, professores, matrículas e alimentação escolar"),
        (name = "Ouvidoria", description = "Manifestações do cidadão e prazos de resposta"),
        (name = "Saúde", description = "TFD e programas de saúde")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_routes_with_jwt() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/requests/{id}/forward"));
        assert!(doc.paths.paths.contains_key("/api/ouvidoria/{id}/respond"));
        assert!(doc.paths.paths.contains_key("/api/permissions/users/{id}/flags"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
        assert!(components.schemas.contains_key("CreateRequestPayload"));
    }
}
