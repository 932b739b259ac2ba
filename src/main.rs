// src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::common::storage::MAX_UPLOAD_BYTES;
use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

// Folga para os cabeçalhos e campos de texto do multipart
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG sobrescreve o nível padrão
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let chat_routes = Router::new()
        .route(
            "/conversations",
            get(handlers::chat::list_conversations).post(handlers::chat::create_conversation),
        )
        .route("/conversations/active", get(handlers::chat::get_active_conversation))
        .route("/conversations/{id}", get(handlers::chat::get_conversation))
        .route("/conversations/{id}/select", post(handlers::chat::select_conversation))
        .route(
            "/conversations/{id}/messages",
            get(handlers::chat::list_messages).post(handlers::chat::send_message),
        )
        .route("/conversations/{id}/close", post(handlers::chat::close_conversation))
        .route("/conversations/{id}/tags", post(handlers::chat::add_tag))
        .route("/conversations/{id}/protocol", post(handlers::chat::link_protocol));

    let request_routes = Router::new()
        .route(
            "/",
            get(handlers::requests::list_requests).post(handlers::requests::create_request),
        )
        .route("/protocol/{protocol}", get(handlers::requests::get_by_protocol))
        .route("/{id}", get(handlers::requests::get_request))
        .route("/{id}/status", patch(handlers::requests::update_status))
        .route("/{id}/forward", post(handlers::requests::forward_request))
        .route("/{id}/comments", post(handlers::requests::add_comment))
        .route(
            "/{id}/attachments",
            post(handlers::requests::upload_attachment)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/{id}/attachments/{attachment_id}",
            get(handlers::requests::download_attachment),
        )
        .route("/{id}/receipt", get(handlers::requests::get_receipt));

    let permission_routes = Router::new()
        .route("/modules", get(handlers::permissions::list_modules))
        .route("/users", get(handlers::permissions::list_users))
        .route(
            "/users/{id}",
            get(handlers::permissions::get_user).put(handlers::permissions::update_user),
        )
        .route("/users/{id}/flags", patch(handlers::permissions::set_permission_flag))
        .route(
            "/users/{id}/permissions",
            put(handlers::permissions::replace_permissions),
        )
        .route("/users/{id}/apply-template", post(handlers::permissions::apply_template))
        .route(
            "/templates",
            get(handlers::permissions::list_templates).post(handlers::permissions::create_template),
        )
        .route(
            "/templates/{id}",
            put(handlers::permissions::update_template)
                .delete(handlers::permissions::delete_template),
        );

    let education_routes = Router::new()
        .route(
            "/students",
            get(handlers::education::list_students).post(handlers::education::create_student),
        )
        .route(
            "/students/{id}",
            get(handlers::education::get_student).put(handlers::education::update_student),
        )
        .route(
            "/teachers",
            get(handlers::education::list_teachers).post(handlers::education::create_teacher),
        )
        .route(
            "/teachers/{id}",
            get(handlers::education::get_teacher).put(handlers::education::update_teacher),
        )
        .route(
            "/enrollments",
            get(handlers::education::list_enrollments)
                .post(handlers::education::create_enrollment),
        )
        .route("/enrollments/stats", get(handlers::education::enrollment_stats))
        .route(
            "/enrollments/{id}",
            get(handlers::education::get_enrollment).put(handlers::education::update_enrollment),
        )
        .route(
            "/school-meals/diets",
            get(handlers::education::list_diets).post(handlers::education::create_diet),
        )
        .route(
            "/school-meals/diets/{id}",
            get(handlers::education::get_diet).put(handlers::education::update_diet),
        )
        .route(
            "/school-meals/menus",
            get(handlers::education::list_menus).post(handlers::education::create_menu),
        )
        .route(
            "/school-meals/menus/{id}",
            get(handlers::education::get_menu).put(handlers::education::update_menu),
        )
        .route(
            "/school-meals/feedback",
            get(handlers::education::list_feedback).post(handlers::education::create_feedback),
        );

    let ouvidoria_routes = Router::new()
        .route(
            "/",
            get(handlers::ouvidoria::list_cases).post(handlers::ouvidoria::create_case),
        )
        .route("/{id}", get(handlers::ouvidoria::get_case))
        .route("/{id}/status", patch(handlers::ouvidoria::update_case_status))
        .route("/{id}/respond", post(handlers::ouvidoria::respond_case))
        .route("/{id}/department", patch(handlers::ouvidoria::assign_department));

    let tfd_routes = Router::new()
        .route(
            "/",
            get(handlers::health::list_referrals).post(handlers::health::create_referral),
        )
        .route(
            "/{id}",
            get(handlers::health::get_referral).put(handlers::health::update_referral),
        )
        .route("/{id}/status", patch(handlers::health::update_referral_status))
        .route("/{id}/transport", post(handlers::health::assign_transport))
        .route(
            "/{id}/documents",
            post(handlers::health::upload_document).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/{id}/documents/{document_id}",
            get(handlers::health::download_document),
        );

    let program_routes = Router::new()
        .route(
            "/",
            get(handlers::health::list_programs).post(handlers::health::create_program),
        )
        .route(
            "/{id}",
            get(handlers::health::get_program).put(handlers::health::update_program),
        );

    // Tudo abaixo exige o Bearer token; as permissões são checadas em cada handler
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::get_me))
        .route("/dashboard/summary", get(handlers::dashboard::get_summary))
        .nest("/chat", chat_routes)
        .nest("/requests", request_routes)
        .nest("/permissions", permission_routes)
        .merge(education_routes)
        .nest("/ouvidoria", ouvidoria_routes)
        .nest("/tfd", tfd_routes)
        .nest("/health-programs", program_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
