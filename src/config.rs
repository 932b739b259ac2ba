// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::{
        i18n::I18nStore,
        storage::{BlobStorage, LocalBlobStorage},
    },
    db::{
        ChatRepository, DashboardRepository, EducationRepository, HealthRepository,
        OuvidoriaRepository, PermissionsRepository, RequestRepository, UserRepository,
    },
    services::{
        auth::AuthService, chat_service::ChatService, dashboard_service::DashboardService,
        document_service::DocumentService, education_service::EducationService,
        health_service::HealthService, ouvidoria_service::OuvidoriaService,
        permission_service::PermissionService, request_service::RequestService,
    },
};

/// Variáveis de ambiente (com `.env` carregado pelo dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub storage_dir: String,
    pub fonts_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(value) => value
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: '{}'", value))?,
            Err(_) => 5,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections,
            storage_dir: env::var("STORAGE_DIR").unwrap_or_else(|_| "./storage".to_string()),
            fonts_dir: env::var("FONTS_DIR").unwrap_or_else(|_| "./fonts".to_string()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub i18n_store: Arc<I18nStore>,

    pub auth_service: AuthService,
    pub chat_service: ChatService,
    pub request_service: RequestService,
    pub permission_service: PermissionService,
    pub education_service: EducationService,
    pub ouvidoria_service: OuvidoriaService,
    pub health_service: HealthService,
    pub document_service: DocumentService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar no banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // O chat carrega as conversas na montagem do estado: migrações antes
        sqlx::migrate!()
            .run(&db_pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados")?;

        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        Self::with_pool(db_pool, config).await
    }

    /// Monta o gráfico de dependências sobre um pool já conectado e migrado.
    async fn with_pool(db_pool: PgPool, config: &Config) -> anyhow::Result<Self> {
        let storage: Arc<dyn BlobStorage> = Arc::new(LocalBlobStorage::new(&config.storage_dir));

        let user_repo = UserRepository::new(db_pool.clone());
        let permissions_repo = PermissionsRepository::new(db_pool.clone());
        let request_repo = RequestRepository::new(db_pool.clone());
        let chat_repo = ChatRepository::new(db_pool.clone());
        let education_repo = EducationRepository::new(db_pool.clone());
        let ouvidoria_repo = OuvidoriaRepository::new(db_pool.clone());
        let health_repo = HealthRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new(db_pool.clone());

        let auth_service =
            AuthService::new(user_repo.clone(), config.jwt_secret.clone(), db_pool.clone());
        let chat_service = ChatService::load(chat_repo)
            .await
            .context("Falha ao carregar as conversas do chat")?;
        let request_service = RequestService::new(request_repo.clone(), storage.clone());
        let permission_service = PermissionService::new(user_repo, permissions_repo);
        let education_service = EducationService::new(education_repo);
        let ouvidoria_service = OuvidoriaService::new(ouvidoria_repo);
        let health_service = HealthService::new(health_repo, storage);
        let document_service = DocumentService::new(request_repo, &config.fonts_dir);
        let dashboard_service = DashboardService::new(dashboard_repo);

        Ok(Self {
            db_pool,
            i18n_store: Arc::new(I18nStore::new()),
            auth_service,
            chat_service,
            request_service,
            permission_service,
            education_service,
            ouvidoria_service,
            health_service,
            document_service,
            dashboard_service,
        })
    }
}
