// src/db/user_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::{AdminRole, AdminUser},
        permissions::ModulePermission,
    },
};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, department, permissions, created_at, updated_at";

// O repositório de usuários administrativos (tabela 'admin_users')
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail
    pub async fn find_by_email(&self, email: &str) -> Result<Option<AdminUser>, AppError> {
        let maybe_user = sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {} FROM admin_users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    // Busca um usuário pelo seu ID (usado a cada requisição autenticada)
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AdminUser>, AppError> {
        let maybe_user = sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {} FROM admin_users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    /// Serializa cadastros concorrentes até o fim da transação.
    pub async fn lock_registration<'e, E>(&self, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext('admin_users_registration'))")
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn count<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    pub async fn list<'e, E>(&self, executor: E) -> Result<Vec<AdminUser>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let users = sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {} FROM admin_users ORDER BY full_name ASC",
            USER_COLUMNS
        ))
        .fetch_all(executor)
        .await?;
        Ok(users)
    }

    // Cria um novo usuário. E-mail duplicado vira `EmailAlreadyExists`.
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        password_hash: &str,
        full_name: &str,
        role: AdminRole,
        department: Option<&str>,
        permissions: &[ModulePermission],
    ) -> Result<AdminUser, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, AdminUser>(&format!(
            r#"
            INSERT INTO admin_users (email, password_hash, full_name, role, department, permissions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(role)
        .bind(department)
        .bind(Json(permissions))
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::EmailAlreadyExists;
                }
            }
            e.into()
        })?;

        Ok(user)
    }

    pub async fn update_profile<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        full_name: Option<&str>,
        department: Option<&str>,
        role: Option<AdminRole>,
    ) -> Result<Option<AdminUser>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, AdminUser>(&format!(
            r#"
            UPDATE admin_users
            SET full_name = COALESCE($2, full_name),
                department = COALESCE($3, department),
                role = COALESCE($4, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(full_name)
        .bind(department)
        .bind(role)
        .fetch_optional(executor)
        .await?;
        Ok(user)
    }

    /// Grava a lista de permissões inteira (a edição é feita em memória pelo serviço).
    pub async fn save_permissions<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        permissions: &[ModulePermission],
    ) -> Result<Option<AdminUser>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, AdminUser>(&format!(
            r#"
            UPDATE admin_users
            SET permissions = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(Json(permissions))
        .fetch_optional(executor)
        .await?;
        Ok(user)
    }

    /// Lê o usuário travando a linha, para editar permissões sem corrida.
    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<AdminUser>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, AdminUser>(&format!(
            "SELECT {} FROM admin_users WHERE id = $1 FOR UPDATE",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(user)
    }
}
