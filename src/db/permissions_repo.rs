// src/db/permissions_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::permissions::{ModulePermission, RoleTemplate},
};

// Modelos de cargo (role_templates)
#[derive(Clone)]
pub struct PermissionsRepository {
    pool: PgPool,
}

impl PermissionsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_templates(&self) -> Result<Vec<RoleTemplate>, AppError> {
        let templates = sqlx::query_as::<_, RoleTemplate>(
            r#"
            SELECT id, name, description, permissions, created_at, updated_at
            FROM role_templates
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(templates)
    }

    pub async fn find_template<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<RoleTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, RoleTemplate>(
            r#"
            SELECT id, name, description, permissions, created_at, updated_at
            FROM role_templates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(template)
    }

    pub async fn create_template<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        permissions: &[ModulePermission],
    ) -> Result<RoleTemplate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RoleTemplate>(
            r#"
            INSERT INTO role_templates (name, description, permissions)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, permissions, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(Json(permissions))
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, format!("Modelo '{}'", name)))
    }

    pub async fn update_template<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        permissions: &[ModulePermission],
    ) -> Result<Option<RoleTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RoleTemplate>(
            r#"
            UPDATE role_templates
            SET name = $2, description = $3, permissions = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, permissions, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(Json(permissions))
        .fetch_optional(executor)
        .await
        .map_err(|e| map_unique_violation(e, format!("Modelo '{}'", name)))
    }

    /// Retorna `false` se o modelo não existia.
    pub async fn delete_template<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM role_templates WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
