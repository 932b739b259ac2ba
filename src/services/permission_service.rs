// src/services/permission_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{PermissionsRepository, UserRepository},
    models::{
        auth::{AdminRole, AdminUser},
        permissions::{
            apply_template, set_permission_flag, validate_modules, CrudAction, ModulePermission,
            RoleTemplate, RoleTemplatePayload, UpdateAdminUserPayload,
        },
    },
};

#[derive(Clone)]
pub struct PermissionService {
    users: UserRepository,
    templates: PermissionsRepository,
}

impl PermissionService {
    pub fn new(users: UserRepository, templates: PermissionsRepository) -> Self {
        Self { users, templates }
    }

    // =========================================================================
    //  USUÁRIOS
    // =========================================================================

    pub async fn list_users<'e, E>(&self, executor: E) -> Result<Vec<AdminUser>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.users.list(executor).await
    }

    pub async fn get_user(&self, id: Uuid) -> Result<AdminUser, AppError> {
        self.users.find_by_id(id).await?.ok_or(AppError::UserNotFound)
    }

    /// Só o prefeito promove alguém a prefeito.
    pub async fn update_user<'e, E>(
        &self,
        executor: E,
        actor: &AdminUser,
        id: Uuid,
        payload: &UpdateAdminUserPayload,
    ) -> Result<AdminUser, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if payload.role == Some(AdminRole::Prefeito) && actor.role != AdminRole::Prefeito {
            return Err(AppError::Forbidden("permissions:update_role".into()));
        }

        self.users
            .update_profile(
                executor,
                id,
                payload.full_name.as_deref().map(str::trim),
                payload.department.as_deref().map(str::trim),
                payload.role,
            )
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// Liga/desliga uma flag de um módulo. O registro do módulo é criado se não existir.
    pub async fn set_permission_flag<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        module_id: &str,
        action: CrudAction,
        value: bool,
    ) -> Result<AdminUser, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        validate_modules(&[ModulePermission::empty(module_id)])?;

        let mut tx = executor.begin().await?;
        let user = self
            .users
            .find_for_update(&mut *tx, user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let mut permissions = user.permissions.0;
        set_permission_flag(&mut permissions, module_id, action, value);

        let updated = self
            .users
            .save_permissions(&mut *tx, user_id, &permissions)
            .await?
            .ok_or(AppError::UserNotFound)?;
        tx.commit().await?;

        tracing::info!(
            "Permissão {}:{} = {} para {}",
            module_id,
            action.as_str(),
            value,
            updated.email
        );
        Ok(updated)
    }

    /// Substitui a lista inteira de permissões.
    pub async fn replace_permissions<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        permissions: &[ModulePermission],
    ) -> Result<AdminUser, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        validate_modules(permissions)?;
        self.users
            .save_permissions(executor, user_id, permissions)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    /// Copia as permissões do modelo para o usuário, sobrescrevendo as atuais.
    pub async fn apply_template<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        template_id: Uuid,
    ) -> Result<AdminUser, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let template = self
            .templates
            .find_template(&mut *tx, template_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Modelo {}", template_id)))?;

        let permissions = apply_template(&template);
        let updated = self
            .users
            .save_permissions(&mut *tx, user_id, &permissions)
            .await?
            .ok_or(AppError::UserNotFound)?;
        tx.commit().await?;

        tracing::info!("Modelo '{}' aplicado a {}", template.name, updated.email);
        Ok(updated)
    }

    // =========================================================================
    //  MODELOS DE CARGO
    // =========================================================================

    pub async fn list_templates(&self) -> Result<Vec<RoleTemplate>, AppError> {
        self.templates.list_templates().await
    }

    pub async fn create_template<'e, E>(
        &self,
        executor: E,
        payload: &RoleTemplatePayload,
    ) -> Result<RoleTemplate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        validate_modules(&payload.permissions)?;
        self.templates
            .create_template(
                executor,
                payload.name.trim(),
                payload.description.as_deref(),
                &payload.permissions,
            )
            .await
    }

    pub async fn update_template<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &RoleTemplatePayload,
    ) -> Result<RoleTemplate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        validate_modules(&payload.permissions)?;
        self.templates
            .update_template(
                executor,
                id,
                payload.name.trim(),
                payload.description.as_deref(),
                &payload.permissions,
            )
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Modelo {}", id)))
    }

    pub async fn delete_template<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.templates.delete_template(executor, id).await? {
            return Err(AppError::ResourceNotFound(format!("Modelo {}", id)));
        }
        Ok(())
    }
}
