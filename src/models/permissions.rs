// src/models/permissions.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// ---
// Registro dos módulos do sistema
// ---
// Cada handler registra o seu módulo com `inventory::submit!`; a tela de
// permissões lista o que estiver registrado.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemModule {
    #[schema(value_type = String, example = "requests")]
    pub id: &'static str,
    #[schema(value_type = String, example = "Solicitações")]
    pub name: &'static str,
}

impl SystemModule {
    pub const fn new(id: &'static str, name: &'static str) -> Self {
        Self { id, name }
    }
}

inventory::collect!(SystemModule);

pub const PERMISSIONS_MODULE: &str = "permissions";

pub fn system_modules() -> Vec<&'static SystemModule> {
    let mut modules: Vec<_> = inventory::iter::<SystemModule>.into_iter().collect();
    modules.sort_by_key(|m| m.id);
    modules
}

pub fn is_known_module(module_id: &str) -> bool {
    inventory::iter::<SystemModule>
        .into_iter()
        .any(|m| m.id == module_id)
}

// ---
// Permissões CRUD por módulo
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CrudAction {
    Create,
    Read,
    Update,
    Delete,
}

impl CrudAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudAction::Create => "create",
            CrudAction::Read => "read",
            CrudAction::Update => "update",
            CrudAction::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModulePermission {
    #[schema(example = "requests")]
    pub module_id: String,
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

impl ModulePermission {
    pub fn empty(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            create: false,
            read: false,
            update: false,
            delete: false,
        }
    }

    pub fn full(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            create: true,
            read: true,
            update: true,
            delete: true,
        }
    }

    pub fn allows(&self, action: CrudAction) -> bool {
        match action {
            CrudAction::Create => self.create,
            CrudAction::Read => self.read,
            CrudAction::Update => self.update,
            CrudAction::Delete => self.delete,
        }
    }

    fn set(&mut self, action: CrudAction, value: bool) {
        match action {
            CrudAction::Create => self.create = value,
            CrudAction::Read => self.read = value,
            CrudAction::Update => self.update = value,
            CrudAction::Delete => self.delete = value,
        }
    }
}

/// Altera uma flag. Se o módulo ainda não estiver na lista, insere um registro novo
/// com apenas a flag editada definida (as outras ficam `false`).
pub fn set_permission_flag(
    permissions: &mut Vec<ModulePermission>,
    module_id: &str,
    action: CrudAction,
    value: bool,
) {
    match permissions.iter_mut().find(|p| p.module_id == module_id) {
        Some(existing) => existing.set(action, value),
        None => {
            let mut inserted = ModulePermission::empty(module_id);
            inserted.set(action, value);
            permissions.push(inserted);
        }
    }
}

/// Aplicar um modelo de cargo sobrescreve a lista inteira (sem mesclar).
pub fn apply_template(template: &RoleTemplate) -> Vec<ModulePermission> {
    template.permissions.0.clone()
}

/// Garante que todos os módulos citados existem e que cada um aparece uma única vez.
pub fn validate_modules(permissions: &[ModulePermission]) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(permissions.len());
    for permission in permissions {
        if !is_known_module(&permission.module_id) {
            return Err(AppError::UnknownModule(permission.module_id.clone()));
        }
        if !seen.insert(permission.module_id.as_str()) {
            return Err(AppError::DuplicateModule(permission.module_id.clone()));
        }
    }
    Ok(())
}

// ---
// Modelos de cargo
// ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleTemplate {
    pub id: Uuid,
    #[schema(example = "Secretaria de Educação")]
    pub name: String,
    #[schema(example = "Acesso completo aos módulos de educação")]
    pub description: Option<String>,
    #[schema(value_type = Vec<ModulePermission>)]
    pub permissions: Json<Vec<ModulePermission>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleTemplatePayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Atendimento")]
    pub name: String,

    #[schema(example = "Pode responder chats e abrir solicitações")]
    pub description: Option<String>,

    #[schema(example = json!([{"moduleId": "chat", "create": true, "read": true, "update": true, "delete": false}]))]
    pub permissions: Vec<ModulePermission>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetPermissionFlagPayload {
    #[schema(example = "enrollments")]
    pub module_id: String,
    pub action: CrudAction,
    pub value: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplacePermissionsPayload {
    pub permissions: Vec<ModulePermission>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyTemplatePayload {
    pub template_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdminUserPayload {
    #[validate(length(min = 1, message = "required"))]
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub role: Option<crate::models::auth::AdminRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(perms: Vec<ModulePermission>) -> RoleTemplate {
        RoleTemplate {
            id: Uuid::new_v4(),
            name: "Educação".into(),
            description: None,
            permissions: Json(perms),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn editing_absent_module_inserts_exactly_one_record_with_only_that_flag() {
        for action in [CrudAction::Create, CrudAction::Read, CrudAction::Update, CrudAction::Delete] {
            let mut perms = vec![ModulePermission::full("chat")];
            set_permission_flag(&mut perms, "students", action, true);

            assert_eq!(perms.len(), 2);
            let inserted = perms.iter().find(|p| p.module_id == "students").unwrap();
            for other in [CrudAction::Create, CrudAction::Read, CrudAction::Update, CrudAction::Delete] {
                assert_eq!(inserted.allows(other), other == action, "{:?} / {:?}", action, other);
            }
        }
    }

    #[test]
    fn editing_existing_module_only_touches_that_flag() {
        let mut perms = vec![ModulePermission::full("chat")];
        set_permission_flag(&mut perms, "chat", CrudAction::Delete, false);

        assert_eq!(perms.len(), 1);
        assert_eq!(
            perms[0],
            ModulePermission { delete: false, ..ModulePermission::full("chat") }
        );
    }

    #[test]
    fn applying_template_replaces_everything() {
        let tpl = template(vec![ModulePermission::full("students"), ModulePermission::empty("teachers")]);
        let mut current = vec![ModulePermission::full("chat"), ModulePermission::full("requests")];

        current = apply_template(&tpl);

        assert_eq!(current, tpl.permissions.0);
        assert!(current.iter().all(|p| p.module_id != "chat"));
    }

    #[test]
    fn permission_json_uses_camel_case() {
        let json = serde_json::to_value(ModulePermission::empty("tfd")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"moduleId": "tfd", "create": false, "read": false, "update": false, "delete": false})
        );
    }

    #[test]
    fn registry_contains_handler_modules() {
        let ids: Vec<_> = system_modules().iter().map(|m| m.id).collect();
        for expected in ["chat", "requests", "permissions", "students", "ouvidoria", "tfd"] {
            assert!(ids.contains(&expected), "{} ausente", expected);
        }
        assert!(validate_modules(&[ModulePermission::empty("modulo_inexistente")]).is_err());
        assert!(validate_modules(&[ModulePermission::empty("chat")]).is_ok());
    }

    #[test]
    fn repeated_module_is_rejected() {
        let result = validate_modules(&[ModulePermission::empty("chat"), ModulePermission::full("chat")]);
        assert!(matches!(result, Err(AppError::DuplicateModule(ref m)) if m == "chat"));

        let distinct = [ModulePermission::empty("chat"), ModulePermission::full("requests")];
        assert!(validate_modules(&distinct).is_ok());
    }
}
