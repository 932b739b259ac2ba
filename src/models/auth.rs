// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::permissions::{CrudAction, ModulePermission, PERMISSIONS_MODULE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "admin_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    Admin,
    Prefeito,
}

// Representa um usuário administrativo vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Uuid,
    #[schema(example = "secretaria.obras@prefeitura.gov.br")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    #[schema(example = "Maria Souza")]
    pub full_name: String,
    pub role: AdminRole,
    #[schema(example = "Obras")]
    pub department: Option<String>,

    #[schema(value_type = Vec<ModulePermission>)]
    pub permissions: Json<Vec<ModulePermission>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdminUser {
    /// O prefeito enxerga todos os módulos e administra as permissões da equipe;
    /// qualquer outra ação depende das flags.
    pub fn can(&self, module_id: &str, action: CrudAction) -> bool {
        if self.role == AdminRole::Prefeito
            && (action == CrudAction::Read || module_id == PERMISSIONS_MODULE)
        {
            return true;
        }
        self.permissions
            .iter()
            .find(|p| p.module_id == module_id)
            .is_some_and(|p| p.allows(action))
    }
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 6, message = "min_6_chars"))]
    pub password: String,
    #[validate(length(min = 1, message = "required"))]
    pub full_name: String,
    pub department: Option<String>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 6, message = "min_6_chars"))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

#[cfg(test)]
pub(crate) fn test_user(role: AdminRole, permissions: Vec<ModulePermission>) -> AdminUser {
    AdminUser {
        id: Uuid::new_v4(),
        email: "teste@prefeitura.gov.br".into(),
        password_hash: String::new(),
        full_name: "Usuário de Teste".into(),
        role,
        department: Some("Obras".into()),
        permissions: Json(permissions),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefeito_reads_everything_but_writes_need_flags() {
        let user = test_user(AdminRole::Prefeito, vec![]);
        assert!(user.can("requests", CrudAction::Read));
        assert!(!user.can("requests", CrudAction::Update));
        assert!(user.can(PERMISSIONS_MODULE, CrudAction::Update));
    }

    #[test]
    fn admin_needs_explicit_flag() {
        let mut perm = ModulePermission::empty("requests");
        perm.update = true;
        let user = test_user(AdminRole::Admin, vec![perm]);
        assert!(user.can("requests", CrudAction::Update));
        assert!(!user.can("requests", CrudAction::Read));
        assert!(!user.can("chat", CrudAction::Update));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = test_user(AdminRole::Admin, vec![]);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["fullName"], "Usuário de Teste");
        assert!(json["permissions"].is_array());
    }
}
