// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::{
        auth::{AdminRole, AdminUser, Claims, RegisterUserPayload},
        permissions::{system_modules, ModulePermission},
    },
};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, pool: PgPool) -> Self {
        Self {
            user_repo,
            jwt_secret,
            pool,
        }
    }

    /// O primeiro cadastro vira prefeito com acesso total a todos os módulos;
    /// os seguintes entram como `admin` sem permissões até alguém liberar.
    pub async fn register_user(&self, payload: &RegisterUserPayload) -> Result<String, AppError> {
        // Hashing fora da transação: não toca no banco
        let password = payload.password.clone();
        let hashed_password =
            tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let mut tx = self.pool.begin().await?;
        self.user_repo.lock_registration(&mut *tx).await?;

        let is_first = self.user_repo.count(&mut *tx).await? == 0;
        let (role, permissions) = if is_first {
            let all: Vec<ModulePermission> = system_modules()
                .into_iter()
                .map(|m| ModulePermission::full(m.id))
                .collect();
            (AdminRole::Prefeito, all)
        } else {
            (AdminRole::Admin, Vec::new())
        };

        let new_user = self
            .user_repo
            .create_user(
                &mut *tx,
                payload.email.trim(),
                &hashed_password,
                payload.full_name.trim(),
                role,
                payload.department.as_deref().map(str::trim),
                &permissions,
            )
            .await?;

        tx.commit().await?;

        if is_first {
            tracing::info!("👑 Primeiro usuário cadastrado como prefeito: {}", new_user.email);
        } else {
            tracing::info!("Novo usuário cadastrado: {}", new_user.email);
        }

        self.create_token(new_user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_owned();
        let password_hash = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password, &password_hash))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<AdminUser, AppError> {
        let claims = decode_token(token, &self.jwt_secret)?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        encode_token(user_id, &self.jwt_secret)
    }
}

fn encode_token(user_id: Uuid, secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_subject() {
        let id = Uuid::new_v4();
        let token = encode_token(id, "segredo").unwrap();
        let claims = decode_token(&token, "segredo").unwrap();
        assert_eq!(claims.sub, id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = encode_token(Uuid::new_v4(), "segredo").unwrap();
        assert!(matches!(
            decode_token(&token, "outro"),
            Err(AppError::InvalidToken)
        ));
    }
}
