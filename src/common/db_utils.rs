use sqlx::{Postgres, Transaction};

use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;

// ---
// Helper de Auditoria: identifica o usuário para o banco
// ---
/// Abre uma transação e define `app.user_id` localmente, para que as colunas
/// `created_by` / `changed_by` / `author_id` sejam preenchidas pelo próprio banco.
/// O handler precisa chamar `commit()` no final.
pub(crate) async fn begin_audited(
    app_state: &AppState,
    user: &AuthenticatedUser,
) -> Result<Transaction<'static, Postgres>, AppError> {
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut tx = app_state.db_pool.begin().await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(user.0.id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
