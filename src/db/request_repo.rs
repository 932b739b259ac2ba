// src/db/request_repo.rs

use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
    },
    db::{fetch_page, search_pattern},
    models::requests::{
        RequestAttachment, RequestComment, RequestFilter, RequestPriority, RequestStatus,
        RequesterType, StatusHistoryEntry, UnifiedRequest,
    },
};

const REQUEST_COLUMNS: &str = "id, protocol_number, title, description, requester_type, requester_id, requester_name, target_department, priority, status, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list(
        &self,
        filter: &RequestFilter,
        page: &PageRequest,
    ) -> Result<Page<UnifiedRequest>, AppError> {
        let search = search_pattern(filter.search.as_deref());

        fetch_page(
            &self.pool,
            "unified_requests",
            |qb: &mut QueryBuilder<'static, Postgres>| {
                if let Some(status) = filter.status {
                    qb.push(" AND status = ").push_bind(status);
                }
                if let Some(requester_type) = filter.requester_type {
                    qb.push(" AND requester_type = ").push_bind(requester_type);
                }
                if let Some(priority) = filter.priority {
                    qb.push(" AND priority = ").push_bind(priority);
                }
                if let Some(department) = filter.department.clone() {
                    qb.push(" AND target_department = ").push_bind(department);
                }
                if let Some(pattern) = search.clone() {
                    qb.push(" AND (protocol_number ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR title ILIKE ")
                        .push_bind(pattern.clone())
                        .push(" OR description ILIKE ")
                        .push_bind(pattern)
                        .push(")");
                }
            },
            page,
        )
        .await
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<UnifiedRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, UnifiedRequest>(&format!(
            "SELECT {} FROM unified_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(request)
    }

    pub async fn find_by_protocol(&self, protocol_number: &str) -> Result<Option<UnifiedRequest>, AppError> {
        let request = sqlx::query_as::<_, UnifiedRequest>(&format!(
            "SELECT {} FROM unified_requests WHERE protocol_number = $1",
            REQUEST_COLUMNS
        ))
        .bind(protocol_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    /// Trava a linha até o fim da transação (troca de status / encaminhamento).
    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<UnifiedRequest>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, UnifiedRequest>(&format!(
            "SELECT {} FROM unified_requests WHERE id = $1 FOR UPDATE",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(request)
    }

    pub async fn list_comments(&self, request_id: Uuid) -> Result<Vec<RequestComment>, AppError> {
        let comments = sqlx::query_as::<_, RequestComment>(
            r#"
            SELECT id, request_id, author_id, author_name, text, is_forward, created_at
            FROM request_comments
            WHERE request_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    pub async fn list_attachments(&self, request_id: Uuid) -> Result<Vec<RequestAttachment>, AppError> {
        let attachments = sqlx::query_as::<_, RequestAttachment>(
            r#"
            SELECT id, request_id, file_name, content_type, size_bytes, storage_path, uploaded_by, created_at
            FROM request_attachments
            WHERE request_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attachments)
    }

    pub async fn find_attachment(
        &self,
        request_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<Option<RequestAttachment>, AppError> {
        let attachment = sqlx::query_as::<_, RequestAttachment>(
            r#"
            SELECT id, request_id, file_name, content_type, size_bytes, storage_path, uploaded_by, created_at
            FROM request_attachments
            WHERE request_id = $1 AND id = $2
            "#,
        )
        .bind(request_id)
        .bind(attachment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attachment)
    }

    pub async fn list_history(&self, request_id: Uuid) -> Result<Vec<StatusHistoryEntry>, AppError> {
        let history = sqlx::query_as::<_, StatusHistoryEntry>(
            r#"
            SELECT id, request_id, from_status, to_status, changed_by, note, created_at
            FROM request_status_history
            WHERE request_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(history)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn next_protocol_seq<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let seq: i64 = sqlx::query_scalar("SELECT nextval('request_protocol_seq')")
            .fetch_one(executor)
            .await?;
        Ok(seq)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        protocol_number: &str,
        title: &str,
        description: &str,
        requester_type: RequesterType,
        requester_id: Option<Uuid>,
        requester_name: &str,
        target_department: &str,
        priority: RequestPriority,
    ) -> Result<UnifiedRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, UnifiedRequest>(&format!(
            r#"
            INSERT INTO unified_requests (
                protocol_number, title, description,
                requester_type, requester_id, requester_name,
                target_department, priority
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(protocol_number)
        .bind(title)
        .bind(description)
        .bind(requester_type)
        .bind(requester_id)
        .bind(requester_name)
        .bind(target_department)
        .bind(priority)
        .fetch_one(executor)
        .await?;
        Ok(request)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<UnifiedRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, UnifiedRequest>(&format!(
            "UPDATE unified_requests SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(request)
    }

    pub async fn update_department<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        target_department: &str,
    ) -> Result<UnifiedRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, UnifiedRequest>(&format!(
            "UPDATE unified_requests SET target_department = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .bind(target_department)
        .fetch_one(executor)
        .await?;
        Ok(request)
    }

    pub async fn insert_history<'e, E>(
        &self,
        executor: E,
        request_id: Uuid,
        from_status: Option<RequestStatus>,
        to_status: RequestStatus,
        note: Option<&str>,
    ) -> Result<StatusHistoryEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, StatusHistoryEntry>(
            r#"
            INSERT INTO request_status_history (request_id, from_status, to_status, note)
            VALUES ($1, $2, $3, $4)
            RETURNING id, request_id, from_status, to_status, changed_by, note, created_at
            "#,
        )
        .bind(request_id)
        .bind(from_status)
        .bind(to_status)
        .bind(note)
        .fetch_one(executor)
        .await?;
        Ok(entry)
    }

    pub async fn insert_comment<'e, E>(
        &self,
        executor: E,
        request_id: Uuid,
        author_id: Uuid,
        author_name: &str,
        text: &str,
        is_forward: bool,
    ) -> Result<RequestComment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let comment = sqlx::query_as::<_, RequestComment>(
            r#"
            INSERT INTO request_comments (request_id, author_id, author_name, text, is_forward)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, request_id, author_id, author_name, text, is_forward, created_at
            "#,
        )
        .bind(request_id)
        .bind(author_id)
        .bind(author_name)
        .bind(text)
        .bind(is_forward)
        .fetch_one(executor)
        .await?;
        Ok(comment)
    }

    pub async fn insert_attachment<'e, E>(
        &self,
        executor: E,
        request_id: Uuid,
        file_name: &str,
        content_type: Option<&str>,
        size_bytes: i64,
        storage_path: &str,
    ) -> Result<RequestAttachment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let attachment = sqlx::query_as::<_, RequestAttachment>(
            r#"
            INSERT INTO request_attachments (request_id, file_name, content_type, size_bytes, storage_path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, request_id, file_name, content_type, size_bytes, storage_path, uploaded_by, created_at
            "#,
        )
        .bind(request_id)
        .bind(file_name)
        .bind(content_type)
        .bind(size_bytes)
        .bind(storage_path)
        .fetch_one(executor)
        .await?;
        Ok(attachment)
    }
}
