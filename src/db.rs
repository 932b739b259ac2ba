pub mod user_repo;
pub use user_repo::UserRepository;
pub mod permissions_repo;
pub use permissions_repo::PermissionsRepository;
pub mod request_repo;
pub use request_repo::RequestRepository;
pub mod chat_repo;
pub use chat_repo::ChatRepository;
pub mod education_repo;
pub use education_repo::EducationRepository;
pub mod ouvidoria_repo;
pub use ouvidoria_repo::OuvidoriaRepository;
pub mod health_repo;
pub use health_repo::HealthRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;

use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};

use crate::common::{
    error::AppError,
    pagination::{Page, PageRequest},
};

/// Listagem paginada comum a todos os repositórios.
///
/// `source` é a tabela (ou subconsulta com alias) e `filters` acrescenta o `WHERE`;
/// o mesmo filtro é aplicado na contagem e na página.
pub(crate) async fn fetch_page<T, F>(
    pool: &PgPool,
    source: &str,
    filters: F,
    request: &PageRequest,
) -> Result<Page<T>, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    F: Fn(&mut QueryBuilder<'static, Postgres>),
{
    let mut count_query = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE 1=1", source));
    filters(&mut count_query);
    let count: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let mut page_query = QueryBuilder::new(format!("SELECT * FROM {} WHERE 1=1", source));
    filters(&mut page_query);
    page_query.push(request.order_clause());
    let data = page_query.build_query_as::<T>().fetch_all(pool).await?;

    Ok(Page::new(data, count, request))
}

/// `%termo%` para ILIKE, ou `None` se a busca estiver vazia.
pub(crate) fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")))
}
