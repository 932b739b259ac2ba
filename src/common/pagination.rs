// src/common/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::{error::AppError, field_map::FieldMap};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// Parâmetros de paginação comuns a todas as listagens.
///
/// `generation` é devolvido intacto na resposta: o cliente incrementa o valor a cada
/// mudança de filtro e descarta respostas cuja geração não seja a última emitida.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Página, começando em 1
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Campo em camelCase (ex: `createdAt`)
    pub sort_by: Option<String>,
    pub sort_dir: Option<SortDir>,
    pub generation: Option<u64>,
}

/// Paginação já normalizada e com a coluna de ordenação validada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
    pub sort_column: &'static str,
    pub sort_dir: SortDir,
    pub generation: Option<u64>,
}

impl PageRequest {
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    /// Trecho `ORDER BY ... LIMIT ... OFFSET ...`. A coluna vem da allowlist do `FieldMap`.
    pub fn order_clause(&self) -> String {
        format!(
            " ORDER BY {} {} LIMIT {} OFFSET {}",
            self.sort_column,
            self.sort_dir.as_sql(),
            self.limit(),
            self.offset()
        )
    }
}

impl PageParams {
    pub fn resolve(&self, fields: &FieldMap) -> Result<PageRequest, AppError> {
        let sort_column = match self.sort_by.as_deref() {
            Some(field) => fields
                .column(field)
                .ok_or_else(|| AppError::InvalidSortField(field.to_string()))?,
            None => fields.default_sort(),
        };

        Ok(PageRequest {
            page: self.page.unwrap_or(1).max(1),
            per_page: self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
            sort_column,
            sort_dir: self.sort_dir.unwrap_or_default(),
            generation: self.generation,
        })
    }
}

/// Resposta de listagem: `{ data, count, page, perPage, generation }`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    /// Total de registros que batem com o filtro (sem paginação)
    pub count: i64,
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, count: i64, request: &PageRequest) -> Self {
        Self {
            data,
            count,
            page: request.page,
            per_page: request.per_page,
            generation: request.generation,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            count: self.count,
            page: self.page,
            per_page: self.per_page,
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: FieldMap = FieldMap::new(
        "students",
        &[("createdAt", "created_at"), ("fullName", "full_name")],
        "created_at",
    );

    #[test]
    fn defaults_and_clamping() {
        let params = PageParams {
            page: Some(0),
            per_page: Some(5000),
            ..Default::default()
        };
        let req = params.resolve(&FIELDS).unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.per_page, MAX_PER_PAGE);
        assert_eq!(req.sort_column, "created_at");
        assert_eq!(req.sort_dir, SortDir::Desc);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn offset_follows_page() {
        let params = PageParams {
            page: Some(3),
            per_page: Some(10),
            sort_by: Some("fullName".into()),
            sort_dir: Some(SortDir::Asc),
            generation: Some(7),
        };
        let req = params.resolve(&FIELDS).unwrap();
        assert_eq!(req.offset(), 20);
        assert_eq!(req.order_clause(), " ORDER BY full_name ASC LIMIT 10 OFFSET 20");
        assert_eq!(req.generation, Some(7));
    }

    #[test]
    fn rejects_unknown_sort_field() {
        let params = PageParams {
            sort_by: Some("password; DROP TABLE students".into()),
            ..Default::default()
        };
        assert!(matches!(
            params.resolve(&FIELDS),
            Err(AppError::InvalidSortField(_))
        ));
    }

    #[test]
    fn page_echoes_generation() {
        let req = PageParams { generation: Some(42), ..Default::default() }
            .resolve(&FIELDS)
            .unwrap();
        let page = Page::new(vec![1, 2, 3], 3, &req).map(|n| n * 2);
        assert_eq!(page.data, vec![2, 4, 6]);
        assert_eq!(page.generation, Some(42));
    }
}
