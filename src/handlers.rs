// src/handlers.rs

use std::collections::HashMap;

use axum::{
    extract::Multipart,
    http::header,
    response::{IntoResponse, Response},
};
use utoipa::ToSchema;

use crate::common::{error::AppError, storage::UploadedFile};

pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod education;
pub mod health;
pub mod ouvidoria;
pub mod permissions;
pub mod requests;

/// Formulário multipart de upload (apenas para a documentação).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    /// Tipo do documento (TFD), ex: `laudo_medico`
    kind: Option<String>,
}

/// Lê o campo `file` e os demais campos de texto do multipart.
pub(crate) async fn read_upload(
    mut multipart: Multipart,
) -> Result<(UploadedFile, HashMap<String, String>), AppError> {
    let mut file = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidUpload(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("arquivo").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidUpload(e.body_text()))?;
            file = Some(UploadedFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::InvalidUpload(e.body_text()))?;
            fields.insert(name, value);
        }
    }

    let file = file.ok_or_else(|| AppError::InvalidUpload("campo 'file' ausente".into()))?;
    Ok((file, fields))
}

/// Resposta de download com o nome original do arquivo.
pub(crate) fn file_response(bytes: Vec<u8>, content_type: &str, file_name: &str) -> Response {
    // Cabeçalho só aceita ASCII visível
    let safe_name: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .filter(|c| *c != '"')
        .collect();

    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", safe_name),
        ),
    ];
    (headers, bytes).into_response()
}
