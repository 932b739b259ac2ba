// src/services/document_service.rs

use std::path::PathBuf;

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::RequestRepository,
    models::requests::UnifiedRequest,
};

const FONT_FAMILY: &str = "Roboto";

#[derive(Clone)]
pub struct DocumentService {
    repo: RequestRepository,
    fonts_dir: PathBuf,
}

impl DocumentService {
    pub fn new(repo: RequestRepository, fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo,
            fonts_dir: fonts_dir.into(),
        }
    }

    /// Comprovante em PDF da solicitação; o QR code carrega o número do protocolo.
    pub async fn generate_request_receipt(&self, request_id: Uuid) -> Result<Vec<u8>, AppError> {
        let request = self
            .repo
            .find_by_id(self.repo.pool(), request_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("Solicitação {}", request_id)))?;

        render_receipt(&self.fonts_dir, &request)
    }
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

pub(crate) fn render_receipt(
    fonts_dir: &std::path::Path,
    request: &UnifiedRequest,
) -> Result<Vec<u8>, AppError> {
    // Carrega a fonte da pasta configurada (Roboto-Regular.ttf, Roboto-Bold.ttf...)
    let font_family = genpdf::fonts::from_files(fonts_dir, FONT_FAMILY, None).map_err(|_| {
        AppError::FontNotFound(format!("{} em {}", FONT_FAMILY, fonts_dir.display()))
    })?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Protocolo {}", request.protocol_number));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // --- CABEÇALHO ---
    doc.push(
        elements::Paragraph::new("PREFEITURA MUNICIPAL")
            .styled(style::Style::new().bold().with_font_size(18)),
    );
    doc.push(
        elements::Paragraph::new("Comprovante de Solicitação")
            .styled(style::Style::new().with_font_size(12)),
    );
    doc.push(elements::Break::new(1.5));

    doc.push(
        elements::Paragraph::new(format!("PROTOCOLO Nº {}", request.protocol_number))
            .styled(style::Style::new().bold().with_font_size(14)),
    );
    doc.push(elements::Paragraph::new(format!(
        "Aberta em: {}",
        request.created_at.format("%d/%m/%Y %H:%M")
    )));
    doc.push(elements::Break::new(1.5));

    // --- DADOS ---
    let mut table = elements::TableLayout::new(vec![1, 3]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let style_bold = style::Style::new().bold();
    let rows = [
        ("Assunto", request.title.clone()),
        ("Solicitante", request.requester_name.clone()),
        ("Departamento", request.target_department.clone()),
        ("Prioridade", request.priority.label().to_string()),
        ("Status", request.status.label().to_string()),
    ];
    for (label, value) in rows {
        table
            .row()
            .element(elements::Paragraph::new(label).styled(style_bold))
            .element(elements::Paragraph::new(value))
            .push()
            .map_err(pdf_error)?;
    }
    doc.push(table);
    doc.push(elements::Break::new(1));

    doc.push(elements::Paragraph::new(request.description.clone()));
    doc.push(elements::Break::new(2));

    // --- QR CODE DO PROTOCOLO ---
    let code = QrCode::new(request.protocol_number.as_bytes()).map_err(pdf_error)?;
    let image_buffer = code.render::<Luma<u8>>().build();
    let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

    let pdf_image = elements::Image::from_dynamic_image(dynamic_image)
        .map_err(pdf_error)?
        .with_scale(genpdf::Scale::new(0.5, 0.5));
    doc.push(pdf_image);

    doc.push(elements::Break::new(1));
    doc.push(
        elements::Paragraph::new("Guarde este número para acompanhar sua solicitação.")
            .styled(style::Style::new().italic().with_font_size(8)),
    );

    // Renderiza em memória
    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_error)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::requests::{RequestPriority, RequestStatus, RequesterType};
    use chrono::Utc;

    #[test]
    fn missing_fonts_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let request = UnifiedRequest {
            id: Uuid::new_v4(),
            protocol_number: "2026000001".into(),
            title: "Reparo de poste".into(),
            description: "Poste apagado há uma semana".into(),
            requester_type: RequesterType::Citizen,
            requester_id: None,
            requester_name: "João".into(),
            target_department: "Obras".into(),
            priority: RequestPriority::High,
            status: RequestStatus::Open,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(matches!(
            render_receipt(dir.path(), &request),
            Err(AppError::FontNotFound(_))
        ));
    }
}
