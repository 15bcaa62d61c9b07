// src/services/qr_service.rs

use image::{DynamicImage, ImageOutputFormat, Luma};
use qrcode::{render::svg, QrCode};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::QrRepository,
    models::qr::{QrFormat, TableQr},
};

pub const MIN_SIZE: u32 = 64;
pub const MAX_SIZE: u32 = 1024;
pub const DEFAULT_SIZE: u32 = 512;

/// Menu link that pre-selects a table.
pub fn table_url(menu_url: &str, table_number: i32) -> String {
    let separator = if menu_url.contains('?') { '&' } else { '?' };
    format!("{menu_url}{separator}table={table_number}")
}

/// Encodes `target` as a QR image. The side is clamped to 64..=1024 pixels.
pub fn render(target: &str, format: QrFormat, size: Option<u32>) -> Result<Vec<u8>, AppError> {
    let size = size.unwrap_or(DEFAULT_SIZE).clamp(MIN_SIZE, MAX_SIZE);
    let code = QrCode::new(target.as_bytes())
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

    match format {
        QrFormat::Png => {
            let buffer = code
                .render::<Luma<u8>>()
                .min_dimensions(size, size)
                .build();
            let mut bytes = Vec::new();
            DynamicImage::ImageLuma8(buffer)
                .write_to(&mut bytes, ImageOutputFormat::Png)
                .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;
            Ok(bytes)
        }
        QrFormat::Svg => {
            let document = code
                .render::<svg::Color>()
                .min_dimensions(size, size)
                .dark_color(svg::Color("#000000"))
                .light_color(svg::Color("#ffffff"))
                .build();
            Ok(document.into_bytes())
        }
    }
}

#[derive(Clone)]
pub struct QrService {
    qr_repo: QrRepository,
    menu_url: String,
}

impl QrService {
    pub fn new(qr_repo: QrRepository, menu_url: String) -> Self {
        Self { qr_repo, menu_url }
    }

    pub async fn list(&self) -> Result<Vec<TableQr>, AppError> {
        self.qr_repo.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<TableQr, AppError> {
        self.qr_repo.get(id).await?.ok_or(AppError::ResourceNotFound("QR code"))
    }

    pub async fn create(&self, label: &str, table_number: i32) -> Result<TableQr, AppError> {
        let qr = self.qr_repo.create(label.trim(), table_number).await?;
        tracing::info!(table = qr.table_number, "table QR code created");
        Ok(qr)
    }

    pub async fn update(&self, id: Uuid, label: &str, table_number: i32) -> Result<TableQr, AppError> {
        self.qr_repo
            .update(id, label.trim(), table_number)
            .await?
            .ok_or(AppError::ResourceNotFound("QR code"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.qr_repo.delete(id).await? {
            return Err(AppError::ResourceNotFound("QR code"));
        }
        Ok(())
    }

    pub async fn render_table(&self, id: Uuid, format: QrFormat, size: Option<u32>) -> Result<Vec<u8>, AppError> {
        let qr = self.get(id).await?;
        render(&table_url(&self.menu_url, qr.table_number), format, size)
    }

    /// The generic code pointing at the bare menu.
    pub fn render_menu(&self, format: QrFormat, size: Option<u32>) -> Result<Vec<u8>, AppError> {
        render(&self.menu_url, format, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn table_urls_carry_the_table_number() {
        assert_eq!(table_url("https://eat.example.com/menu", 4), "https://eat.example.com/menu?table=4");
        assert_eq!(table_url("https://eat.example.com/?lang=pt", 12), "https://eat.example.com/?lang=pt&table=12");
    }

    #[test]
    fn png_output_is_a_png() {
        let bytes = render("https://eat.example.com/menu?table=1", QrFormat::Png, Some(128)).unwrap();
        assert!(bytes.starts_with(&PNG_MAGIC));
    }

    #[test]
    fn svg_output_is_an_svg_document() {
        let bytes = render("https://eat.example.com/menu", QrFormat::Svg, None).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("<svg"));
    }

    #[test]
    fn sizes_are_clamped() {
        let tiny = render("https://eat.example.com/menu", QrFormat::Png, Some(1)).unwrap();
        let image = image::load_from_memory(&tiny).unwrap();
        assert!(image.width() >= MIN_SIZE);

        let huge = render("https://eat.example.com/menu", QrFormat::Png, Some(50_000)).unwrap();
        let image = image::load_from_memory(&huge).unwrap();
        // one module of slack above the clamp
        assert!(image.width() < MAX_SIZE * 2);
    }
}
