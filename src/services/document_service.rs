// src/services/document_service.rs

use genpdf::{elements, style, Element};
use image::Luma;
use qrcode::QrCode;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::OrderRepository,
    models::orders::{OrderDetail, OrderType},
    services::settings_service::SettingsService,
};

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

/// Public page where a customer follows their order.
pub fn tracking_url(menu_url: &str, order_id: Uuid) -> String {
    format!("{}/track/{order_id}", menu_url.trim_end_matches('/'))
}

#[derive(Clone)]
pub struct DocumentService {
    order_repo: OrderRepository,
    settings_service: SettingsService,
    fonts_dir: String,
    menu_url: String,
    pool: PgPool,
}

impl DocumentService {
    pub fn new(
        order_repo: OrderRepository,
        settings_service: SettingsService,
        fonts_dir: String,
        menu_url: String,
        pool: PgPool,
    ) -> Self {
        Self { order_repo, settings_service, fonts_dir, menu_url, pool }
    }

    pub async fn receipt_pdf(&self, order_id: Uuid) -> Result<Vec<u8>, AppError> {
        let mut conn = self.pool.acquire().await?;
        let detail = self
            .order_repo
            .find_detail(&mut conn, order_id)
            .await?
            .ok_or(AppError::ResourceNotFound("order"))?;
        drop(conn);

        let settings = self.settings_service.get_settings().await?;

        // genpdf lays out synchronously
        let fonts_dir = self.fonts_dir.clone();
        let tracking = tracking_url(&self.menu_url, order_id);
        tokio::task::spawn_blocking(move || {
            render_receipt(&detail, &settings.restaurant_name, &settings.currency, settings.address.as_deref(), &fonts_dir, &tracking)
        })
        .await
        .map_err(|e| AppError::InternalServerError(e.into()))?
    }
}

fn render_receipt(
    detail: &OrderDetail,
    restaurant_name: &str,
    currency: &str,
    address: Option<&str>,
    fonts_dir: &str,
    tracking: &str,
) -> Result<Vec<u8>, AppError> {
    let order = &detail.order;

    let font_family = genpdf::fonts::from_files(fonts_dir, "Roboto", None)
        .map_err(|_| AppError::FontNotFound(format!("Roboto font family not found in {fonts_dir}")))?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Order #{}", order.order_number));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // Header
    doc.push(elements::Paragraph::new(restaurant_name).styled(style::Style::new().bold().with_font_size(18)));
    if let Some(addr) = address {
        doc.push(elements::Paragraph::new(addr).styled(style::Style::new().with_font_size(9)));
    }
    doc.push(elements::Break::new(1.5));

    doc.push(
        elements::Paragraph::new(format!("ORDER #{}", order.order_number))
            .styled(style::Style::new().bold().with_font_size(14)),
    );
    doc.push(elements::Paragraph::new(format!("Date: {}", order.created_at.format("%Y-%m-%d %H:%M"))));
    doc.push(elements::Paragraph::new(format!("Customer: {}", order.customer_name)));
    let fulfillment = match (order.order_type, order.table_number, order.delivery_address.as_deref()) {
        (OrderType::DineIn, Some(table), _) => format!("Dine in, table {table}"),
        (OrderType::Delivery, _, Some(addr)) => format!("Delivery to {addr}"),
        (OrderType::Takeaway, _, _) => "Takeaway".to_string(),
        (kind, _, _) => format!("{kind:?}"),
    };
    doc.push(elements::Paragraph::new(fulfillment));
    doc.push(elements::Break::new(2));

    // Lines
    let mut table = elements::TableLayout::new(vec![4, 1, 2, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let bold = style::Style::new().bold();
    table
        .row()
        .element(elements::Paragraph::new("Item").styled(bold))
        .element(elements::Paragraph::new("Qty").styled(bold))
        .element(elements::Paragraph::new("Unit").styled(bold))
        .element(elements::Paragraph::new("Total").styled(bold))
        .push()
        .map_err(pdf_error)?;

    for item in &detail.items {
        table
            .row()
            .element(elements::Paragraph::new(item.name.as_str()))
            .element(elements::Paragraph::new(item.quantity.to_string()))
            .element(elements::Paragraph::new(format!("{currency} {:.2}", item.unit_price)))
            .element(elements::Paragraph::new(format!("{currency} {:.2}", item.line_total)))
            .push()
            .map_err(pdf_error)?;
    }

    doc.push(table);
    doc.push(elements::Break::new(1));

    // Totals
    let mut totals = vec![("Subtotal", order.subtotal)];
    if !order.discount_amount.is_zero() {
        totals.push(("Discount", -order.discount_amount));
    }
    if !order.tax_amount.is_zero() {
        totals.push(("Tax", order.tax_amount));
    }
    if !order.service_charge.is_zero() {
        totals.push(("Service", order.service_charge));
    }
    for (label, amount) in totals {
        let mut p = elements::Paragraph::new(format!("{label}: {currency} {amount:.2}"));
        p.set_alignment(genpdf::Alignment::Right);
        doc.push(p);
    }

    let mut total = elements::Paragraph::new(format!("TOTAL: {currency} {:.2}", order.total));
    total.set_alignment(genpdf::Alignment::Right);
    doc.push(total.styled(style::Style::new().bold().with_font_size(12)));
    doc.push(elements::Break::new(2));

    // Tracking QR
    doc.push(elements::Paragraph::new("TRACK YOUR ORDER").styled(style::Style::new().bold().with_font_size(12)));
    doc.push(elements::Paragraph::new(tracking).styled(style::Style::new().with_font_size(8)));
    doc.push(elements::Break::new(1));

    let code = QrCode::new(tracking.as_bytes()).map_err(pdf_error)?;
    let image_buffer = code.render::<Luma<u8>>().build();
    let qr_image = elements::Image::from_dynamic_image(image::DynamicImage::ImageLuma8(image_buffer))
        .map_err(pdf_error)?
        .with_scale(genpdf::Scale::new(0.5, 0.5));
    doc.push(qr_image);

    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_error)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_url_ignores_trailing_slash() {
        let id = Uuid::nil();
        assert_eq!(
            tracking_url("https://eat.example.com/menu/", id),
            format!("https://eat.example.com/menu/track/{id}")
        );
        assert_eq!(tracking_url("https://eat.example.com", id), format!("https://eat.example.com/track/{id}"));
    }
}
