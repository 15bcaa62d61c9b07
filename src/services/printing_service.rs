// src/services/printing_service.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::{io::AsyncWriteExt, net::TcpStream};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{printer_repo::PrinterFields, OrderRepository, PrinterRepository},
    models::{
        menu::Department,
        orders::{OrderDetail, OrderItem, OrderType},
        printers::{PaperWidth, PrintResult, Printer},
        settings::RestaurantSettings,
    },
    services::settings_service::SettingsService,
};

// ---
// ESC/POS
// ---

const ESC: u8 = 0x1b;
const GS: u8 = 0x1d;

struct EscPos {
    buf: Vec<u8>,
    columns: usize,
}

impl EscPos {
    fn new(width: PaperWidth) -> Self {
        Self { buf: vec![ESC, b'@'], columns: width.columns() }
    }

    fn bold(&mut self, on: bool) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'E', on as u8]);
        self
    }

    fn center(&mut self, on: bool) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, b'a', if on { 1 } else { 0 }]);
        self
    }

    fn double(&mut self, on: bool) -> &mut Self {
        self.buf.extend_from_slice(&[GS, b'!', if on { 0x11 } else { 0x00 }]);
        self
    }

    fn line(&mut self, text: &str) -> &mut Self {
        // Printer code pages are single byte.
        self.buf.extend(text.chars().map(|c| if c.is_ascii() { c as u8 } else { b'?' }));
        self.buf.push(b'\n');
        self
    }

    fn wrapped(&mut self, text: &str, indent: usize) -> &mut Self {
        let pad = " ".repeat(indent);
        for l in wrap(text, self.columns.saturating_sub(indent)) {
            self.line(&format!("{pad}{l}"));
        }
        self
    }

    fn pair(&mut self, left: &str, right: &str) -> &mut Self {
        let cols = self.columns;
        let right_len = right.chars().count();
        let max_left = cols.saturating_sub(right_len + 1);
        let mut lines = wrap(left, max_left);
        let last = lines.pop().unwrap_or_default();
        for l in lines {
            self.line(&l);
        }
        let gap = cols.saturating_sub(last.chars().count() + right_len).max(1);
        self.line(&format!("{last}{}{right}", " ".repeat(gap)))
    }

    fn divider(&mut self) -> &mut Self {
        let rule = "-".repeat(self.columns);
        self.line(&rule)
    }

    fn cut(mut self) -> Vec<u8> {
        self.buf.extend_from_slice(&[ESC, b'd', 3]);
        self.buf.extend_from_slice(&[GS, b'V', 66, 0]);
        self.buf
    }
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(8);
    let mut out = Vec::new();
    let mut line = String::new();
    for token in text.split_whitespace() {
        // Hard-split words longer than the paper.
        let mut token = token.to_string();
        while token.chars().count() > width {
            if !line.is_empty() {
                out.push(std::mem::take(&mut line));
            }
            let head: String = token.chars().take(width).collect();
            token = token.chars().skip(width).collect();
            out.push(head);
        }
        if token.is_empty() {
            continue;
        }
        if line.is_empty() {
            line = token;
        } else if line.chars().count() + 1 + token.chars().count() > width {
            out.push(std::mem::replace(&mut line, token));
        } else {
            line.push(' ');
            line.push_str(&token);
        }
    }
    if !line.is_empty() {
        out.push(line);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn money(value: Decimal, currency: &str) -> String {
    format!("{currency} {:.2}", value)
}

fn order_type_label(detail: &OrderDetail) -> String {
    match detail.order.order_type {
        OrderType::DineIn => match detail.order.table_number {
            Some(t) => format!("DINE IN - TABLE {t}"),
            None => "DINE IN".to_string(),
        },
        OrderType::Takeaway => "TAKEAWAY".to_string(),
        OrderType::Delivery => "DELIVERY".to_string(),
    }
}

/// Ticket bytes for one printer. With a department only that department's
/// lines are printed and prices are left out.
pub fn render_ticket(
    detail: &OrderDetail,
    department: Option<Department>,
    width: PaperWidth,
    settings: &RestaurantSettings,
) -> Vec<u8> {
    let mut t = EscPos::new(width);
    let order = &detail.order;

    t.center(true).bold(true).double(true);
    match department {
        Some(d) => t.line(&d.as_str().to_uppercase()),
        None => t.line(&settings.restaurant_name),
    };
    t.double(false).line(&format!("ORDER #{}", order.order_number)).bold(false);
    t.line(&order_type_label(detail)).center(false);
    t.line(&order.created_at.format("%Y-%m-%d %H:%M").to_string());
    t.wrapped(&format!("Customer: {}", order.customer_name), 0);
    if department.is_none() {
        t.line(&format!("Phone: {}", order.customer_phone));
        if let Some(address) = &order.delivery_address {
            t.wrapped(&format!("Address: {address}"), 0);
        }
    }
    t.divider();

    let items: Vec<&OrderItem> = match department {
        Some(d) => detail.items_for(d).collect(),
        None => detail.items.iter().collect(),
    };
    for item in items {
        let label = format!("{}x {}", item.quantity, item.name);
        match department {
            Some(_) => {
                t.bold(true).wrapped(&label, 0).bold(false);
            }
            None => {
                t.pair(&label, &format!("{:.2}", item.line_total));
            }
        }
        if let Some(notes) = item.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            t.wrapped(&format!("* {notes}"), 3);
        }
    }
    t.divider();

    if department.is_none() {
        let currency = settings.currency.as_str();
        t.pair("Subtotal", &money(order.subtotal, currency));
        if !order.discount_amount.is_zero() {
            t.pair("Discount", &format!("-{}", money(order.discount_amount, currency)));
        }
        if !order.tax_amount.is_zero() {
            t.pair("Tax", &money(order.tax_amount, currency));
        }
        if !order.service_charge.is_zero() {
            t.pair("Service", &money(order.service_charge, currency));
        }
        t.bold(true).pair("TOTAL", &money(order.total, currency)).bold(false);
    }

    if let Some(notes) = order.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        t.bold(true).line("NOTES").bold(false).wrapped(notes, 0);
    }

    t.cut()
}

fn test_ticket(printer: &Printer, settings: &RestaurantSettings) -> Vec<u8> {
    let mut t = EscPos::new(printer.paper_width);
    t.center(true).bold(true).line(&settings.restaurant_name).bold(false);
    t.line("TEST PRINT").line(&printer.name);
    t.line(&Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()).center(false);
    t.divider();
    t.cut()
}

// ---
// Transport
// ---

/// Delivers raw ticket bytes to a network printer.
#[async_trait]
pub trait TicketTransport: Send + Sync {
    async fn send(&self, host: &str, port: u16, payload: &[u8]) -> anyhow::Result<()>;
}

/// Raw TCP ("JetDirect", usually port 9100).
pub struct TcpTransport {
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl TicketTransport for TcpTransport {
    async fn send(&self, host: &str, port: u16, payload: &[u8]) -> anyhow::Result<()> {
        let write = async {
            let mut stream = TcpStream::connect((host, port)).await?;
            stream.write_all(payload).await?;
            stream.flush().await?;
            stream.shutdown().await?;
            Ok::<_, std::io::Error>(())
        };

        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| anyhow::anyhow!("timed out after {} ms", self.timeout.as_millis()))??;
        Ok(())
    }
}

// ---
// Service
// ---

#[derive(Clone)]
pub struct PrintingService {
    printer_repo: PrinterRepository,
    order_repo: OrderRepository,
    settings_service: SettingsService,
    transport: Arc<dyn TicketTransport>,
    pool: PgPool,
}

impl PrintingService {
    pub fn new(
        printer_repo: PrinterRepository,
        order_repo: OrderRepository,
        settings_service: SettingsService,
        transport: Arc<dyn TicketTransport>,
        pool: PgPool,
    ) -> Self {
        Self { printer_repo, order_repo, settings_service, transport, pool }
    }

    pub async fn list_printers(&self) -> Result<Vec<Printer>, AppError> {
        self.printer_repo.list(false).await
    }

    pub async fn create_printer(&self, fields: &PrinterFields<'_>) -> Result<Printer, AppError> {
        self.printer_repo.create(fields).await
    }

    pub async fn update_printer(&self, id: Uuid, fields: &PrinterFields<'_>) -> Result<Printer, AppError> {
        self.printer_repo
            .update(id, fields)
            .await?
            .ok_or(AppError::ResourceNotFound("printer"))
    }

    pub async fn delete_printer(&self, id: Uuid) -> Result<(), AppError> {
        if !self.printer_repo.delete(id).await? {
            return Err(AppError::ResourceNotFound("printer"));
        }
        Ok(())
    }

    async fn send_to(&self, printer: &Printer, payload: &[u8]) -> PrintResult {
        let outcome = match u16::try_from(printer.port) {
            Ok(port) => self.transport.send(&printer.host, port, payload).await,
            Err(_) => Err(anyhow::anyhow!("invalid port {}", printer.port)),
        };

        if let Err(e) = &outcome {
            tracing::warn!(printer = %printer.name, host = %printer.host, error = %e, "print failed");
        }

        PrintResult {
            printer_id: printer.id,
            printer_name: printer.name.clone(),
            department: printer.department,
            ok: outcome.is_ok(),
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    /// Sends every active printer its ticket for the order. Department
    /// printers without lines for their department are skipped. A failing
    /// printer does not stop the others.
    pub async fn dispatch(
        &self,
        detail: &OrderDetail,
        printers: &[Printer],
        settings: &RestaurantSettings,
    ) -> Vec<PrintResult> {
        let mut results = Vec::new();
        for printer in printers.iter().filter(|p| p.is_active) {
            if let Some(d) = printer.department {
                if detail.items_for(d).next().is_none() {
                    continue;
                }
            }
            let ticket = render_ticket(detail, printer.department, printer.paper_width, settings);
            results.push(self.send_to(printer, &ticket).await);
        }
        results
    }

    pub async fn print_order(&self, order_id: Uuid) -> Result<Vec<PrintResult>, AppError> {
        let mut conn = self.pool.acquire().await?;
        let detail = self
            .order_repo
            .find_detail(&mut conn, order_id)
            .await?
            .ok_or(AppError::ResourceNotFound("order"))?;
        drop(conn);

        let settings = self.settings_service.get_settings().await?;
        let printers = self.printer_repo.list(true).await?;
        Ok(self.dispatch(&detail, &printers, &settings).await)
    }

    /// Fire-and-forget printing after checkout, when the restaurant has it on.
    pub async fn auto_print(&self, order_id: Uuid) {
        let enabled = match self.settings_service.get_settings().await {
            Ok(settings) => settings.auto_print,
            Err(e) => {
                tracing::warn!(%order_id, error = %e, "auto-print skipped: settings unavailable");
                return;
            }
        };
        if !enabled {
            return;
        }

        match self.print_order(order_id).await {
            Ok(results) => {
                let failed = results.iter().filter(|r| !r.ok).count();
                tracing::info!(%order_id, printers = results.len(), failed, "auto-print finished");
            }
            Err(e) => tracing::error!(%order_id, error = %e, "auto-print failed"),
        }
    }

    pub async fn test_print(&self, id: Uuid) -> Result<PrintResult, AppError> {
        let printer = self
            .printer_repo
            .get(id)
            .await?
            .ok_or(AppError::ResourceNotFound("printer"))?;
        let settings = self.settings_service.get_settings().await?;
        Ok(self.send_to(&printer, &test_ticket(&printer, &settings)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::SettingsRepository,
        models::orders::{Order, OrderDepartment, OrderStatus, DepartmentStatus},
    };
    use rust_decimal_macros::dec;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<(String, u16, Vec<u8>)>>,
        failing_host: Option<String>,
    }

    #[async_trait]
    impl TicketTransport for FakeTransport {
        async fn send(&self, host: &str, port: u16, payload: &[u8]) -> anyhow::Result<()> {
            if self.failing_host.as_deref() == Some(host) {
                anyhow::bail!("connection refused");
            }
            self.sent.lock().unwrap().push((host.to_string(), port, payload.to_vec()));
            Ok(())
        }
    }

    fn service(transport: Arc<FakeTransport>) -> PrintingService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool");
        PrintingService::new(
            PrinterRepository::new(pool.clone()),
            OrderRepository::new(pool.clone()),
            SettingsService::new(SettingsRepository::new(pool.clone()), pool.clone()),
            transport,
            pool,
        )
    }

    fn item(order_id: Uuid, name: &str, department: Department, qty: i32, total: Decimal) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id,
            menu_item_id: Uuid::new_v4(),
            name: name.into(),
            department,
            quantity: qty,
            unit_price: total / Decimal::from(qty),
            line_total: total,
            notes: None,
        }
    }

    fn detail() -> OrderDetail {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let order = Order {
            id,
            order_number: 42,
            customer_name: "Ana".into(),
            customer_phone: "+15550001111".into(),
            order_type: OrderType::DineIn,
            table_number: Some(7),
            delivery_address: None,
            notes: Some("No ice".into()),
            status: OrderStatus::Confirmed,
            subtotal: dec!(17.00),
            discount_amount: dec!(0),
            tax_amount: dec!(1.70),
            service_charge: dec!(0),
            total: dec!(18.70),
            offer_id: None,
            promo_code: None,
            inventory_consumed: true,
            inventory_restored: false,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
            delivered_at: None,
            cancelled_at: None,
        };
        let mut burger = item(id, "Cheeseburger", Department::Kitchen, 1, dec!(12.00));
        burger.notes = Some("well done".into());
        OrderDetail {
            order,
            items: vec![burger, item(id, "Cappuccino", Department::Barista, 2, dec!(5.00))],
            departments: vec![
                OrderDepartment { order_id: id, department: Department::Kitchen, status: DepartmentStatus::Pending, updated_at: now },
                OrderDepartment { order_id: id, department: Department::Barista, status: DepartmentStatus::Pending, updated_at: now },
            ],
        }
    }

    fn printer(name: &str, host: &str, department: Option<Department>) -> Printer {
        Printer {
            id: Uuid::new_v4(),
            name: name.into(),
            host: host.into(),
            port: 9100,
            department,
            paper_width: PaperWidth::Mm80,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn department_ticket_only_has_its_lines_and_no_prices() {
        let t = text(&render_ticket(&detail(), Some(Department::Kitchen), PaperWidth::Mm58, &RestaurantSettings::default()));
        assert!(t.contains("KITCHEN"));
        assert!(t.contains("1x Cheeseburger"));
        assert!(t.contains("* well done"));
        assert!(!t.contains("Cappuccino"));
        assert!(!t.contains("TOTAL"));
        assert!(t.contains("DINE IN - TABLE 7"));
    }

    #[test]
    fn receipt_lists_everything_with_totals_and_ends_with_a_cut() {
        let bytes = render_ticket(&detail(), None, PaperWidth::Mm80, &RestaurantSettings::default());
        let t = text(&bytes);
        assert!(t.contains("Cheeseburger"));
        assert!(t.contains("2x Cappuccino"));
        assert!(t.contains("USD 18.70"));
        assert!(t.contains("No ice"));
        assert!(bytes.starts_with(&[ESC, b'@']));
        assert!(bytes.ends_with(&[GS, b'V', 66, 0]));
    }

    #[test]
    fn lines_fit_the_paper() {
        let mut d = detail();
        d.items[0].name = "Extraordinarily long burger name with many many toppings and sauces".into();
        let t = text(&render_ticket(&d, None, PaperWidth::Mm58, &RestaurantSettings::default()));
        for line in t.lines() {
            let printable: String = line.chars().filter(|c| !c.is_control()).collect();
            // control sequences may leave a couple of printable bytes ("@", "E")
            assert!(printable.chars().count() <= 32 + 4, "{printable:?}");
        }
    }

    #[test]
    fn wrap_splits_on_words_and_long_tokens() {
        assert_eq!(wrap("one two three", 8), vec!["one two", "three"]);
        assert_eq!(wrap("abcdefghij", 8), vec!["abcdefgh", "ij"]);
        assert_eq!(wrap("", 8), vec![String::new()]);
    }

    #[tokio::test]
    async fn dispatch_routes_tickets_and_reports_each_printer() {
        let transport = Arc::new(FakeTransport { failing_host: Some("10.0.0.3".into()), ..Default::default() });
        let svc = service(transport.clone());

        let mut inactive = printer("Old", "10.0.0.9", None);
        inactive.is_active = false;
        let printers = vec![
            printer("Kitchen", "10.0.0.1", Some(Department::Kitchen)),
            printer("Shisha", "10.0.0.2", Some(Department::Shisha)),
            printer("Counter", "10.0.0.3", None),
            inactive,
        ];

        let results = svc.dispatch(&detail(), &printers, &RestaurantSettings::default()).await;

        // shisha has no lines, the inactive printer is ignored
        assert_eq!(results.len(), 2);
        assert!(results[0].ok);
        assert_eq!(results[0].department, Some(Department::Kitchen));
        assert!(!results[1].ok);
        assert_eq!(results[1].error.as_deref(), Some("connection refused"));

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "10.0.0.1");
        assert_eq!(sent[0].1, 9100);
    }
}
