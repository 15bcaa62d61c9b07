// src/config.rs

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        InventoryRepository, MenuRepository, NotificationRepository, OfferRepository,
        OrderRepository, PrinterRepository, QrRepository, ReportRepository, SettingsRepository,
        StaffRepository,
    },
    services::{
        auth::AuthService, document_service::DocumentService, inventory_service::InventoryService,
        menu_service::MenuService, notification_service::NotificationService,
        offer_service::OfferService, order_service::OrderService,
        printing_service::{PrintingService, TcpTransport},
        qr_service::QrService, report_service::ReportService, settings_service::SettingsService,
    },
};

/// Everything read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub public_menu_url: String,
    pub fonts_dir: String,
    pub printer_timeout: Duration,
    pub cors_allowed_origin: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw.parse().with_context(|| format!("{name} is invalid: '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_ttl_hours: parsed_or("JWT_TTL_HOURS", 168)?,
            bind_addr: parsed_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", 5)?,
            public_menu_url: var_or("PUBLIC_MENU_URL", "http://localhost:3001/menu"),
            fonts_dir: var_or("FONTS_DIR", "./fonts"),
            printer_timeout: Duration::from_millis(parsed_or("PRINTER_TIMEOUT_MS", 3000)?),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        })
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            database_url: "postgres://localhost/unused".into(),
            jwt_secret: "test-secret".into(),
            jwt_ttl_hours: 1,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            db_max_connections: 1,
            public_menu_url: "http://localhost:3001/menu".into(),
            fonts_dir: "./fonts".into(),
            printer_timeout: Duration::from_millis(100),
            cors_allowed_origin: None,
            admin_email: None,
            admin_password: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub i18n_store: I18nStore,
    pub auth_service: AuthService,
    pub menu_service: MenuService,
    pub inventory_service: InventoryService,
    pub order_service: OrderService,
    pub offer_service: OfferService,
    pub notification_service: NotificationService,
    pub printing_service: PrintingService,
    pub document_service: DocumentService,
    pub qr_service: QrService,
    pub report_service: ReportService,
    pub settings_service: SettingsService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("failed to connect to the database")?;

        tracing::info!("database connection established");

        Self::with_pool(config, db_pool)
    }

    /// Wires the dependency graph over an existing pool.
    pub fn with_pool(config: AppConfig, db_pool: PgPool) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let i18n_store = I18nStore::load()?;

        let staff_repo = StaffRepository::new(db_pool.clone());
        let menu_repo = MenuRepository::new(db_pool.clone());
        let inventory_repo = InventoryRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());
        let offer_repo = OfferRepository::new(db_pool.clone());
        let notification_repo = NotificationRepository::new(db_pool.clone());
        let printer_repo = PrinterRepository::new(db_pool.clone());
        let qr_repo = QrRepository::new(db_pool.clone());
        let report_repo = ReportRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());

        let auth_service = AuthService::new(
            staff_repo,
            config.jwt_secret.clone(),
            config.jwt_ttl_hours,
            db_pool.clone(),
        );
        let notification_service = NotificationService::new(notification_repo);
        let inventory_service = InventoryService::new(
            inventory_repo,
            notification_service.clone(),
            db_pool.clone(),
        );
        let settings_service = SettingsService::new(settings_repo, db_pool.clone());
        let offer_service = OfferService::new(offer_repo, db_pool.clone());
        let printing_service = PrintingService::new(
            printer_repo,
            order_repo.clone(),
            settings_service.clone(),
            Arc::new(TcpTransport::new(config.printer_timeout)),
            db_pool.clone(),
        );
        let menu_service = MenuService::new(menu_repo.clone(), db_pool.clone());
        let order_service = OrderService::new(
            order_repo.clone(),
            menu_repo,
            offer_service.clone(),
            inventory_service.clone(),
            notification_service.clone(),
            settings_service.clone(),
            printing_service.clone(),
            db_pool.clone(),
        );
        let qr_service = QrService::new(qr_repo, config.public_menu_url.clone());
        let document_service = DocumentService::new(
            order_repo,
            settings_service.clone(),
            config.fonts_dir.clone(),
            config.public_menu_url.clone(),
            db_pool.clone(),
        );
        let report_service = ReportService::new(report_repo);

        Ok(Self {
            db_pool,
            config,
            i18n_store,
            auth_service,
            menu_service,
            inventory_service,
            order_service,
            offer_service,
            notification_service,
            printing_service,
            document_service,
            qr_service,
            report_service,
            settings_service,
        })
    }
}
