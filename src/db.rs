pub mod staff_repo;
pub use staff_repo::StaffRepository;
pub mod menu_repo;
pub use menu_repo::MenuRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod offer_repo;
pub use offer_repo::OfferRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
pub mod printer_repo;
pub use printer_repo::PrinterRepository;
pub mod qr_repo;
pub use qr_repo::QrRepository;
pub mod report_repo;
pub use report_repo::ReportRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;
