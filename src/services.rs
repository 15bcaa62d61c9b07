pub mod auth;
pub mod document_service;
pub mod inventory_service;
pub mod menu_service;
pub mod notification_service;
pub mod offer_service;
pub mod order_service;
pub mod pricing;
pub mod printing_service;
pub mod qr_service;
pub mod report_service;
pub mod settings_service;
