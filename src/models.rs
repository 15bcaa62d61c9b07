pub mod auth;
pub mod inventory;
pub mod menu;
pub mod notifications;
pub mod offers;
pub mod orders;
pub mod printers;
pub mod qr;
pub mod reports;
pub mod settings;
