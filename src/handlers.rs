// src/handlers.rs
pub mod auth;
pub mod documents;
pub mod inventory;
pub mod menu;
pub mod notifications;
pub mod offers;
pub mod orders;
pub mod printers;
pub mod public;
pub mod qr_codes;
pub mod rbac;
pub mod reports;
pub mod settings;
