// src/models/printers.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::models::menu::Department;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "paper_width", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaperWidth {
    Mm58,
    Mm80,
}

impl PaperWidth {
    /// Characters per line in the printer's default font.
    pub fn columns(&self) -> usize {
        match self {
            PaperWidth::Mm58 => 32,
            PaperWidth::Mm80 => 48,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Printer {
    pub id: Uuid,
    #[schema(example = "Kitchen pass")]
    pub name: String,
    #[schema(example = "192.168.1.50")]
    pub host: String,
    #[schema(example = 9100)]
    pub port: i32,
    /// None for the receipt printer.
    pub department: Option<Department>,
    pub paper_width: PaperWidth,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrintResult {
    pub printer_id: Uuid,
    pub printer_name: String,
    pub department: Option<Department>,
    pub ok: bool,
    pub error: Option<String>,
}
