//! Shop Model

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use super::serde_helpers;

/// Shop (tenant unit)
///
/// `timezone` is the IANA name of the shop's operating timezone; it defines
/// the midnight-to-midnight bounds of a business day for stock batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shop {
    #[serde(default, with = "serde_helpers::option_record_id")]
    pub id: Option<RecordId>,
    pub name: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_true", deserialize_with = "serde_helpers::bool_true")]
    pub is_active: bool,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopCreate {
    pub name: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopUpdate {
    pub name: Option<String>,
    pub timezone: Option<String>,
    pub is_active: Option<bool>,
}
