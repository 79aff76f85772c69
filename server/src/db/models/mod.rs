//! Database Models
//!
//! Record ids use SurrealDB's native format internally and serialize as
//! `table:id` strings at the API boundary (see [`serde_helpers`]).
//! Reference fields between tables are stored as plain `table:id` strings;
//! repositories parse them into `RecordId` when addressing records.

pub mod category;
pub mod order;
pub mod product;
pub mod serde_helpers;
pub mod shop;
pub mod stock_batch;

pub use category::{Category, CategoryCreate, CategoryUpdate};
pub use order::{Order, OrderItem};
pub use product::{DealComponent, Product};
pub use shop::{Shop, ShopCreate, ShopUpdate};
pub use stock_batch::{StockBatch, StockLine, StockLineKind};
