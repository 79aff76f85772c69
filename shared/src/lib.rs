//! Shared types for the Tiffin backend
//!
//! Common types used by the server and its clients: domain enums,
//! request DTOs and the unified API response envelope.

pub mod error;
pub mod request;
pub mod response;
pub mod types;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, ErrorCode};
pub use types::{OrderStatus, PaymentStatus, PlateType};
