pub mod fetch;
pub mod processed;
pub mod quantity;
pub mod session;
pub mod sheet;
pub mod tickets;
pub mod working_set;

pub use crate::domain::model::{AuditLine, DeltaLine, InventoryAudit, LineKey};
pub use crate::domain::ports::{ConfigProvider, InventoryBackend, Storage, TicketBackend};
pub use crate::utils::error::Result;
