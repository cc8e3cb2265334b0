pub mod store;
pub mod types;

pub use store::RecordStore;
pub use types::{Collection, InvalidReason, Record, RecordStatus, RespondStatus, WhatsappStatus};
