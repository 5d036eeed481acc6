//! Real-time order notifications over the JSON hub protocol.

pub mod protocol;
pub mod hub;

pub use hub::{HubClient, HubEvent, HubHandle, NEW_ORDER_TARGET};
pub use protocol::HubMessage;
