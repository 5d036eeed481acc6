pub mod error;
pub mod config;
pub mod storage;
pub mod identity;
pub mod api;
pub mod ui;
pub mod guard;
pub mod routes;
pub mod realtime;
pub mod cli;

pub use error::{ClientError, ClientResult};
pub use config::ClientConfig;
