//! Session state, account resolution and authentication flows

mod authentication;
mod detection;
pub mod manager;
pub mod resolver;
pub mod storage;
pub mod types;

pub use manager::ConsoleSession;
pub use resolver::{resolve_account, ResolutionRequest};
pub use storage::{validate_record, RecordStore};
pub use types::*;
