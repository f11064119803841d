//! rusty-bbs/crates/rb-core/src/lib.rs
//!
//! The posting engine and interface definitions for Rusty-BBS.

pub mod dat;
pub mod encoding;
pub mod error;
pub mod memory;
pub mod models;
pub mod service;
pub mod settings;
pub mod subject;
pub mod traits;
pub mod transaction;
pub mod transfer;
pub mod views;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use service::{BoardService, Environment};
pub use settings::{BoardDirectory, BoardSettings};
pub use traits::*;
