pub mod config;
pub mod errors;
pub mod types;

pub use config::{CaptureSettings, StreamConfig};
pub use errors::CaptureError;
pub use types::*;
