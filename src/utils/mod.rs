//! Utility functions
//!
//! - [`network`]: LAN address and hostname detection, used for
//!   certificate subject names and the startup banner
//! - [`errors`]: readable reports for fatal startup errors

pub mod errors;
pub mod network;

pub use errors::format_user_error;
