//! Small pieces shared by every kotori crate: message-based error
//! contexts and time helpers.

pub mod error;
pub mod time;

pub use error::FromMessage;
