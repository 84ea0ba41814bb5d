//! Application-wide helpers.

pub mod messages;

pub use messages::{message, Locale};
