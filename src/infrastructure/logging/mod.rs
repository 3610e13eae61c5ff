//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty formatting
//! - Optional daily-rotated file output

mod logger;

pub use logger::LoggerImpl;
