//! odfetch common library
//!
//! Ambient pieces shared by the odfetch workspace members:
//!
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Errors**: [`CommonError`] for configuration and setup failures
//!
//! # Example
//!
//! ```no_run
//! use odfetch_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! fn main() -> odfetch_common::Result<()> {
//!     let config = LogConfig::builder().level(LogLevel::Debug).build();
//!     let _guard = init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

pub use error::{CommonError, Result};
