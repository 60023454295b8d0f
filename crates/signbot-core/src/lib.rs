//! # Signbot Core
//!
//! Shared building blocks for the check-in pipeline: the error type,
//! configuration, data model, account parsing and the transport seam.

pub mod account;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use account::parse_accounts;
pub use config::SignbotConfig;
pub use error::{Result, SignbotError};
pub use traits::{RawResponse, Transport, TransportError};
pub use types::{
    Account, Category, ClassificationResult, Counts, ErrorKind, HttpMethod, RequestOutcome,
    RequestSpec, RunSummary,
};
