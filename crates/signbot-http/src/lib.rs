//! # Signbot HTTP
//!
//! The retrying requester and its reqwest transport.

pub mod redact;
pub mod requester;
pub mod transport;

pub use redact::{mask_secret, redact_headers};
pub use requester::{Requester, backoff_delay};
pub use transport::ReqwestTransport;
