//! # Signbot Pipeline
//!
//! The check-in core:
//!
//! ```text
//! jitter (once per run)
//!   └── per account, in config order (or bounded fan-out)
//!         SiteConfig::request_for → Requester (retry + backoff) → Classifier
//!   └── RunSummary (config order, counts) → signbot-notify
//! ```

pub mod checkin;
pub mod classifier;
pub mod delay;
pub mod orchestrator;

pub use checkin::CheckinJob;
pub use classifier::{Classifier, Matcher, Rule};
pub use delay::compute_delay;
pub use orchestrator::{Orchestrator, TIMED_OUT};
