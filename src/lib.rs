//! Near-duplicate image detection with a two-stage filter: a cheap 64-bit
//! perceptual-hash gate followed by a hue–saturation histogram confirmation
//! against each group's representative.

pub mod actions;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod grouping;
pub mod histogram;
pub mod history;
pub mod scanner;

pub use config::ScanConfig;
pub use error::{ConfigError, DecodeError, ScanError, ScanWarning};
pub use fingerprint::{Fingerprint, FingerprintExtractor};
pub use grouping::{Group, ImageRecord, ScanSession};
pub use histogram::HueSatHistogram;
pub use scanner::{scan, ScanOutcome};
