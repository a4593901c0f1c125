//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! url_for_signed:
//!     canonical "/path?sorted=query" → signer.rs encrypt → &signature=...
//!
//! Incoming signed request:
//!     strip signature → re-render canonical → signer.rs decrypt → compare
//! ```
//!
//! # Design Decisions
//! - Verification returns a boolean; a bad signature is not an exception
//! - Keys come from `http.app_key` in the configuration

pub mod signer;

pub use signer::{Encrypter, MessageVerifier};
