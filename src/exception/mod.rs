//! Exception handling subsystem.
//!
//! # Data Flow
//! ```text
//! Error raised by hook / middleware / handler / route miss
//!     → handler.rs report (custom reporter, or log by status unless ignored)
//!     → handler.rs handle (custom renderer, or JSON / HTML by Accept)
//!     → response sent
//! ```

pub mod handler;

pub use handler::ExceptionHandler;
