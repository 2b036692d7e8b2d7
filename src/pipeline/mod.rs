//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler`: Walk the payments grid and append new records to the log
//! - `watch_interrupts`: Turn interrupt signals into cancellation, then a forced exit

pub mod crawl;
pub mod interrupt;
pub mod session;

pub use crawl::run_crawler;
pub use interrupt::{FORCED_EXIT_CODE, watch_interrupts};
pub use session::{Session, SessionReport, SessionState};
