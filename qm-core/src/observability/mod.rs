//! Optional observability artifacts (spec.md §6): a line-delimited JSON
//! fills log and a text session log. Neither is required for
//! correctness; both are ambient stack the teacher always carries.

pub mod fills_log;
pub mod session_log;

pub use fills_log::FillsLog;
pub use session_log::init_session_log;
