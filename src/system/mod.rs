/// System module: path resolution and logging helpers

pub mod paths;

pub use paths::PathRegistry;

/// High-level milestone line, routed to the "parsed" target so the collector
/// marks it apart from ordinary diagnostics.
#[macro_export]
macro_rules! log_parsed {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        $crate::log::info!(target: "parsed", "{}", msg);
    }}
}
