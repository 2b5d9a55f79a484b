//! Tracing/logging setup shared by the binary and tests.

pub mod tracing;

pub use self::tracing::{LogConfig, LogFormat, UnknownLogFormat};

/// Initialize process-wide logging.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(config: &LogConfig) -> bool {
    self::tracing::init(config)
}
