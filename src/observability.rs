//! This module provides observability and diagnostics for the codec.
//!
//! All diagnostics go through the `log` facade; libraries never install a
//! logger themselves. `enable_verbose_logging` is the opt-in for binaries,
//! benchmarks and test harnesses that want to see the codec's decisions.
//! The `log_metric!` macro emits structured key-value lines and is compiled out
//! of release builds.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;

use log::LevelFilter;

use crate::error::BitframeError;

/// Logs a structured key-value metric line at debug level, only in debug builds.
///
/// # Example
/// ```
/// use bitframe::log_metric;
/// let frame = 3;
/// log_metric!("event"="frame_encoded", "frame"=&frame, "bits"=&1024);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            log::debug!("BITFRAME_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs an `env_logger` backend at info level with a `[LEVEL] message`
/// format, appending to `log_file` when given. Only the first call has any
/// effect; later calls return `Ok(())` without touching the logger.
pub fn enable_verbose_logging(log_file: Option<&Path>) -> Result<(), BitframeError> {
    let mut result = Ok(());
    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(LevelFilter::Info);
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(path) = log_file {
            match OpenOptions::new().append(true).create(true).open(path) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                }
                Err(e) => {
                    result = Err(BitframeError::Io(e));
                    return;
                }
            }
        }

        // Another logger may already be installed by the host; that's fine.
        let _ = builder.try_init();
    });
    result
}
