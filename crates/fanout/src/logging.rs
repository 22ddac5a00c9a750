use error_stack::{Report, ResultExt};
use log::LevelFilter;

use crate::error::FanoutError;

/// Initialize logging for the application.
///
/// Should be called once at startup; records go to stderr with an RFC 3339
/// timestamp.
///
/// # Errors
///
/// Returns [`FanoutError::Configuration`] if a logger is already installed.
pub fn init_logging(level: LevelFilter) -> Result<(), Report<FanoutError>> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} [{}] {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .change_context(FanoutError::Configuration {
            message: "Failed to initialize logger".to_string(),
        })
}
