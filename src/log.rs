/*!

Logging for simulation runs.

The crate logs through the `log` facade; `enable_logging` installs a `log4rs` console backend the
first time it is called and swaps its configuration on later calls, so the level can be changed
mid-program (between runs, for example).

*/

use crate::error::CtnsError;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    Handle,
};
use std::sync::{Mutex, OnceLock};

pub use log::LevelFilter;

const DEFAULT_PATTERN: &str = "{d(%H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

static LOG_HANDLE: OnceLock<Mutex<Handle>> = OnceLock::new();

fn build_config(level: LevelFilter) -> Result<Config, CtnsError> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(DEFAULT_PATTERN)))
        .build();

    Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|e| CtnsError::Logging(e.to_string()))
}

/// Enables logging at `level`, or changes the level if logging is already enabled.
pub fn enable_logging(level: LevelFilter) -> Result<(), CtnsError> {
    let config = build_config(level)?;

    if let Some(handle) = LOG_HANDLE.get() {
        handle
            .lock()
            .map_err(|e| CtnsError::Logging(e.to_string()))?
            .set_config(config);
        return Ok(());
    }

    let handle = log4rs::init_config(config).map_err(|e| CtnsError::Logging(e.to_string()))?;
    // A concurrent first call may have won the race; its handle is equivalent.
    let _ = LOG_HANDLE.set(Mutex::new(handle));
    Ok(())
}

/// Turns logging off without uninstalling the backend.
pub fn disable_logging() -> Result<(), CtnsError> {
    if LOG_HANDLE.get().is_some() {
        enable_logging(LevelFilter::Off)?;
    }
    Ok(())
}
