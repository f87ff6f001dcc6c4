use crate::utils::error::ConfigError;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::str::FromStr;

pub fn parse_level(level: &str) -> Result<LevelFilter, ConfigError> {
    LevelFilter::from_str(level.trim()).map_err(|_| ConfigError::InvalidLogLevel(level.to_string()))
}

/// Installs the process logger. Fails if a logger is already installed.
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let level = parse_level(level)?;
    SimpleLogger::new().with_level(level).init()?;
    log::info!("Logging initialized at {}", level);
    Ok(())
}
