use std::io::{self, IsTerminal};
use std::time::SystemTime;

use anyhow::{bail, Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

pub fn parse_level(level: &str) -> Result<LevelFilter> {
    Ok(match level {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        _ => bail!("unknown log level '{}'", level),
    })
}

pub fn init(level: &str) -> Result<()> {
    let level = parse_level(level)?;

    let is_terminal = io::stdout().is_terminal();
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .debug(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let now = humantime::format_rfc3339_millis(SystemTime::now());
            if is_terminal {
                out.finish(format_args!(
                    "{now} [{}] {}: {message}",
                    colors.color(record.level()),
                    record.target(),
                ))
            } else {
                out.finish(format_args!(
                    "{now} [{}] {}: {message}",
                    record.level(),
                    record.target(),
                ))
            }
        })
        .level(level)
        .chain(io::stdout())
        .apply()
        .context("init logger")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), LevelFilter::Debug);
        assert_eq!(parse_level("error").unwrap(), LevelFilter::Error);
        assert!(parse_level("trace").is_err());
    }
}
