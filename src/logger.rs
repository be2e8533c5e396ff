use std::{
    env,
    io::{self, IsTerminal, Write},
    time::{Duration, SystemTime},
};

use anyhow::Result;
use log::{self, Level, LevelFilter, Log, Metadata, Record};

use crate::constants;

//Stdout carries menus and resolved URLs, so every record goes to stderr
pub struct Logger {
    level: LevelFilter,
    colors: bool,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if let Some(line) = self.format(record) {
            let _ = writeln!(io::stderr().lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

impl Logger {
    pub fn init(debug: bool) -> Result<()> {
        let logger = Self::new(
            debug,
            env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal(),
        );

        log::set_max_level(logger.level);
        log::set_boxed_logger(Box::new(logger))?;

        Ok(())
    }

    const fn new(debug: bool, colors: bool) -> Self {
        Self {
            level: if debug {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
            colors,
        }
    }

    fn format(&self, record: &Record<'_>) -> Option<String> {
        if !self.enabled(record.metadata()) {
            return None;
        }

        let level = record.level();
        if self.level >= LevelFilter::Debug {
            let millis = SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_millis();

            return Some(format!(
                "{millis} {} [{}] {}: {}",
                tag(level, self.colors),
                constants::PLUGIN_NAME,
                record.module_path().unwrap_or("<unknown>"),
                record.args()
            ));
        }

        //Library chatter only shows up when debugging
        if !record.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return None;
        }

        Some(match level {
            Level::Info => record.args().to_string(),
            _ => format!("{} {}", tag(level, self.colors), record.args()),
        })
    }
}

const fn plain_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "[ERROR]",
        Level::Warn => "[WARN]",
        Level::Info => "[INFO]",
        Level::Debug | Level::Trace => "[DEBUG]",
    }
}

#[cfg(feature = "colors")]
const fn tag(level: Level, colors: bool) -> &'static str {
    if !colors {
        return plain_tag(level);
    }

    match level {
        Level::Error => "\x1b[31m[ERROR]\x1b[0m",                //red
        Level::Warn => "\x1b[33m[WARN]\x1b[0m",                  //yellow
        Level::Info => "\x1b[34m[INFO]\x1b[0m",                  //blue
        Level::Debug | Level::Trace => "\x1b[36m[DEBUG]\x1b[0m", //cyan
    }
}

#[cfg(not(feature = "colors"))]
const fn tag(level: Level, _colors: bool) -> &'static str {
    plain_tag(level)
}
