//! Logger for the shell: one coloured line per record on stderr.

use std::io::Write;

use log::{Level, LevelFilter, Log, Metadata, Record};
use owo_colors::OwoColorize;

struct ShellLogger;

static LOGGER: ShellLogger = ShellLogger;

fn level_tag(level: Level) -> String {
    let tag = format!("{level:5}");
    match level {
        Level::Error => tag.bright_red().to_string(),
        Level::Warn => tag.bright_yellow().to_string(),
        Level::Info => tag.bright_blue().to_string(),
        Level::Debug => tag.bright_cyan().to_string(),
        Level::Trace => tag.bright_magenta().to_string(),
    }
}

impl Log for ShellLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let target = format!("[{}]", record.target());
        let mut stderr = std::io::stderr().lock();
        // Nowhere left to report a failing stderr.
        let _ = writeln!(
            stderr,
            "{} {} {}",
            level_tag(record.level()),
            target.dimmed(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Parses `off`, `error`, `warn`, `info`, `debug` or `trace`, case-insensitively.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}
