#![cfg(feature = "std")]

use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{self, LevelFilter, Metadata, Record};

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() % 100_000)
                .unwrap_or(0);
            println!(
                "{:>5}.{:03} {:<5} [{}] {}",
                millis / 1000,
                millis % 1000,
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;

/// Level named by `DOGFIGHT_LOG`, falling back to `info`.
pub fn level_from_env() -> LevelFilter {
    env::var("DOGFIGHT_LOG")
        .ok()
        .and_then(|lvl| lvl.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Initialize logging with a level taken from the `DOGFIGHT_LOG` environment variable.
/// Calling it again is harmless.
pub fn init_logging() {
    let level = level_from_env();
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(level));
}
