use std::{fs, path::Path, sync::OnceLock};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;
pub mod writer;

pub use formatter::LineFormatter;
pub use writer::{RollingLineWriter, strip_ansi_escapes};

use crate::configs::Config;

static FILE_WRITER: OnceLock<RollingLineWriter> = OnceLock::new();

/// Builds the filter directive from config; `RUST_LOG` still takes precedence.
pub fn filter_directive(config: &Config) -> String {
  let logging = config.logging.as_ref();
  let level = logging
    .and_then(|l| l.level.as_deref())
    .unwrap_or("info");
  let filters = logging.and_then(|l| l.filters.as_deref()).unwrap_or("");

  // reqwest/hyper are chatty at debug
  let mut directive = format!("{},hyper=warn,reqwest=warn", level);
  if !filters.is_empty() {
    directive.push(',');
    directive.push_str(filters);
  }
  directive
}

pub fn init(config: &Config) {
  let env_filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

  let stdout_layer = fmt::layer()
    .event_format(LineFormatter::new(true))
    .with_ansi(true);

  let file_layer = config
    .logging
    .as_ref()
    .and_then(|logging| logging.file.as_ref())
    .map(|file_config| {
      if let Some(parent) = Path::new(&file_config.path).parent() {
        if let Err(e) = fs::create_dir_all(parent) {
          eprintln!("Failed to create log directory: {}", e);
        }
      }

      let writer = FILE_WRITER
        .get_or_init(|| RollingLineWriter::new(&file_config.path, file_config.max_lines))
        .clone();
      fmt::layer()
        .with_writer(writer)
        .event_format(LineFormatter::new(false))
        .with_ansi(false)
    });

  let _ = tracing_subscriber::registry()
    .with(env_filter)
    .with(stdout_layer)
    .with(file_layer)
    .try_init();
}
