//! Tracing subscriber setup for the discover binary.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::ValueEnum;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogOutput {
    #[default]
    Stdout,
    /// Append to `logs/<exe-name>.log` next to the executable.
    File,
}

/// Install the global subscriber. `RUST_LOG` overrides the level chosen
/// by `debug`.
pub fn init(debug: bool, format: LogFormat, output: LogOutput) {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (writer, ansi, file_error) = match output {
        LogOutput::Stdout => (BoxMakeWriter::new(io::stdout), true, None),
        LogOutput::File => match open_log_file() {
            Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), false, None),
            Err(e) => (BoxMakeWriter::new(io::stdout), true, Some(e)),
        },
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    if let Some(e) = file_error {
        tracing::error!(error = %e, "Failed to log into file, using stdout");
    }
}

fn open_log_file() -> io::Result<File> {
    let exe = std::env::current_exe()?;
    let path = log_file_path(&exe);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// `/opt/bin/lanreg-discover.exe` → `/opt/bin/logs/lanreg-discover.log`.
pub fn log_file_path(exe: &Path) -> PathBuf {
    let base = exe.parent().unwrap_or_else(|| Path::new("."));
    let name = exe
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("lanreg-discover");
    let stem = name.split('.').next().unwrap_or(name);
    base.join("logs").join(format!("{stem}.log"))
}
