#![warn(rust_2018_idioms)]

//! Helpers shared by the demos.

use env_logger::Target;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;

/// Installs the demo logger: `file:line [LEVEL] time - message`, written to
/// `output_log_file` (truncated) or stdout when it is empty.
pub fn init_log(log_level: &str, output_log_file: &str) -> anyhow::Result<()> {
    let log_level = log::LevelFilter::from_str(log_level)?;

    env_logger::Builder::new()
        .target(if !output_log_file.is_empty() {
            Target::Pipe(Box::new(
                OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(output_log_file)?,
            ))
        } else {
            Target::Stdout
        })
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} [{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                chrono::Local::now().format("%H:%M:%S.%6f"),
                record.args()
            )
        })
        .filter(None, log_level)
        .try_init()?;

    Ok(())
}
