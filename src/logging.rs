// src/logging.rs
use log::LevelFilter;
use std::path::Path;

/// Level from `RUST_LOG` when it names a plain level ("debug", "warn", ...),
/// otherwise `Info`.
pub fn level_from_env(value: Option<&str>) -> LevelFilter {
    value.and_then(|v| v.trim().parse::<LevelFilter>().ok()).unwrap_or(LevelFilter::Info)
}

/// Sends all log output to `path`. The terminal belongs to the UI, so
/// nothing is written to stdout or stderr.
pub fn init_file_logging(path: &Path, level: LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} - {} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        // reqwest/hyper chatter is rarely useful at debug.
        .level_for("hyper", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .level_for("html5ever", LevelFilter::Warn)
        .chain(fern::log_file(path)?)
        .apply()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_env() {
        assert_eq!(level_from_env(None), LevelFilter::Info);
        assert_eq!(level_from_env(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from_env(Some(" WARN ")), LevelFilter::Warn);
        assert_eq!(level_from_env(Some("today_in_history=trace")), LevelFilter::Info);
    }
}
