use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::fs;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "lead_engine.log";

/// Initializes the global logger.
///
/// Should be called once at process startup. Log level is controlled by the
/// `RUST_LOG` environment variable, defaulting to `info`. Logs go to the
/// console (colored) and to `logs/lead_engine.log`.
pub fn init() {
    if let Err(e) = fs::create_dir_all(LOG_DIR) {
        eprintln!("failed to create log directory at '{LOG_DIR}': {e}");
    }

    let log_file_path = format!("{LOG_DIR}/{LOG_FILE}");

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let log_level_filter = log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    let base_config = Dispatch::new().level(log_level_filter).level_for("serde", LevelFilter::Warn).level_for("uuid", LevelFilter::Warn);

    let console_config = Dispatch::new()
        .format(|out, message, record| {
            let colors = fern::colors::ColoredLevelConfig::new()
                .error(fern::colors::Color::Red)
                .warn(fern::colors::Color::Yellow)
                .info(fern::colors::Color::Green)
                .debug(fern::colors::Color::Blue)
                .trace(fern::colors::Color::BrightBlack);

            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let file_config = Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{} {} {}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), record.level(), record.target(), message))
        })
        .chain(fern::log_file(&log_file_path).unwrap_or_else(|e| {
            eprintln!("failed to open log file '{log_file_path}': {e}");
            fern::log_file("/dev/stderr").expect("failed to open stderr as fallback")
        }));

    base_config.chain(console_config).chain(file_config).apply().unwrap_or_else(|e| {
        // `apply()` fails if a logger is already installed; harmless in tests
        // that call `init()` more than once.
        eprintln!("logger already initialized: {e}");
    });
}
