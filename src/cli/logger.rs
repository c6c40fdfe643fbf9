// Logging utilities for CLI
use std::io::Write;

/// Initialize logger for CLI
pub fn init_logger(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        log::LevelFilter::Error
    } else if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(default_level).format(|buf, record| {
        if record.level() <= log::Level::Debug {
            writeln!(buf, "[{}] {}", record.level(), record.args())
        } else {
            writeln!(buf, "{}", record.args())
        }
    });

    // When verbose, show our own debug logs but keep dependencies quieter
    if verbose {
        builder.filter_module("sizetrack", log::LevelFilter::Debug);
        builder.filter_module("reqwest", log::LevelFilter::Info);
        builder.filter_module("hyper", log::LevelFilter::Info);
        builder.filter_module("tokio", log::LevelFilter::Info);
    }

    // If the user sets RUST_LOG, let env_logger handle it completely
    if std::env::var("RUST_LOG").is_ok() {
        return env_logger::init();
    }

    builder.init();
}
