//! Shared command line plumbing for the toolchain binaries.

pub use clap;
pub use clap_verbosity_flag as verbose;

/// Terminal styles of the help message.
pub fn get_styles() -> clap::builder::Styles {
    use clap::builder::styling::{AnsiColor, Effects, Styles};
    Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Cyan.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
}

/// Map the `-v`/`-q` count to a tracing level. Without any flag only errors
/// are reported.
pub fn verbose_level_to_trace(level: Option<verbose::Level>) -> &'static tracing::Level {
    match level {
        Some(verbose::Level::Error) => &tracing::Level::WARN,
        Some(verbose::Level::Warn) => &tracing::Level::INFO,
        Some(verbose::Level::Info) => &tracing::Level::DEBUG,
        Some(verbose::Level::Debug) => &tracing::Level::TRACE,
        Some(verbose::Level::Trace) => &tracing::Level::TRACE,
        None => &tracing::Level::ERROR,
    }
}

/// Install the global subscriber. Logs go to stderr, or as json lines to
/// `file` when given. Calling it twice keeps the first subscriber.
pub fn logging_setup(level: &tracing::Level, file: Option<&std::fs::File>) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(*level)
        .with_target(false);

    let result = match file.and_then(|f| f.try_clone().ok()) {
        Some(f) => builder
            .json()
            .with_writer(std::sync::Mutex::new(f))
            .try_init(),
        None => builder
            .without_time()
            .with_writer(std::io::stderr)
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}
