//! Text session log (spec.md §6: "Persisted state ... text session
//! log"). A thin `tracing-subscriber` layer wiring helper: the session
//! log is just the ambient `tracing` stream redirected to a rolling
//! file, matching the teacher's `utils::logger` split between a stdout
//! layer (human operators) and a file layer (durable record).

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a global subscriber that writes human-readable lines to
/// stdout and, if `log_dir` is set, a second copy to a daily-rolling
/// file under `log_dir`. Returns the file layer's `WorkerGuard`; it must
/// be kept alive for the process lifetime or buffered lines are lost on
/// drop.
pub fn init_session_log(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "session.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(env_filter).with(stdout_layer).init();
            None
        }
    }
}
