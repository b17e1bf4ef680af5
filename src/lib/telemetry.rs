//! Telemetry initialization and launch span helpers.

use std::time::Instant;

use anyhow::Result;
use tracing::{info, info_span, Span};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Environment variable holding the `tracing` filter directive.
pub const LOG_FILTER_ENV: &str = "LEVEL_LAUNCHER_LOG";

/// Initialize `tracing` and format diagnostics on stderr.
pub fn init_tracing() -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Span covering one launcher invocation from validation to child exit.
pub struct LaunchSpan {
    span: Span,
    started_at: Instant,
    launch_id: Uuid,
}

impl LaunchSpan {
    pub fn start(level: &str) -> Self {
        let launch_id = Uuid::new_v4();
        let span = info_span!(
            target: "level_launcher::launch",
            "launch",
            %launch_id,
            level
        );
        Self {
            span,
            started_at: Instant::now(),
            launch_id,
        }
    }

    pub fn launch_id(&self) -> Uuid {
        self.launch_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Close the span while recording status and completion info.
    pub fn finish(self, status: &'static str, exit_code: Option<i32>) {
        let elapsed_ms = self.started_at.elapsed().as_millis();
        let _entered = self.span.enter();
        info!(
            target: "level_launcher::launch",
            launch_id = %self.launch_id,
            status = status,
            exit_code = exit_code,
            elapsed_ms = elapsed_ms,
            "Launch finished"
        );
    }
}
