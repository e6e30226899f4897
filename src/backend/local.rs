use super::{FieldExtractor, PatientFields};
use crate::{
    config::Config,
    error::PipelineError,
    prompt::build_prompt,
    recover::recover_fields,
    runtime::{ModelServer, OllamaServer},
    supervisor::Supervisor,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Extraction through a model process on this host.
///
/// Drives the supervisor before and after its own work: the server is
/// started if absent, and torn down again on every exit path when this
/// call was the one that started it.
pub struct LocalBackend<S: ModelServer> {
    server: S,
    poll_attempts: u32,
    poll_interval: Duration,
    log_stderr: bool,
    log_output: bool,
}

impl LocalBackend<OllamaServer> {
    pub fn new(cfg: &Config) -> Self {
        Self {
            server: OllamaServer::new(cfg),
            poll_attempts: cfg.ollama.startup_poll_attempts,
            poll_interval: Duration::from_millis(cfg.ollama.startup_poll_interval_ms),
            log_stderr: cfg.debug.log_model_stderr,
            log_output: cfg.debug.log_model_output,
        }
    }
}

impl<S: ModelServer> LocalBackend<S> {
    /// Construction over an arbitrary server, for tests.
    pub fn with_server(server: S, poll_attempts: u32, poll_interval: Duration) -> Self {
        Self {
            server,
            poll_attempts,
            poll_interval,
            log_stderr: true,
            log_output: false,
        }
    }

    pub fn server(&self) -> &S {
        &self.server
    }
}

impl<S: ModelServer> FieldExtractor for LocalBackend<S> {
    fn extract_fields(&self, text: &str) -> Result<Option<PatientFields>, PipelineError> {
        let supervisor = Supervisor::new(&self.server, self.poll_attempts, self.poll_interval);
        let already_running = supervisor.ensure_running()?;

        let prompt = build_prompt(text);
        let result = self.server.run_model(&prompt);

        // Cleanup runs before any return below, whatever the model
        // call or the parse produced.
        if !already_running {
            supervisor.shutdown();
        }

        let output = result?;

        if self.log_stderr && !output.stderr.trim().is_empty() {
            warn!("model stderr: {}", output.stderr.trim());
        }
        if !output.success {
            warn!("model exited non-zero; still scanning its output");
        }
        if self.log_output {
            debug!("model raw output: {}", output.stdout.trim());
        }

        Ok(recover_fields(&output.stdout))
    }
}
