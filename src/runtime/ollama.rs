use super::{ModelOutput, ModelServer};
use crate::{config::Config, error::PipelineError};
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The real Ollama runtime: TCP probe of the serving port, detached
/// `ollama serve` launch, synchronous `ollama run <model>` invocation,
/// and pattern-based shutdown.
pub struct OllamaServer {
    exe: String,
    host: String,
    port: u16,
    model: String,
    probe_timeout: Duration,
    run_timeout_seconds: u64,
    shutdown_pattern: String,
}

impl OllamaServer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            exe: cfg.ollama.exe.clone(),
            host: cfg.ollama.host.clone(),
            port: cfg.ollama.port,
            model: cfg.ollama.model.clone(),
            probe_timeout: Duration::from_secs(cfg.ollama.probe_timeout_seconds.max(1)),
            run_timeout_seconds: cfg.ollama.run_timeout_seconds,
            shutdown_pattern: cfg.ollama.shutdown_pattern.clone(),
        }
    }
}

impl ModelServer for OllamaServer {
    fn probe(&self) -> bool {
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(err) => {
                warn!("cannot resolve {}:{}: {err}", self.host, self.port);
                return false;
            }
        };
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, self.probe_timeout).is_ok() {
                return true;
            }
        }
        false
    }

    fn launch(&self) -> Result<(), PipelineError> {
        info!("launching {} serve", self.exe);
        let mut cmd = Command::new(&self.exe);
        cmd.arg("serve")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Detach into its own process group so signals aimed at us
        // (Ctrl-C on the CLI) don't take the server down with us.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd.spawn()
            .map(|_| ())
            .map_err(|e| PipelineError::Invocation(format!("spawning {} serve: {e}", self.exe)))
    }

    fn run_model(&self, prompt: &str) -> Result<ModelOutput, PipelineError> {
        debug!(
            "running {} run {} (timeout {}s)",
            self.exe, self.model, self.run_timeout_seconds
        );
        let mut child = Command::new(&self.exe)
            .arg("run")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PipelineError::Invocation(format!("spawning {} run {}: {e}", self.exe, self.model))
            })?;

        // Feed the prompt from its own thread. A multi-page form OCRs
        // to more than a pipe buffer, and the model may already be
        // writing to stderr; an inline write would deadlock both
        // processes before the timeout is even armed.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PipelineError::Invocation("no stdin handle".into()))?;
        let prompt_bytes = prompt.as_bytes().to_vec();
        let writer = std::thread::spawn(move || -> std::io::Result<()> {
            use std::io::Write;
            stdin.write_all(&prompt_bytes)
            // Dropping stdin closes the pipe so the model sees EOF.
        });

        let result = if self.run_timeout_seconds > 0 {
            wait_with_timeout(&mut child, Duration::from_secs(self.run_timeout_seconds))
        } else {
            child
                .wait_with_output()
                .map_err(|e| PipelineError::Invocation(format!("waiting for model: {e}")))
        };

        // A broken pipe here just means the model exited without
        // draining its stdin; the captured output decides what happens.
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!("prompt writer: {err}"),
            Err(_) => warn!("prompt writer thread panicked"),
        }

        let output = result?;

        Ok(ModelOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }

    fn shutdown(&self) {
        // Pattern kill, not PID kill: also catches a server left behind
        // by an earlier crashed invocation. Broad by design of the tool.
        match Command::new("pkill")
            .arg("-f")
            .arg(&self.shutdown_pattern)
            .status()
        {
            Ok(status) => info!("shutdown requested (pkill exit: {status})"),
            Err(err) => warn!("shutdown failed: {err}"),
        }
    }
}

/// Wait for the child with a hard cap, draining stdout/stderr on
/// separate threads so a chatty model can't deadlock on a full pipe.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output, PipelineError> {
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf)?;
        }
        Ok(buf)
    });

    let join = |t: std::thread::JoinHandle<std::io::Result<Vec<u8>>>| -> Result<Vec<u8>, PipelineError> {
        t.join()
            .map_err(|_| PipelineError::Invocation("pipe reader thread panicked".into()))?
            .map_err(PipelineError::Io)
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|e| PipelineError::Invocation(format!("try_wait: {e}")))?
        {
            return Ok(Output {
                status,
                stdout: join(stdout_thread)?,
                stderr: join(stderr_thread)?,
            });
        }

        if start.elapsed() > timeout {
            warn!("model invocation timed out after {:?}", timeout);
            let _ = child.kill();
            let _ = child.wait();
            // Killing the child closed the pipes; join both drains so
            // reader errors surface instead of leaking a thread.
            if let Err(err) = join(stdout_thread) {
                warn!("stdout drain after kill: {err}");
            }
            let stderr = join(stderr_thread).unwrap_or_default();
            return Err(PipelineError::Invocation(format!(
                "model invocation exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&stderr)
            )));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
