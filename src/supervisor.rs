use crate::{error::PipelineError, runtime::ModelServer};
use std::time::Duration;
use tracing::{debug, info};

/// Ensures the local model server is reachable before use and tears it
/// down afterwards when this invocation was the one that started it.
///
/// The probe-then-launch sequence is racy under concurrent callers:
/// both may observe "not running" and both launch. Accepted for a
/// single-operator tool; a deployment wanting concurrency should run a
/// supervised server instead.
pub struct Supervisor<'a, S: ModelServer> {
    server: &'a S,
    poll_attempts: u32,
    poll_interval: Duration,
}

impl<'a, S: ModelServer> Supervisor<'a, S> {
    pub fn new(server: &'a S, poll_attempts: u32, poll_interval: Duration) -> Self {
        Self {
            server,
            poll_attempts,
            poll_interval,
        }
    }

    /// Returns true if the server was already running, false if this
    /// call launched it. Fails with `StartupTimeout` if the launched
    /// server never answers the probe within the bounded poll window.
    pub fn ensure_running(&self) -> Result<bool, PipelineError> {
        if self.server.probe() {
            debug!("model server already reachable");
            return Ok(true);
        }

        self.server.launch()?;

        for attempt in 1..=self.poll_attempts {
            std::thread::sleep(self.poll_interval);
            if self.server.probe() {
                info!("model server up after {attempt} poll(s)");
                return Ok(false);
            }
        }

        Err(PipelineError::StartupTimeout {
            attempts: self.poll_attempts,
        })
    }

    /// Best-effort; never fails.
    pub fn shutdown(&self) {
        self.server.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ModelOutput;
    use std::cell::Cell;

    /// Probe succeeds from the `up_after`-th call onward.
    struct ScriptedServer {
        up_after: u32,
        probes: Cell<u32>,
        launches: Cell<u32>,
        shutdowns: Cell<u32>,
    }

    impl ScriptedServer {
        fn new(up_after: u32) -> Self {
            Self {
                up_after,
                probes: Cell::new(0),
                launches: Cell::new(0),
                shutdowns: Cell::new(0),
            }
        }
    }

    impl ModelServer for ScriptedServer {
        fn probe(&self) -> bool {
            let n = self.probes.get() + 1;
            self.probes.set(n);
            n >= self.up_after
        }

        fn launch(&self) -> Result<(), PipelineError> {
            self.launches.set(self.launches.get() + 1);
            Ok(())
        }

        fn run_model(&self, _prompt: &str) -> Result<ModelOutput, PipelineError> {
            unreachable!("supervisor never invokes the model")
        }

        fn shutdown(&self) {
            self.shutdowns.set(self.shutdowns.get() + 1);
        }
    }

    fn supervisor(server: &ScriptedServer) -> Supervisor<'_, ScriptedServer> {
        Supervisor::new(server, 10, Duration::ZERO)
    }

    #[test]
    fn already_running_skips_launch() {
        let server = ScriptedServer::new(1);
        let sup = supervisor(&server);
        assert!(sup.ensure_running().unwrap());
        assert_eq!(server.launches.get(), 0);
        assert_eq!(server.probes.get(), 1);
    }

    #[test]
    fn started_by_us_after_third_poll() {
        // Probe 1 (pre-launch) fails, polls 1-2 fail, poll 3 succeeds.
        let server = ScriptedServer::new(4);
        let sup = supervisor(&server);
        assert!(!sup.ensure_running().unwrap());
        assert_eq!(server.launches.get(), 1);
        assert_eq!(server.probes.get(), 4);
    }

    #[test]
    fn startup_timeout_after_bounded_polls() {
        let server = ScriptedServer::new(u32::MAX);
        let sup = supervisor(&server);
        let err = sup.ensure_running().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StartupTimeout { attempts: 10 }
        ));
        // Initial probe plus exactly ten polls, then stop.
        assert_eq!(server.probes.get(), 11);
        assert_eq!(server.launches.get(), 1);
    }

    #[test]
    fn shutdown_delegates_to_server() {
        let server = ScriptedServer::new(1);
        let sup = supervisor(&server);
        sup.shutdown();
        assert_eq!(server.shutdowns.get(), 1);
    }
}
