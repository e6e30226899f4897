use patient_intake::backend::{FieldExtractor, LocalBackend};
use patient_intake::error::PipelineError;
use patient_intake::runtime::{ModelOutput, ModelServer};
use std::cell::Cell;
use std::time::Duration;

const GOOD_OUTPUT: &str =
    r#" {"first_name":"Marie","last_name":"Curie","date_of_birth":"1900-12-05"} extra text"#;

/// Deterministic fake runtime: reachable from the `up_after`-th probe
/// onward, returns a canned model output, counts lifecycle calls.
struct FakeServer {
    up_after: u32,
    stdout: String,
    stderr: String,
    fail_run: bool,
    probes: Cell<u32>,
    launches: Cell<u32>,
    shutdowns: Cell<u32>,
}

impl FakeServer {
    fn reachable(stdout: &str) -> Self {
        Self::with_up_after(1, stdout)
    }

    fn with_up_after(up_after: u32, stdout: &str) -> Self {
        Self {
            up_after,
            stdout: stdout.to_string(),
            stderr: String::new(),
            fail_run: false,
            probes: Cell::new(0),
            launches: Cell::new(0),
            shutdowns: Cell::new(0),
        }
    }
}

impl ModelServer for FakeServer {
    fn probe(&self) -> bool {
        let n = self.probes.get() + 1;
        self.probes.set(n);
        n >= self.up_after
    }

    fn launch(&self) -> Result<(), PipelineError> {
        self.launches.set(self.launches.get() + 1);
        Ok(())
    }

    fn run_model(&self, prompt: &str) -> Result<ModelOutput, PipelineError> {
        assert!(prompt.contains("extraction-only engine"));
        if self.fail_run {
            return Err(PipelineError::Invocation("boom".into()));
        }
        Ok(ModelOutput {
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            success: true,
        })
    }

    fn shutdown(&self) {
        self.shutdowns.set(self.shutdowns.get() + 1);
    }
}

fn backend(server: FakeServer) -> LocalBackend<FakeServer> {
    LocalBackend::with_server(server, 10, Duration::ZERO)
}

#[test]
fn preexisting_server_is_not_shut_down() {
    let backend = backend(FakeServer::reachable(GOOD_OUTPUT));
    let fields = backend
        .extract_fields("Patient: Marie Curie, DOB 1900-12-05")
        .unwrap()
        .expect("fields");
    assert_eq!(fields.first_name, "Marie");
    assert_eq!(fields.last_name, "Curie");
    assert_eq!(fields.date_of_birth, "1900-12-05");
    let server = backend_server(&backend);
    assert_eq!(server.launches.get(), 0);
    assert_eq!(server.shutdowns.get(), 0);
}

#[test]
fn started_by_us_is_shut_down_once() {
    // Pre-launch probe fails, third poll succeeds.
    let backend = backend(FakeServer::with_up_after(4, GOOD_OUTPUT));
    let fields = backend.extract_fields("some text").unwrap();
    assert!(fields.is_some());
    let server = backend_server(&backend);
    assert_eq!(server.launches.get(), 1);
    assert_eq!(server.shutdowns.get(), 1);
}

#[test]
fn shutdown_runs_even_when_nothing_parses() {
    let backend = backend(FakeServer::with_up_after(
        2,
        "Sure! Here's the data: no json here",
    ));
    let fields = backend.extract_fields("some text").unwrap();
    assert!(fields.is_none());
    assert_eq!(backend_server(&backend).shutdowns.get(), 1);
}

#[test]
fn shutdown_runs_even_when_invocation_fails() {
    let mut server = FakeServer::with_up_after(2, "");
    server.fail_run = true;
    let backend = backend(server);
    let err = backend.extract_fields("some text").unwrap_err();
    assert!(matches!(err, PipelineError::Invocation(_)));
    assert_eq!(backend_server(&backend).shutdowns.get(), 1);
}

#[test]
fn startup_timeout_propagates() {
    let backend = backend(FakeServer::with_up_after(u32::MAX, GOOD_OUTPUT));
    let err = backend.extract_fields("some text").unwrap_err();
    assert!(matches!(err, PipelineError::StartupTimeout { .. }));
}

#[test]
fn extraction_is_idempotent() {
    let backend = backend(FakeServer::reachable(GOOD_OUTPUT));
    let first = backend.extract_fields("same document").unwrap();
    let second = backend.extract_fields("same document").unwrap();
    assert_eq!(first, second);
    assert!(first.is_some());
}

fn backend_server(backend: &LocalBackend<FakeServer>) -> &FakeServer {
    backend.server()
}
