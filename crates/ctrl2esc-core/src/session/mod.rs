// ctrl2esc Device Session
// One grabbed physical device, one synthetic device, one remap state

mod backend;

pub use backend::{Backend, EvdevBackend, GrabGuard};

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::input::{InputDevice, ReadStatus};
use crate::output::EventSink;
use crate::transform::{RemapEngine, RemapPolicy};

/// Default grace period between opening a device and grabbing it
pub const DEFAULT_GRAB_DELAY: Duration = Duration::from_secs(1);

/// Errors that abort a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create evdev device from {path}: {source}")]
    Attach {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to grab {path}: {source}")]
    Grab {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to set key capabilities on {path}: {source}")]
    Capabilities {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create virtual device for {path}: {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write to virtual device for {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SessionError {
    /// Whether the error happened before the read loop started
    pub fn is_setup_failure(&self) -> bool {
        !matches!(self, SessionError::Write { .. })
    }
}

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub policy: RemapPolicy,
    pub grab_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            policy: RemapPolicy::CTRL_TO_ESC,
            grab_delay: DEFAULT_GRAB_DELAY,
        }
    }
}

/// How a session's read loop ended without a write failure.
#[derive(Debug)]
pub struct SessionEnd {
    /// The read error that closed the stream
    pub reason: io::Error,
    pub events_read: u64,
    pub events_written: u64,
}

/// A live remapping session.
pub struct Session<B: Backend> {
    // Fields drop in declaration order: the synthetic device is destroyed
    // first, then the grab is released, then the input device is freed and
    // its handle closed.
    output: B::Output,
    input: GrabGuard<B::Device>,
    engine: RemapEngine,
    path: PathBuf,
}

impl<B: Backend> Session<B> {
    /// Acquire every resource of a session, in order.
    ///
    /// If a step fails, everything acquired by earlier steps is released in
    /// reverse order before the error is returned.
    pub fn open(backend: &B, path: &Path, options: &SessionOptions) -> Result<Self, SessionError> {
        let path = path.to_path_buf();

        let handle = backend.open(&path).map_err(|source| SessionError::Open {
            path: path.clone(),
            source,
        })?;

        let device = backend
            .attach(handle)
            .map_err(|source| SessionError::Attach {
                path: path.clone(),
                source,
            })?;

        backend.settle(options.grab_delay);

        let mut input = GrabGuard::acquire(device).map_err(|source| SessionError::Grab {
            path: path.clone(),
            source,
        })?;

        let policy = options.policy;
        input
            .restrict_keys(&policy.required_keys(), policy.excluded_capabilities)
            .map_err(|source| SessionError::Capabilities {
                path: path.clone(),
                source,
            })?;

        let output = backend
            .create_output(input.device())
            .map_err(|source| SessionError::CreateOutput {
                path: path.clone(),
                source,
            })?;

        log::info!("Remapping {} ({})", path.display(), input.name());
        Ok(Self {
            output,
            input,
            engine: RemapEngine::new(policy),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn engine(&self) -> &RemapEngine {
        &self.engine
    }

    /// Pump events until the input stream ends or a write fails.
    ///
    /// Consumes the session, so its resources are released exactly once
    /// when this returns.
    pub fn run(mut self) -> Result<SessionEnd, SessionError> {
        let mut events_read: u64 = 0;
        let mut events_written: u64 = 0;

        let reason = loop {
            let event = match self.input.read_event() {
                Ok(ReadStatus::Event(event)) => event,
                Ok(ReadStatus::Desync) => {
                    // The frame in flight is incomplete; none of it reaches the output
                    let dropped = self.output.discard_frame();
                    match self.input.resync() {
                        Ok(discarded) => {
                            log::debug!(
                                "{}: events dropped by kernel, discarded {} in and {} out to resync",
                                self.path.display(),
                                discarded,
                                dropped
                            );
                            continue;
                        }
                        Err(reason) => break reason,
                    }
                }
                Ok(ReadStatus::TryAgain) => continue,
                Err(reason) => break reason,
            };
            events_read += 1;

            for output in self.engine.process(&event) {
                self.output
                    .write_event(&output)
                    .map_err(|source| SessionError::Write {
                        path: self.path.clone(),
                        source,
                    })?;
                events_written += 1;
            }
        };

        let dropped = self.output.discard_frame();
        if dropped > 0 {
            log::debug!(
                "{}: dropped {} events of an unfinished frame",
                self.path.display(),
                dropped
            );
        }
        Ok(SessionEnd {
            reason,
            events_read,
            events_written,
        })
    }
}

/// Open a session on `path` with `backend` and run it to completion.
pub fn run_session_with<B: Backend>(
    backend: &B,
    path: &Path,
    options: &SessionOptions,
) -> Result<SessionEnd, SessionError> {
    Session::open(backend, path, options)?.run()
}

/// Remap the evdev device at `path` until it goes away.
///
/// Returns `true` when the session ran and its input stream ended, `false`
/// when setup failed or a write to the synthetic device failed.
pub fn run_session(path: &Path, options: &SessionOptions) -> bool {
    match run_session_with(&EvdevBackend, path, options) {
        Ok(end) => {
            log::info!(
                "{}: input closed ({}), {} events in, {} out",
                path.display(),
                end.reason,
                end.events_read,
                end.events_written
            );
            true
        }
        Err(e) if e.is_setup_failure() => {
            log::error!("{}", e);
            false
        }
        Err(e) => {
            log::warn!("{}", e);
            false
        }
    }
}
