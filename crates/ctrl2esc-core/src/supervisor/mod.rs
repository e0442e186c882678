// ctrl2esc Session Supervisor
// Launches one worker per qualifying device and reclaims finished ones

mod discovery;
mod reaper;
mod worker;

pub use discovery::{DeviceEnumerator, HotplugMonitor, SysfsMonitor, SysfsScanner};
#[cfg(feature = "hotplug")]
pub use discovery::{UdevEnumerator, UdevMonitor};
pub use reaper::Reaper;
pub use worker::{ProcessLauncher, ProcessWorker, Worker, WorkerExit, WorkerLauncher, WorkerTable};

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::input::{should_remap, CapabilityProbe, DeviceCandidate, DeviceFilter, Discovery};
use crate::transform::RemapPolicy;

/// Errors raised by the supervisor itself; session failures never surface here
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to launch worker for {device}: {source}")]
    Launch {
        device: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to install SIGCHLD handler: {0}")]
    Signal(#[source] io::Error),

    #[error("Device discovery failed: {0}")]
    Monitor(#[source] io::Error),
}

/// Decides which devices need a session and keeps one worker per device.
pub struct Supervisor<L: WorkerLauncher> {
    launcher: L,
    workers: Arc<Mutex<WorkerTable<L::Worker>>>,
    policy: RemapPolicy,
    filter: DeviceFilter,
    probe: Box<dyn CapabilityProbe>,
}

impl<L: WorkerLauncher> Supervisor<L> {
    pub fn new(
        launcher: L,
        policy: RemapPolicy,
        filter: DeviceFilter,
        probe: Box<dyn CapabilityProbe>,
    ) -> Self {
        Self {
            launcher,
            workers: Arc::new(Mutex::new(WorkerTable::new())),
            policy,
            filter,
            probe,
        }
    }

    /// Shared worker table, for the reaper thread
    pub fn workers(&self) -> Arc<Mutex<WorkerTable<L::Worker>>> {
        Arc::clone(&self.workers)
    }

    /// Devices that currently have a live worker
    pub fn active_devices(&self) -> Vec<PathBuf> {
        self.workers.lock().devices()
    }

    /// Start reaping finished workers on SIGCHLD
    pub fn spawn_reaper(&self) -> Result<Reaper, SupervisorError> {
        Reaper::spawn(self.workers()).map_err(SupervisorError::Signal)
    }

    /// Drain every finished worker without blocking. Returns how many.
    pub fn reap(&self) -> usize {
        let finished = self.workers.lock().reap_finished();
        for (device, exit) in &finished {
            log::info!("Session for {} ended ({})", device.display(), exit);
        }
        finished.len()
    }

    /// Launch a worker for `candidate` if it qualifies and has none yet.
    ///
    /// Returns the new worker's id, or `None` when nothing was launched.
    pub fn consider(
        &self,
        candidate: &DeviceCandidate,
        discovery: Discovery,
    ) -> Result<Option<u32>, SupervisorError> {
        if !should_remap(
            candidate,
            discovery,
            &self.policy,
            &self.filter,
            self.probe.as_ref(),
        ) {
            return Ok(None);
        }
        let Some(device) = candidate.devnode.clone() else {
            return Ok(None);
        };

        // Reclaim first, so a replugged device whose previous worker has
        // just exited gets a fresh one.
        self.reap();

        let mut workers = self.workers.lock();
        if let Some(existing) = workers.get(&device) {
            log::debug!(
                "{} already served by worker {}",
                device.display(),
                existing.id()
            );
            return Ok(None);
        }

        let worker = self
            .launcher
            .launch(&device)
            .map_err(|source| SupervisorError::Launch {
                device: device.clone(),
                source,
            })?;
        let id = worker.id();
        log::info!("Launched worker {} for {}", id, device.display());
        workers.insert(device, worker);
        Ok(Some(id))
    }

    /// Launch workers for every qualifying device present now.
    pub fn scan(&self, enumerator: &mut dyn DeviceEnumerator) -> Result<usize, SupervisorError> {
        let candidates = enumerator.enumerate().map_err(SupervisorError::Monitor)?;
        Ok(self.launch_all(&candidates, Discovery::InitialScan))
    }

    fn launch_all(&self, candidates: &[DeviceCandidate], discovery: Discovery) -> usize {
        let mut launched = 0;
        for candidate in candidates {
            match self.consider(candidate, discovery) {
                Ok(Some(_)) => launched += 1,
                Ok(None) => {}
                Err(e) => log::error!("{}", e),
            }
        }
        launched
    }

    /// Follow hot-plug events until `shutdown` is set.
    ///
    /// `poll` bounds how long a single wait on the monitor may take, and so
    /// how quickly shutdown is noticed.
    pub fn run(
        &self,
        monitor: &mut dyn HotplugMonitor,
        shutdown: &AtomicBool,
        poll: Duration,
    ) -> Result<(), SupervisorError> {
        while !shutdown.load(Ordering::SeqCst) {
            let candidates = monitor.wait(poll).map_err(SupervisorError::Monitor)?;
            self.launch_all(&candidates, Discovery::Hotplug);
            self.reap();
        }
        Ok(())
    }

    /// Stop every worker and wait for all of them. Returns how many.
    pub fn shutdown(&self) -> usize {
        let exits = self.workers.lock().terminate_all();
        for (device, exit) in &exits {
            log::info!("Stopped session for {} ({})", device.display(), exit);
        }
        exits.len()
    }
}

/// Qualification verdict for every device present now, for `--list-devices`.
pub fn list_candidates(
    enumerator: &mut dyn DeviceEnumerator,
    policy: &RemapPolicy,
    filter: &DeviceFilter,
    probe: &dyn CapabilityProbe,
) -> io::Result<Vec<(DeviceCandidate, bool)>> {
    Ok(enumerator
        .enumerate()?
        .into_iter()
        .map(|candidate| {
            let verdict = should_remap(&candidate, Discovery::InitialScan, policy, filter, probe);
            (candidate, verdict)
        })
        .collect())
}
