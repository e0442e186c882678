// ctrl2esc Supervisor - Reaper
// Reclaims finished workers as soon as SIGCHLD arrives

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use signal_hook::consts::SIGCHLD;
use signal_hook::iterator::{Handle, Signals};

use super::worker::{Worker, WorkerTable};

/// Background thread draining finished workers on every SIGCHLD.
///
/// Stops and joins the thread when dropped.
pub struct Reaper {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl Reaper {
    pub fn spawn<W: Worker + 'static>(workers: Arc<Mutex<WorkerTable<W>>>) -> io::Result<Self> {
        let mut signals = Signals::new([SIGCHLD])?;
        let handle = signals.handle();

        let thread = std::thread::Builder::new()
            .name("reaper".to_string())
            .spawn(move || {
                for _ in signals.forever() {
                    for (device, exit) in workers.lock().reap_finished() {
                        log::info!("Session for {} ended ({})", device.display(), exit);
                    }
                }
            })?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
