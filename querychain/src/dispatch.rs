//! The hand-off seam between calling threads and the UI-owning thread

use crate::errors::AutomationError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, ThreadId};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, error};

/// A unit of work to run on the UI thread
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Scheduler owning the UI thread
pub trait UiThread: Send + Sync {
    /// Enqueue `job` behind everything already queued.
    fn run_later(&self, job: UiJob) -> Result<(), AutomationError>;

    /// Whether the calling thread is the UI thread.
    fn is_ui_thread(&self) -> bool;
}

/// A dedicated thread that runs queued jobs one at a time, in submission order.
///
/// The thread exits once every handle has been dropped.
#[derive(Clone, Debug)]
pub struct EventLoop {
    sender: mpsc::UnboundedSender<UiJob>,
    thread_id: ThreadId,
}

impl EventLoop {
    pub fn spawn() -> Result<Self, AutomationError> {
        Self::spawn_named("querychain-ui")
    }

    pub fn spawn_named(name: &str) -> Result<Self, AutomationError> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<UiJob>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!("UI event loop started");
                while let Some(job) = receiver.blocking_recv() {
                    // A panicking job must not take the loop down with it.
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                        error!("UI job panicked: {}", panic_message(payload.as_ref()));
                    }
                }
                debug!("UI event loop stopped");
            })
            .map_err(|e| {
                AutomationError::PlatformError(format!("Failed to spawn UI thread: {e}"))
            })?;

        Ok(Self {
            sender,
            thread_id: handle.thread().id(),
        })
    }
}

impl UiThread for EventLoop {
    fn run_later(&self, job: UiJob) -> Result<(), AutomationError> {
        self.sender
            .send(job)
            .map_err(|_| AutomationError::Internal("UI event loop has stopped".to_string()))
    }

    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }
}

/// Runs `f`, which blocks the calling thread, without stalling an async runtime
/// the caller may be running on.
///
/// Multi-thread workers hand their tasks off through `block_in_place`. A
/// current-thread runtime has no other worker, so `f` moves to a scoped thread
/// outside the runtime context while the caller waits for it.
pub(crate) fn blocking_section<R, F>(f: F) -> Result<R, AutomationError>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    let Ok(handle) = Handle::try_current() else {
        return Ok(f());
    };
    match handle.runtime_flavor() {
        RuntimeFlavor::CurrentThread => thread::scope(|scope| {
            thread::Builder::new()
                .name("querychain-block".to_string())
                .spawn_scoped(scope, f)
                .map_err(|e| {
                    AutomationError::PlatformError(format!("Failed to spawn blocking thread: {e}"))
                })?
                .join()
                .map_err(|payload| {
                    AutomationError::Internal(format!(
                        "Blocking section panicked: {}",
                        panic_message(payload.as_ref())
                    ))
                })
        }),
        _ => Ok(task::block_in_place(f)),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
