use crate::error::{Result, UploadError};
use crate::response::AssemblyResponse;
use crate::transport::TransferProgressFn;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Progress callback function type for upload progress tracking.
/// Receives the fraction of the payload sent, in `[0.0, 1.0]`.
pub type UploadProgressFn = Arc<dyn Fn(f32) + Send + Sync>;

type SuccessFn = Box<dyn FnOnce(AssemblyResponse) + Send>;
type FailureFn = Box<dyn FnOnce(UploadError, Option<Value>) + Send>;

/// Success and failure handlers for one upload. Consumed on dispatch, so
/// exactly one of them runs, once.
pub struct ResultHandlers {
    on_success: SuccessFn,
    on_failure: FailureFn,
}

impl ResultHandlers {
    pub fn new<S, F>(on_success: S, on_failure: F) -> Self
    where
        S: FnOnce(AssemblyResponse) + Send + 'static,
        F: FnOnce(UploadError, Option<Value>) + Send + 'static,
    {
        ResultHandlers {
            on_success: Box::new(on_success),
            on_failure: Box::new(on_failure),
        }
    }

    /// Deliver an upload outcome. Failures carry the server's JSON error
    /// body when there was one.
    pub fn dispatch(self, result: Result<AssemblyResponse>) {
        match result {
            Ok(response) => (self.on_success)(response),
            Err(error) => {
                let body = error.body().cloned();
                (self.on_failure)(error, body)
            }
        }
    }
}

impl std::fmt::Debug for ResultHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandlers").finish_non_exhaustive()
    }
}

/// Turns byte counts into a non-decreasing fraction for the observer
pub struct ProgressTracker {
    observer: Option<UploadProgressFn>,
    last: Mutex<Option<f32>>,
}

impl ProgressTracker {
    pub fn new(observer: Option<UploadProgressFn>) -> Self {
        ProgressTracker {
            observer,
            last: Mutex::new(None),
        }
    }

    /// Report `sent` out of `total` bytes. Values lower than the last
    /// reported fraction are dropped.
    pub fn report(&self, sent: u64, total: u64) {
        let fraction = if total == 0 {
            1.0
        } else {
            (sent as f64 / total as f64).clamp(0.0, 1.0) as f32
        };
        self.emit(fraction);
    }

    /// Mark the transfer as complete
    pub fn finish(&self) {
        self.emit(1.0);
    }

    /// Adapter handed to the transport
    pub fn transfer_fn(self: &Arc<Self>) -> TransferProgressFn {
        let tracker = Arc::clone(self);
        Arc::new(move |sent, total| tracker.report(sent, total))
    }

    fn emit(&self, fraction: f32) {
        let Some(ref observer) = self.observer else {
            return;
        };

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = *last {
            // 1.0 is only repeated by finish() if it was never reached
            if fraction < previous || (fraction == previous && previous >= 1.0) {
                return;
            }
        }
        *last = Some(fraction);
        drop(last);

        observer(fraction);
    }
}

/// Handle to an upload running on its own thread
#[derive(Debug)]
pub struct UploadHandle {
    inner: JoinHandle<()>,
}

impl UploadHandle {
    pub(crate) fn new(inner: JoinHandle<()>) -> Self {
        UploadHandle { inner }
    }

    /// Check whether the handlers have already run
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the upload to finish and its handler to return
    pub fn join(self) -> Result<()> {
        self.inner
            .join()
            .map_err(|_| UploadError::Transport("upload thread panicked".to_string()))
    }
}
