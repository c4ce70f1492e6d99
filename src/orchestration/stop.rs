use std::sync::Arc;
use tokio::sync::watch;

/// Requests that running steps stop at the next chunk boundary.
/// Cloning shares the same request.
#[derive(Debug, Clone)]
pub struct StopHandle {
    sender: Arc<watch::Sender<bool>>,
}

/// Read side of a [`StopHandle`], polled by the step executor between chunks
#[derive(Debug, Clone)]
pub struct StopSignal {
    receiver: watch::Receiver<bool>,
}

impl StopHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn request_stop(&self) {
        self.sender.send_replace(true);
    }

    /// Withdraw a stop request so later runs proceed
    pub fn clear(&self) {
        self.sender.send_replace(false);
    }

    pub fn signal(&self) -> StopSignal {
        StopSignal {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn is_requested(&self) -> bool {
        *self.receiver.borrow()
    }
}
