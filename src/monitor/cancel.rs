//! One-shot request-to-stop handshake between the control path and the
//! monitor loop.
//!
//! Cancelling drops the only sender, which every clone of the token
//! observes as a disconnected channel.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Held by the control path; consumed when cancelling
#[derive(Debug)]
pub struct CancelHandle {
    _tx: Sender<()>,
}

impl CancelHandle {
    pub fn cancel(self) {
        drop(self);
    }
}

/// Held by the monitor loop
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Suspend for up to `timeout`; returns `true` as soon as cancellation
    /// is requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => true,
            // nothing is ever sent; only the disconnect carries meaning
            Ok(()) => self.is_cancelled(),
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = bounded(0);
    (CancelHandle { _tx: tx }, CancelToken { rx })
}
