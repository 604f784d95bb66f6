//! Passcode-keyed hand-off between the HTTP endpoint and `/login` flows.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info};

use crate::{AppError, Result};

/// Number of digits in a login passcode.
pub const OTP_DIGITS: usize = 6;

const RESERVE_ATTEMPTS: usize = 8;

/// Thread-safe map of waiting `/login` flows keyed by passcode.
type PendingLogins = Arc<Mutex<HashMap<String, oneshot::Sender<String>>>>;

/// Routes cookies posted to the relay endpoint to whoever awaits the passcode.
#[derive(Clone, Default)]
pub struct LoginRelay {
    pending: PendingLogins,
}

impl LoginRelay {
    /// Create an empty relay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a random six-digit passcode.
    #[must_use]
    pub fn generate_otp() -> String {
        format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
    }

    /// Reserve `otp` and return the receiver its cookie will arrive on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyExists` if another flow is waiting on `otp`.
    pub async fn register(&self, otp: &str) -> Result<oneshot::Receiver<String>> {
        let mut pending = self.pending.lock().await;
        if pending.get(otp).is_some_and(|tx| !tx.is_closed()) {
            return Err(AppError::AlreadyExists(format!(
                "passcode {otp} is already in use"
            )));
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(otp.to_owned(), tx);
        Ok(rx)
    }

    /// Reserve a freshly generated passcode.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyExists` if no free passcode was found.
    pub async fn reserve(&self) -> Result<(String, oneshot::Receiver<String>)> {
        for _ in 0..RESERVE_ATTEMPTS {
            let otp = Self::generate_otp();
            match self.register(&otp).await {
                Ok(rx) => return Ok((otp, rx)),
                Err(AppError::AlreadyExists(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Err(AppError::AlreadyExists(
            "could not find a free login passcode".into(),
        ))
    }

    /// Wait up to `timeout` for the cookie posted with `otp`.
    ///
    /// Returns `Ok(None)` on timeout. The reservation is released either way.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyExists` if `otp` is already reserved.
    pub async fn wait_for(&self, otp: &str, timeout: Duration) -> Result<Option<String>> {
        let rx = self.register(otp).await?;
        Ok(self.receive(otp, rx, timeout).await)
    }

    /// Wait up to `timeout` on a receiver obtained from [`register`](Self::register)
    /// or [`reserve`](Self::reserve), then release the reservation.
    pub async fn receive(
        &self,
        otp: &str,
        rx: oneshot::Receiver<String>,
        timeout: Duration,
    ) -> Option<String> {
        let received = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(clal)) => Some(clal),
            Ok(Err(_)) | Err(_) => None,
        };
        let mut pending = self.pending.lock().await;
        // Only drop our own sender; its receiver is gone by now.
        if pending.get(otp).is_some_and(oneshot::Sender::is_closed) {
            pending.remove(otp);
        }
        drop(pending);
        if received.is_none() {
            debug!(otp, "login wait expired");
        }
        received
    }

    /// Deliver `clal` to the flow waiting on `otp`.
    ///
    /// Returns whether a flow received it.
    pub async fn publish(&self, otp: &str, clal: String) -> bool {
        let sender = self.pending.lock().await.remove(otp);
        let delivered = sender.is_some_and(|tx| tx.send(clal).is_ok());
        info!(delivered, "login relay callback received");
        delivered
    }

    /// Number of passcodes currently reserved.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
