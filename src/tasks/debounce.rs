use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep_until, Instant},
};

use crate::infrastructure::shutdown::ShutdownListener;

pub type ScanCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Delayed scan trigger. Every `notify` pushes the deadline out to
/// `now + delay`; a burst of mutations therefore produces one scan.
#[derive(Clone)]
pub struct ScanDebouncer {
    tx: mpsc::UnboundedSender<()>,
}

impl ScanDebouncer {
    pub fn spawn(
        delay: Duration,
        callback: ScanCallback,
        shutdown: ShutdownListener,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_loop(delay, rx, callback, shutdown));
        (Self { tx }, handle)
    }

    pub fn notify(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!(target: "debounce", "debouncer stopped; notification dropped");
        }
    }
}

async fn run_loop(
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<()>,
    callback: ScanCallback,
    mut shutdown: ShutdownListener,
) {
    let mut deadline: Option<Instant> = None;
    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(()) => deadline = Some(Instant::now() + delay),
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                tracing::debug!(target: "debounce", "mutations settled; scanning");
                callback().await;
            }
            _ = shutdown.notified() => break,
        }
    }
    tracing::debug!(target: "debounce", "debouncer stopped");
}
