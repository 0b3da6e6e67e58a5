use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::warn;

/// Liveness deadline for the upload session.
///
/// Every ping or other inbound activity pushes the deadline out by the
/// configured timeout. Once it passes, the connected flag drops and stays
/// down until a new session starts. The deadline is watched by a background
/// task, so it lapses even while nothing is reading from the connection.
#[derive(Debug)]
pub struct Heartbeat {
    timeout: Duration,
    deadline: watch::Sender<Instant>,
    connected: Arc<AtomicBool>,
    lapsed: Arc<Notify>,
    watchdog: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub fn new(timeout: Duration) -> Self {
        let (deadline, _) = watch::channel(Instant::now() + timeout);
        Self {
            timeout,
            deadline,
            connected: Arc::new(AtomicBool::new(true)),
            lapsed: Arc::new(Notify::new()),
            watchdog: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn deadline(&self) -> Instant {
        *self.deadline.borrow()
    }

    /// Starts the background watch of the deadline. Calling it again is a
    /// no-op.
    pub fn watch(&mut self) {
        if self.watchdog.is_some() {
            return;
        }
        let mut deadline = self.deadline.subscribe();
        let connected = self.connected.clone();
        let lapsed = self.lapsed.clone();
        self.watchdog = Some(tokio::spawn(async move {
            loop {
                let at = *deadline.borrow_and_update();
                tokio::select! {
                    _ = sleep_until(at) => {
                        warn!("Heartbeat lapsed");
                        connected.store(false, Ordering::SeqCst);
                        lapsed.notify_one();
                        return;
                    }
                    changed = deadline.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                }
            }
        }));
    }

    pub fn beat(&mut self) {
        self.deadline.send_replace(Instant::now() + self.timeout);
    }

    pub fn expire(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && !self.is_expired()
    }

    /// Shared view of the connected flag for observers outside the session.
    pub fn flag(&self) -> Arc<AtomicBool> {
        self.connected.clone()
    }

    /// Signalled once by the watchdog when the deadline passes.
    pub fn lapsed(&self) -> Arc<Notify> {
        self.lapsed.clone()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn beat_pushes_the_deadline_out() {
        let mut heartbeat = Heartbeat::new(Duration::from_millis(32_500));
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!heartbeat.is_expired());

        heartbeat.beat();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!heartbeat.is_expired());
        assert!(heartbeat.is_connected());

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(heartbeat.is_expired());
        assert!(!heartbeat.is_connected());

        let flag = heartbeat.flag();
        heartbeat.expire();
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_drops_the_flag_without_reads() {
        let mut heartbeat = Heartbeat::new(Duration::from_secs(10));
        let flag = heartbeat.flag();
        let lapsed = heartbeat.lapsed();
        heartbeat.watch();

        tokio::time::sleep(Duration::from_secs(8)).await;
        heartbeat.beat();
        tokio::time::sleep(Duration::from_secs(8)).await;
        assert!(flag.load(Ordering::SeqCst));

        lapsed.notified().await;
        assert!(!flag.load(Ordering::SeqCst));
        assert!(heartbeat.is_expired());
    }
}
