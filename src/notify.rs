// Transient on-screen notices.
// Any thread may post through a `Notifier`; the frame loop owns the
// `NotificationCenter`, drains the channel once per frame and keeps only
// the newest notice.

use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::time::{Duration, Instant};

/// Short notices: tool changes, guide pages, undo.
pub const SHORT: Duration = Duration::from_secs(1);
/// Save results.
pub const LONG: Duration = Duration::from_secs(3);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub expires_at: Instant,
}

impl Notification {
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cheap, cloneable sending half. Posting never blocks and never fails
/// loudly; a notice sent after the frame loop is gone is simply dropped.
#[derive(Clone, Debug)]
pub struct Notifier {
    tx: Sender<Notification>,
}

impl Notifier {
    pub fn post(&self, text: impl Into<String>, duration: Duration) {
        let note = Notification { text: text.into(), expires_at: Instant::now() + duration };
        if self.tx.send(note).is_err() {
            tracing::debug!("notification dropped, receiver gone");
        }
    }
}

pub struct NotificationCenter {
    rx: Receiver<Notification>,
    tx: Sender<Notification>,
    current: Option<Notification>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { rx, tx, current: None }
    }

    pub fn notifier(&self) -> Notifier {
        Notifier { tx: self.tx.clone() }
    }

    /// Pull everything posted since the last call; the last one wins.
    pub fn pump(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(note) => self.current = Some(note),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Pump, then return the notice to draw at `now`, if it has not expired.
    pub fn live(&mut self, now: Instant) -> Option<&Notification> {
        self.pump();
        if self.current.as_ref().is_some_and(|n| !n.is_live(now)) {
            self.current = None;
        }
        self.current.as_ref()
    }
}
