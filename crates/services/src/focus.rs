//! Foreground-attention monitor for an active test.
//!
//! The monitor only flips an "obscured" flag; it never reads or writes
//! answers. It re-checks the probe on every signal and on a fixed poll, since
//! some hosts drop focus or visibility events.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

/// Events forwarded by the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusSignal {
    FocusGained,
    FocusLost,
    VisibilityChanged(bool),
}

/// Reads the current focus and visibility of the host surface.
pub trait FocusProbe: Send + Sync + 'static {
    fn has_focus(&self) -> bool;
    fn is_visible(&self) -> bool;

    fn is_obscured(&self) -> bool {
        !(self.has_focus() && self.is_visible())
    }
}

pub struct FocusMonitor;

impl FocusMonitor {
    /// Start monitoring on the current tokio runtime.
    #[must_use]
    pub fn spawn(probe: Arc<dyn FocusProbe>, interval: Duration) -> FocusSubscription {
        let (obscured_tx, obscured_rx) = watch::channel(probe.is_obscured());
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel::<FocusSignal>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    signal = signal_rx.recv() => match signal {
                        Some(signal) => trace!(?signal, "focus signal"),
                        None => break,
                    },
                }

                let obscured = probe.is_obscured();
                let changed = obscured_tx.send_if_modified(|current| {
                    if *current == obscured {
                        false
                    } else {
                        *current = obscured;
                        true
                    }
                });
                if changed {
                    debug!(obscured, "focus state changed");
                }
                if obscured_tx.is_closed() {
                    break;
                }
            }
        });

        FocusSubscription {
            obscured: obscured_rx,
            signals: signal_tx,
            task,
        }
    }
}

/// Handle to a running monitor. Dropping it stops the monitor.
#[derive(Debug)]
pub struct FocusSubscription {
    obscured: watch::Receiver<bool>,
    signals: mpsc::UnboundedSender<FocusSignal>,
    task: JoinHandle<()>,
}

impl FocusSubscription {
    /// Whether question content should currently be withheld.
    #[must_use]
    pub fn is_obscured(&self) -> bool {
        *self.obscured.borrow()
    }

    /// A receiver for awaiting flag changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.obscured.clone()
    }

    /// Forward a host event; the probe is re-checked right away.
    pub fn signal(&self, signal: FocusSignal) {
        if self.signals.send(signal).is_err() {
            trace!(?signal, "focus monitor already stopped");
        }
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FocusSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
