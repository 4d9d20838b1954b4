//! Structures to keep the process alive until some event occurs

use domain::lifecycle::DeathReason;
use futures::channel::mpsc::{channel, Receiver, Sender};
use futures::{SinkExt, StreamExt};
use tokio::signal::ctrl_c;
use tracing::{debug, error};

/// Action to a heart
#[derive(Debug)]
enum HeartInteraction {
    /// Kill it for the given reason
    Kill(String),
}

/// Lifecycle management struct that can be used to keep the application alive
pub struct Heart {
    /// Receiver for interactions sent by heart stone
    rx: Receiver<HeartInteraction>,
}

impl Heart {
    /// Creates a new heart and linked stone
    pub fn new() -> (Self, HeartStone) {
        let (tx, rx) = channel(2);
        (Self { rx }, HeartStone { remote: tx })
    }

    /// Creates a new heart and discards the linked stone
    ///
    /// The heart then only dies through external signals.
    pub fn without_heart_stone() -> Self {
        Heart::new().0
    }

    /// Future that waits until the heart dies for the returned reason
    pub async fn death(&mut self) -> DeathReason {
        debug!("Heart starts beating");

        let mut stones_alive = true;

        loop {
            tokio::select! {
                interaction = self.rx.next(), if stones_alive => match interaction {
                    Some(HeartInteraction::Kill(reason)) => return DeathReason::Killed(reason),
                    None => stones_alive = false,
                },
                _ = termination_signal() => return DeathReason::Terminated,
            }
        }
    }
}

#[cfg(unix)]
async fn termination_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => {},
                _ = ctrl_c() => {},
            }
        }
        Err(error) => {
            error!(?error, "Unable to listen for SIGTERM, falling back to SIGINT only");
            ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn termination_signal() {
    ctrl_c().await.ok();
}

/// Remote controller for the heart
#[derive(Clone)]
pub struct HeartStone {
    remote: Sender<HeartInteraction>,
}

impl HeartStone {
    /// Kill the associated heart
    pub async fn kill(&mut self, reason: String) {
        if let Err(e) = self.remote.send(HeartInteraction::Kill(reason)).await {
            error!("Failed to interact with Heart: {}", e);
        }
    }
}
