//! Comms subsystem — manages all external I/O channels.
//!
//! # Architecture
//!
//! Each channel (PTY, Telegram) implements [`runtime::Component`] and is
//! spawned as an independent concurrent task by [`start`] via
//! [`runtime::spawn_components`].  Channels capture their shared
//! [`Arc<CommsState>`] at construction time — no state is passed through the
//! generic `Component::run` signature.
//!
//! An intra-subsystem [`mpsc`] channel lets running channels signal the
//! comms manager (ready, shut down).  This is drained in a short-lived
//! background task that dies naturally when all channel senders are dropped.
//!
//! [`runtime::Component`]: crate::subsystems::runtime::Component
//! [`runtime::spawn_components`]: crate::subsystems::runtime::spawn_components

mod state;
#[cfg(feature = "channel-pty")]
pub mod pty;
#[cfg(feature = "channel-telegram")]
pub mod telegram;
#[cfg(feature = "channel-webhook")]
mod webhook;

pub use state::{CommsEvent, CommsState};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::supervisor::bus::BusHandle;
use crate::subsystems::runtime::{Component, SubsystemHandle, spawn_components};

// ── start ───────────────────────────────────────────────────────────────────

/// Spawn all configured comms channels and return a [`SubsystemHandle`].
///
/// Channels start immediately.  If any channel exits with an error the shared
/// `shutdown` token is cancelled so siblings stop cooperatively.  The handle
/// resolves when all channels have exited.
///
/// This function is synchronous — it returns as soon as the tasks are
/// spawned.  The caller decides when (or whether) to await the handle.
pub fn start(
    config: &Config,
    bus: BusHandle,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(32);
    let state = Arc::new(CommsState::new(bus, event_tx));

    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    {
        if config.comms_pty_should_load() {
            info!("loading pty channel");
            components.push(Box::new(pty::PtyChannel::new(
                "pty0",
                config.comms.pty.user_id.clone(),
                state.clone(),
            )));
        }
    }

    #[cfg(feature = "channel-telegram")]
    {
        if config.comms_telegram_should_load() {
            info!(mode = ?config.comms.telegram.mode, "loading telegram channel");
            components.push(Box::new(telegram::TelegramChannel::new(
                "telegram0",
                config.comms.telegram.clone(),
                state.clone(),
            )));
        }
    }
    #[cfg(not(feature = "channel-telegram"))]
    if config.comms_telegram_should_load() {
        warn!("telegram enabled in config but not compiled in");
    }

    if components.is_empty() {
        warn!("no comms channels configured — waiting for shutdown");
        let shutdown = shutdown.clone();
        return SubsystemHandle::from_handle(tokio::spawn(async move {
            shutdown.cancelled().await;
            Ok(())
        }));
    }

    // Monitoring only: the drain ends once every channel has dropped its state.
    drop(state);
    tokio::spawn(async move {
        let mut rx = event_rx;
        while let Some(event) = rx.recv().await {
            match event {
                CommsEvent::ChannelReady { ref channel_id } => {
                    info!(channel_id, "channel ready");
                }
                CommsEvent::ChannelShutdown { ref channel_id } => {
                    debug!(channel_id, "channel reported shutdown");
                }
            }
        }
    });

    spawn_components(components, shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::bus::SupervisorBus;

    #[tokio::test]
    async fn no_channels_waits_for_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::test_default(dir.path());
        config.comms.pty.enabled = false;
        let bus = SupervisorBus::new(4);
        let shutdown = CancellationToken::new();

        let handle = start(&config, bus.handle.clone(), shutdown.clone());
        shutdown.cancel();
        handle.join().await.unwrap();
    }
}
