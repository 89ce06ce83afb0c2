//! AMF termination coordinator
//!
//! Owns the one-way Idle -> Draining -> Terminated state machine and the
//! best-effort drain sequence run on the way down: notify connected RAN
//! peers that the served GUAMIs became unavailable, close the NGAP
//! listeners, deregister from the NRF, then notify in-process subscribers.
//! Every step is attempted regardless of earlier failures.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};

use nova5gc_sbi::Guami;

use crate::callback::{NfAvailability, StatusSubscribers};
use crate::consumer::NrfClient;
use crate::ngap_path::{self, ListenerSet, PeerPool, RanNotice};

const STATE_IDLE: u8 = 0;
const STATE_DRAINING: u8 = 1;
const STATE_TERMINATED: u8 = 2;

/// Upper bound on waiting for a peer's session task to confirm the
/// unavailability notice went out; a stalled peer must not hang the drain.
const NOTICE_DELIVERY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Idle,
    Draining,
    Terminated,
}

impl From<u8> for ShutdownState {
    fn from(raw: u8) -> Self {
        match raw {
            STATE_IDLE => ShutdownState::Idle,
            STATE_DRAINING => ShutdownState::Draining,
            _ => ShutdownState::Terminated,
        }
    }
}

/// Coordinates the drain sequence. `trigger` admits exactly one caller even
/// when an OS signal races an explicit invocation.
pub struct ShutdownCoordinator {
    state: AtomicU8,
    pool: PeerPool,
    listeners: Mutex<ListenerSet>,
    nrf: Arc<NrfClient>,
    subscribers: Arc<StatusSubscribers>,
    guami_list: Vec<Guami>,
}

impl ShutdownCoordinator {
    pub fn new(
        pool: PeerPool,
        listeners: ListenerSet,
        nrf: Arc<NrfClient>,
        subscribers: Arc<StatusSubscribers>,
        guami_list: Vec<Guami>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(STATE_IDLE),
            pool,
            listeners: Mutex::new(listeners),
            nrf,
            subscribers,
            guami_list,
        })
    }

    pub fn state(&self) -> ShutdownState {
        self.state.load(Ordering::SeqCst).into()
    }

    /// Run the drain sequence once. Returns false when a drain is already
    /// in progress or finished; the caller then has nothing left to do.
    pub async fn trigger(&self) -> bool {
        if self
            .state
            .compare_exchange(
                STATE_IDLE,
                STATE_DRAINING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            log::debug!("Termination already in progress, ignoring trigger");
            return false;
        }

        log::info!("Terminating AMF");

        // 1. Tell connected RAN peers the served GUAMIs are going away.
        // Delivery is confirmed per peer before moving on, so the process
        // does not exit with the notice still queued.
        let frame = ngap_path::build_amf_status_indication(&self.guami_list);
        let senders = ngap_path::snapshot_senders(&self.pool).await;
        log::info!("Notifying {} RAN peers of AMF unavailability", senders.len());
        let mut pending = Vec::with_capacity(senders.len());
        for (id, tx) in senders {
            let (done_tx, done_rx) = oneshot::channel();
            let notice = RanNotice::AmfUnavailable {
                frame: frame.clone(),
                done: done_tx,
            };
            if tx.send(notice).is_err() {
                log::warn!("RAN peer {id} gone before status indication");
                continue;
            }
            pending.push((id, done_rx));
        }
        for (id, done) in pending {
            match tokio::time::timeout(NOTICE_DELIVERY_TIMEOUT, done).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    log::warn!("RAN peer {id} dropped before the status indication was sent");
                }
                Err(_) => {
                    log::warn!("Timed out delivering status indication to RAN peer {id}");
                }
            }
        }

        // 2. Close the NGAP listeners
        self.listeners.lock().await.close_all().await;

        // 3. Deregister from the NRF
        match self.nrf.deregister().await {
            Ok(None) => {}
            Ok(Some(problem)) => {
                log::warn!(
                    "NRF deregistration reported a problem: status={:?} cause={:?}",
                    problem.status,
                    problem.cause
                );
            }
            Err(e) => {
                log::error!("NRF deregistration failed: {e}");
            }
        }

        // 4. Notify in-process subscribers
        self.subscribers
            .notify_status_change(NfAvailability::Unavailable, &self.guami_list);

        self.state.store(STATE_TERMINATED, Ordering::SeqCst);
        log::info!("AMF terminated");
        true
    }
}

/// Arm the OS signal path: SIGINT/SIGTERM run the same drain entry point an
/// explicit caller would, then exit the process with success.
pub fn arm_signal_task(coordinator: Arc<ShutdownCoordinator>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        log::info!("Received shutdown signal");
        coordinator.trigger().await;
        std::process::exit(0);
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
