//! The announce loop.
//!
//! A single long-lived task owns the emission cadence: it reacts to core
//! start/stop and epoch signals, drives the gossip ticker through a
//! three-state frequency machine, and runs version reconciliation on a slow
//! ticker. Handler failures never propagate into the loop; every event is
//! handled to completion before the next is taken.
//!
//! Cadence, from core start:
//!
//! 1. [`CadenceState::HighFreqBeforeFirstPeer`] — announce every minute
//!    until the first peer connects.
//! 2. [`CadenceState::HighFreqAfterFirstPeer`] — keep the 1-minute cadence
//!    for ten more ticks, giving a possibly partitioned young network time
//!    to join the broader one.
//! 3. [`CadenceState::LowFreq`] — announce every ten minutes from then on.

use {
    crate::{config::AnnounceConfig, gossip::Gossip},
    log::{info, warn},
    std::{future, sync::Arc},
    tokio::{
        sync::{mpsc, watch},
        task::JoinHandle,
        time::{self, Instant, Interval},
    },
};

/// The announce emission frequency states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadenceState {
    HighFreqBeforeFirstPeer,
    HighFreqAfterFirstPeer,
    LowFreq,
}

/// The frequency state machine, advanced once per gossip tick before the
/// tick's emission.
#[derive(Debug)]
pub struct GossipCadence {
    state: CadenceState,
    ticks_in_high_freq: u32,
    decay_after: u32,
}

impl GossipCadence {
    pub fn new(decay_after: u32) -> Self {
        Self {
            state: CadenceState::HighFreqBeforeFirstPeer,
            ticks_in_high_freq: 0,
            decay_after,
        }
    }

    pub fn state(&self) -> CadenceState {
        self.state
    }

    /// Advance the machine on a gossip tick.
    pub fn on_tick(&mut self, connected_peers: usize) {
        match self.state {
            CadenceState::HighFreqBeforeFirstPeer => {
                if connected_peers > 0 {
                    self.state = CadenceState::HighFreqAfterFirstPeer;
                }
            }
            CadenceState::HighFreqAfterFirstPeer => {
                if self.ticks_in_high_freq >= self.decay_after {
                    self.state = CadenceState::LowFreq;
                }
                self.ticks_in_high_freq += 1;
            }
            CadenceState::LowFreq => {}
        }
    }
}

/// Handle to the announce loop task.
///
/// Dropping the service without calling [`AnnounceService::shutdown`] leaves
/// the loop running detached; shutdown signals the loop and joins it so the
/// surrounding subsystem stops deterministically.
pub struct AnnounceService {
    core_tx: mpsc::Sender<bool>,
    epoch_tx: mpsc::Sender<()>,
    quit_tx: mpsc::Sender<()>,
    cadence_rx: watch::Receiver<CadenceState>,
    handle: JoinHandle<()>,
}

impl AnnounceService {
    /// Spawn the announce loop for `gossip`.
    pub fn spawn(gossip: Arc<Gossip>) -> Self {
        let (core_tx, core_rx) = mpsc::channel(8);
        let (epoch_tx, epoch_rx) = mpsc::channel(8);
        let (quit_tx, quit_rx) = mpsc::channel(1);
        let (cadence_tx, cadence_rx) =
            watch::channel(CadenceState::HighFreqBeforeFirstPeer);

        let handle = tokio::spawn(run(gossip, core_rx, epoch_rx, quit_rx, cadence_tx));
        Self {
            core_tx,
            epoch_tx,
            quit_tx,
            cadence_rx,
            handle,
        }
    }

    /// Signal that validating started (`true`) or stopped (`false`).
    pub async fn set_core_running(&self, running: bool) {
        let _ = self.core_tx.send(running).await;
    }

    /// Signal an epoch boundary.
    pub async fn notify_new_epoch(&self) {
        let _ = self.epoch_tx.send(()).await;
    }

    /// The current frequency state, for observability.
    pub fn cadence(&self) -> CadenceState {
        *self.cadence_rx.borrow()
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.quit_tx.send(()).await;
        let _ = self.handle.await;
    }
}

async fn run(
    gossip: Arc<Gossip>,
    mut core_rx: mpsc::Receiver<bool>,
    mut epoch_rx: mpsc::Receiver<()>,
    mut quit_rx: mpsc::Receiver<()>,
    cadence_tx: watch::Sender<CadenceState>,
) {
    let config: AnnounceConfig = gossip.config().clone();
    let mut version_check = time::interval_at(
        Instant::now() + config.version_check_period(),
        config.version_check_period(),
    );
    let mut gossip_ticker: Option<Interval> = None;
    let mut ticker_period = config.high_freq_period();
    let mut cadence = GossipCadence::new(config.high_freq_ticks_after_first_peer);

    info!("announce loop started");
    loop {
        tokio::select! {
            maybe_running = core_rx.recv() => match maybe_running {
                Some(true) => {
                    gossip.set_core_started(true);
                    if let Err(e) = gossip.gossip_announce() {
                        warn!("failed to gossip announce on core start: {e}");
                    }
                    cadence = GossipCadence::new(config.high_freq_ticks_after_first_peer);
                    let _ = cadence_tx.send(cadence.state());
                    ticker_period = config.high_freq_period();
                    gossip_ticker =
                        Some(time::interval_at(Instant::now() + ticker_period, ticker_period));
                }
                Some(false) => {
                    gossip.set_core_started(false);
                    gossip_ticker = None;
                }
                None => break,
            },
            maybe_epoch = epoch_rx.recv() => match maybe_epoch {
                Some(()) => {
                    if gossip.core_started() {
                        if let Err(e) = gossip.gossip_announce() {
                            warn!("failed to gossip announce on epoch boundary: {e}");
                        }
                    }
                    gossip.check_peers_announce_versions();
                }
                None => break,
            },
            _ = gossip_tick(&mut gossip_ticker) => {
                cadence.on_tick(gossip.connected_peer_count());
                let _ = cadence_tx.send(cadence.state());
                if cadence.state() == CadenceState::LowFreq
                    && ticker_period != config.low_freq_period()
                {
                    ticker_period = config.low_freq_period();
                    gossip_ticker =
                        Some(time::interval_at(Instant::now() + ticker_period, ticker_period));
                }
                if let Err(e) = gossip.gossip_announce() {
                    warn!("failed to gossip announce on tick: {e}");
                }
            },
            _ = version_check.tick() => {
                gossip.check_peers_announce_versions();
            },
            _ = quit_rx.recv() => break,
        }
    }
    info!("announce loop stopped");
}

/// Await the next gossip tick; pends forever while the ticker is stopped.
async fn gossip_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending().await,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
