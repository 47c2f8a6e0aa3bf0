//! Background maintenance
//!
//! A single task that periodically drops idle games and lifts timed sanctions
//! whose expiry has passed. Other code can ask for an immediate pass through
//! [`MaintenanceHandle`].

use crate::dispatcher::Dispatcher;
use crate::game::GameEngine;
use crate::moderation::SanctionEngine;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, error, info};

const CHANNEL_CAPACITY: usize = 100;

/// Work the maintenance task can be asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceRequest {
    SweepAll,
    SweepGames,
    LiftDueSanctions,
    Shutdown,
}

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("Maintenance task is not running")]
    Stopped,
}

/// What one pass cleaned up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub games: usize,
    pub sanctions: usize,
}

/// Sender side of the maintenance task
#[derive(Debug, Clone)]
pub struct MaintenanceHandle {
    tx: Sender<MaintenanceRequest>,
}

impl MaintenanceHandle {
    /// # Errors
    /// `Stopped` once the task has shut down
    pub async fn request(&self, request: MaintenanceRequest) -> Result<(), MaintenanceError> {
        self.tx.send(request).await.map_err(|e| {
            error!("Failed to send maintenance request: {e}");
            MaintenanceError::Stopped
        })
    }

    /// # Errors
    /// `Stopped` if the task was already gone
    pub async fn shutdown(&self) -> Result<(), MaintenanceError> {
        self.request(MaintenanceRequest::Shutdown).await
    }
}

#[derive(Clone)]
pub struct MaintenanceService {
    sanctions: SanctionEngine,
    games: GameEngine,
    game_ttl: chrono::Duration,
}

impl MaintenanceService {
    pub fn new(sanctions: SanctionEngine, games: GameEngine, game_ttl: chrono::Duration) -> Self {
        Self {
            sanctions,
            games,
            game_ttl,
        }
    }

    /// Service over the dispatcher's own engines
    pub fn for_dispatcher(dispatcher: &Dispatcher, game_ttl: chrono::Duration) -> Self {
        Self::new(dispatcher.sanctions().clone(), dispatcher.games().clone(), game_ttl)
    }

    pub fn sweep_games(&self) -> usize {
        self.games.sweep_expired(self.game_ttl)
    }

    pub async fn lift_due_sanctions(&self) -> usize {
        self.sanctions.lift_due_sanctions(Utc::now()).await
    }

    pub async fn sweep_all(&self) -> SweepReport {
        SweepReport {
            games: self.sweep_games(),
            sanctions: self.lift_due_sanctions().await,
        }
    }

    /// Spawn the task. It runs a full pass straight away and then every
    /// `interval` until shut down or every handle is dropped.
    pub fn start(self, interval: Duration) -> (MaintenanceHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(async move {
            self.maintenance_task(rx, interval).await;
        });
        (MaintenanceHandle { tx }, task)
    }

    async fn maintenance_task(&self, mut rx: Receiver<MaintenanceRequest>, period: Duration) {
        info!("Starting maintenance task with {}s interval", period.as_secs());

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                request = rx.recv() => {
                    match request {
                        Some(MaintenanceRequest::SweepAll) => {
                            info!("Received request for a full maintenance pass");
                            let report = self.sweep_all().await;
                            info!(games = report.games, sanctions = report.sanctions, "Maintenance pass done");
                        }
                        Some(MaintenanceRequest::SweepGames) => {
                            let games = self.sweep_games();
                            info!(games, "Received request to sweep games");
                        }
                        Some(MaintenanceRequest::LiftDueSanctions) => {
                            let sanctions = self.lift_due_sanctions().await;
                            info!(sanctions, "Received request to lift due sanctions");
                        }
                        Some(MaintenanceRequest::Shutdown) => {
                            info!("Received shutdown request for maintenance task");
                            break;
                        }
                        None => {
                            info!("All maintenance handles dropped");
                            break;
                        }
                    }
                }

                _ = interval.tick() => {
                    let report = self.sweep_all().await;
                    debug!(games = report.games, sanctions = report.sanctions, "Periodic maintenance pass");
                }
            }
        }

        info!("Maintenance task shut down");
    }
}
