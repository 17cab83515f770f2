//! Fleet fan-out
//!
//! Starts one supervisor per account and keeps only their status receivers.
//! Supervisors are never restarted here; they exit only on shutdown.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};
use worker_session::Connector;

use crate::account::Account;
use crate::api::RewardsApi;
use crate::error::{Error, Result};
use crate::shutdown::ShutdownCoordinator;
use crate::status::{FleetHealth, StatusReceiver};
use crate::supervisor::{Supervisor, SupervisorConfig};

pub struct Fleet {
    supervisors: JoinSet<()>,
    statuses: Vec<StatusReceiver>,
}

impl Fleet {
    /// Build a client per account with `client_for`, then spawn every
    /// supervisor under a token registered with `shutdown`.
    ///
    /// All clients are built before anything is spawned, so a bad egress
    /// fails startup instead of leaving part of the fleet running.
    pub fn start<F>(
        accounts: Vec<Account>,
        config: &SupervisorConfig,
        connector: Arc<dyn Connector>,
        shutdown: &ShutdownCoordinator,
        mut client_for: F,
    ) -> Result<Self>
    where
        F: FnMut(&Account) -> rewards_api::Result<Arc<dyn RewardsApi>>,
    {
        if accounts.is_empty() {
            return Err(Error::NoAccounts);
        }

        let mut prepared = Vec::with_capacity(accounts.len());
        for account in accounts {
            let api = client_for(&account).map_err(|source| Error::Client {
                index: account.index,
                source,
            })?;
            prepared.push(Supervisor::new(
                account,
                api,
                connector.clone(),
                config.clone(),
            ));
        }

        let mut supervisors = JoinSet::new();
        let mut statuses = Vec::with_capacity(prepared.len());
        for (supervisor, status) in prepared {
            statuses.push(status);
            supervisors.spawn(supervisor.run(shutdown.register()));
        }
        info!(accounts = statuses.len(), "fleet started");

        Ok(Self {
            supervisors,
            statuses,
        })
    }

    /// Status receivers in account order, for the admin listener.
    pub fn statuses(&self) -> Vec<StatusReceiver> {
        self.statuses.clone()
    }

    pub fn health(&self) -> FleetHealth {
        FleetHealth::from_receivers(&self.statuses)
    }

    /// Wait for every supervisor to finish.
    pub async fn wait(mut self) {
        while let Some(result) = self.supervisors.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "supervisor task failed");
            }
        }
        info!("all supervisors stopped");
    }
}
