//! Per-account status, published by each supervisor on its own watch channel

use serde::Serialize;
use tokio::sync::watch;

/// Receiving side of one supervisor's status channel.
pub type StatusReceiver = watch::Receiver<AccountStatus>;

/// Connection state of one account's current cycle.
///
/// Transitions:
/// - Authenticating → NotConnected (credential acquired, session connecting)
/// - NotConnected ↔ Connected (the session's connection opens or drops)
/// - Connected → NotConnected (credential rejected, or cycle failed)
/// - NotConnected → Authenticating (cycle restarts)
/// - any → Stopped (shutdown)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Authenticating,
    Connected,
    NotConnected,
    Stopped,
}

impl ConnectionStatus {
    /// Status label for health/logging.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Authenticating => "authenticating",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::NotConnected => "not_connected",
            ConnectionStatus::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStatus {
    pub index: usize,
    /// Abbreviated address, safe for the health endpoint
    pub address: String,
    pub status: ConnectionStatus,
    /// Last point total seen, if any poll has succeeded
    pub last_points: Option<u64>,
}

impl AccountStatus {
    pub fn new(index: usize, address: &str) -> Self {
        Self {
            index,
            address: short_address(address),
            status: ConnectionStatus::Authenticating,
            last_points: None,
        }
    }
}

/// `0x1234...abcd` for long addresses, unchanged otherwise.
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Fleet-wide snapshot for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct FleetHealth {
    /// "healthy" (all connected), "degraded" (some) or "unhealthy" (none)
    pub status: &'static str,
    pub connected: usize,
    pub total: usize,
    pub accounts: Vec<AccountStatus>,
}

impl FleetHealth {
    pub fn from_receivers(receivers: &[StatusReceiver]) -> Self {
        let accounts: Vec<AccountStatus> =
            receivers.iter().map(|rx| rx.borrow().clone()).collect();
        Self::from_statuses(accounts)
    }

    pub fn from_statuses(accounts: Vec<AccountStatus>) -> Self {
        let connected = accounts
            .iter()
            .filter(|a| a.status == ConnectionStatus::Connected)
            .count();
        let total = accounts.len();
        let status = if total > 0 && connected == total {
            "healthy"
        } else if connected > 0 {
            "degraded"
        } else {
            "unhealthy"
        };
        Self {
            status,
            connected,
            total,
            accounts,
        }
    }

    pub fn is_unhealthy(&self) -> bool {
        self.status == "unhealthy"
    }
}
