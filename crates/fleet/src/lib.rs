//! Account supervision and fleet fan-out
//!
//! One [`Supervisor`] per account drives the credential client and the worker
//! session together; [`Fleet`] starts them all and ties them to a single
//! [`ShutdownCoordinator`].
//!
//! Account cycle:
//! 1. Acquire a credential, retrying every few seconds until one is issued
//! 2. Claim the daily reward if it is still open, log the point total
//! 3. Open the session and mark the account connected
//! 4. Poll points (10 min) and claims (60 min); a rejected credential closes
//!    the session and restarts from step 1
//! 5. Shutdown cancels every account's timers and closes every session once

pub mod account;
pub mod api;
pub mod error;
pub mod orchestrator;
pub mod shutdown;
pub mod status;
pub mod supervisor;

pub use account::{Account, assign_egress, plan_accounts};
pub use api::RewardsApi;
pub use error::{Error, Result};
pub use orchestrator::Fleet;
pub use shutdown::ShutdownCoordinator;
pub use status::{AccountStatus, ConnectionStatus, FleetHealth, StatusReceiver};
pub use supervisor::{Supervisor, SupervisorConfig, SupervisorTiming};
