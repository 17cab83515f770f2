//! Persistent worker connection for one account
//!
//! A session owns a single bidirectional connection to the coordination
//! service. Its lifecycle is the pure transition function in [`machine`];
//! [`Session::run`] executes the actions it returns against a
//! [`Connector`], so the same state machine drives both the real WebSocket
//! transport and in-memory test doubles.
//!
//! Lifecycle of one session:
//! 1. `Connecting`: open the connection through the account's egress
//! 2. `AwaitingRegistration`: send REGISTER once, without waiting for an ack
//! 3. `Heartbeating`: HEARTBEAT on a fixed cadence, JOB_ASSIGNED per inbound JOB
//! 4. `Closing`: on unrequested loss wait, then reconnect with the same
//!    identity; on a requested close, stop for good

pub mod connection;
pub mod driver;
pub mod error;
pub mod machine;
pub mod protocol;
pub mod websocket;

pub use connection::{Connection, Connector, connection_url};
pub use driver::{Session, SessionReport, SessionTiming};
pub use error::{Error, Result};
pub use machine::{SessionAction, SessionEvent, SessionState, handle_event};
pub use protocol::{CapacityProfile, InboundMessage, WorkerIdentity};
pub use websocket::WsConnector;
