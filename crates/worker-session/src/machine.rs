//! Session state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! The driver (`driver.rs`) executes the I/O implied by each action and owns
//! the timers the current state needs.

use crate::protocol::InboundMessage;

/// Session states.
///
/// Transitions:
/// - Disconnected → Connecting (start)
/// - Connecting → AwaitingRegistration (connection opened)
/// - AwaitingRegistration → Heartbeating (REGISTER sent, no ack awaited)
/// - Connecting/AwaitingRegistration/Heartbeating → Closing { reconnect: true } (connection lost)
/// - Closing { reconnect: true } → Connecting (reconnect delay elapsed)
/// - any → Closing { reconnect: false } (close requested by the owner)
/// - Closing { reconnect: false } → Disconnected (terminal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingRegistration,
    Heartbeating { beats: u64 },
    Closing { reconnect: bool },
}

impl SessionState {
    /// State label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingRegistration => "awaiting_registration",
            SessionState::Heartbeating { .. } => "heartbeating",
            SessionState::Closing { .. } => "closing",
        }
    }
}

/// Events that drive state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Owner started the session
    Start,
    /// Connection opened
    Connected,
    /// REGISTER written to the connection
    RegistrationSent,
    /// Heartbeat timer fired
    HeartbeatDue,
    /// Frame received while connected
    Inbound(InboundMessage),
    /// Connection failed to open, was closed by the remote, or broke
    ConnectionLost(String),
    /// Owner asked for the session to end
    CloseRequested,
    /// Reconnect delay elapsed
    ReconnectTimer,
}

/// Actions the driver should execute after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open the connection through the account's egress
    OpenConnection,
    /// Send REGISTER
    SendRegistration,
    /// Arm the heartbeat timer and start listening
    StartHeartbeat,
    /// Send HEARTBEAT
    SendHeartbeat,
    /// Send JOB_ASSIGNED for this job
    AcknowledgeJob { job_id: String },
    /// Cancel the heartbeat timer and wait the reconnect delay
    ScheduleReconnect,
    /// Cancel the heartbeat timer and close the connection
    CloseConnection,
    /// Session is over; return to the owner
    Exit,
    /// Keep listening
    None,
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: SessionState, event: SessionEvent) -> (SessionState, SessionAction) {
    match (state, event) {
        // --- Disconnected ---
        (SessionState::Disconnected, SessionEvent::Start) => {
            (SessionState::Connecting, SessionAction::OpenConnection)
        }
        (SessionState::Disconnected, _) => (SessionState::Disconnected, SessionAction::Exit),

        // --- Requested close wins over everything still running ---
        (SessionState::Closing { reconnect: false }, _) => {
            (SessionState::Disconnected, SessionAction::Exit)
        }
        (_, SessionEvent::CloseRequested) => (
            SessionState::Closing { reconnect: false },
            SessionAction::CloseConnection,
        ),

        // --- Connecting ---
        (SessionState::Connecting, SessionEvent::Connected) => (
            SessionState::AwaitingRegistration,
            SessionAction::SendRegistration,
        ),

        // --- AwaitingRegistration ---
        (SessionState::AwaitingRegistration, SessionEvent::RegistrationSent) => (
            SessionState::Heartbeating { beats: 0 },
            SessionAction::StartHeartbeat,
        ),

        // --- Heartbeating ---
        (SessionState::Heartbeating { beats }, SessionEvent::HeartbeatDue) => (
            SessionState::Heartbeating { beats: beats + 1 },
            SessionAction::SendHeartbeat,
        ),
        (
            SessionState::Heartbeating { beats },
            SessionEvent::Inbound(InboundMessage::Job { job_id }),
        ) => (
            SessionState::Heartbeating { beats },
            SessionAction::AcknowledgeJob { job_id },
        ),
        (SessionState::Heartbeating { beats }, SessionEvent::Inbound(_)) => {
            (SessionState::Heartbeating { beats }, SessionAction::None)
        }

        // --- Unrequested loss: reconnect after the delay ---
        (
            SessionState::Connecting
            | SessionState::AwaitingRegistration
            | SessionState::Heartbeating { .. },
            SessionEvent::ConnectionLost(_),
        ) => (
            SessionState::Closing { reconnect: true },
            SessionAction::ScheduleReconnect,
        ),

        (SessionState::Closing { reconnect: true }, SessionEvent::ReconnectTimer) => {
            (SessionState::Connecting, SessionAction::OpenConnection)
        }

        // --- Invalid/unhandled transition: stay in current state ---
        (state, _event) => (state, SessionAction::None),
    }
}
