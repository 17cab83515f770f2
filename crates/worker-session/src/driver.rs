//! Session driver
//!
//! Executes the actions returned by [`handle_event`] and turns I/O outcomes
//! back into events. Timers belong to the state that needs them: the
//! heartbeat interval exists only while heartbeating and the reconnect delay
//! only while closing, so leaving a state drops (cancels) its timer.

use std::time::Duration;

use rewards_api::{Credential, Egress};
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::connection::{Connection, Connector, connection_url};
use crate::error::Result;
use crate::machine::{SessionAction, SessionEvent, SessionState, handle_event};
use crate::protocol::{
    CapacityProfile, InboundMessage, WorkerIdentity, heartbeat_message, job_assigned_message,
    register_message,
};

/// Heartbeat cadence
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Wait before reopening after an unrequested close
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            heartbeat_interval: HEARTBEAT_INTERVAL,
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// What a session did before it was closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Connection attempts, including failed ones
    pub connect_attempts: u32,
    pub registrations: u32,
    pub heartbeats: u64,
    pub jobs_acknowledged: u64,
}

/// One account's persistent connection.
///
/// Built from a fresh credential and discarded when that credential is
/// retired. The worker identity, registration id and capacity profile are
/// fixed for the session's lifetime and reused across reconnects.
#[derive(Debug)]
pub struct Session {
    identity: WorkerIdentity,
    registration_id: String,
    capacity: CapacityProfile,
    url: String,
    egress: Option<Egress>,
    timing: SessionTiming,
    link: Option<watch::Sender<bool>>,
}

impl Session {
    pub fn new(
        owner_address: &str,
        worker_host: &str,
        ws_base_url: &str,
        credential: &Credential,
        egress: Option<Egress>,
        timing: SessionTiming,
    ) -> Result<Self> {
        Ok(Self {
            identity: WorkerIdentity::new(owner_address, worker_host),
            registration_id: uuid::Uuid::new_v4().to_string(),
            capacity: CapacityProfile::random(),
            url: connection_url(ws_base_url, credential)?,
            egress,
            timing,
            link: None,
        })
    }

    /// Publish `true` while a connection is open and `false` once it is
    /// released, across every reconnect.
    pub fn with_link(mut self, link: watch::Sender<bool>) -> Self {
        self.link = Some(link);
        self
    }

    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    /// Drive the session until `cancel` fires.
    ///
    /// Connection failures never end the session: it waits
    /// `reconnect_delay` and reconnects with the same identity, indefinitely.
    /// Only cancellation closes the connection and returns.
    #[instrument(skip_all, fields(worker_id = %self.identity.worker_id))]
    pub async fn run<C: Connector + ?Sized>(
        self,
        connector: &C,
        cancel: CancellationToken,
    ) -> SessionReport {
        let mut report = SessionReport::default();
        let mut conn: Option<Box<dyn Connection>> = None;
        let mut heartbeat: Option<Interval> = None;

        let (mut state, mut action) = handle_event(SessionState::Disconnected, SessionEvent::Start);

        loop {
            let event = match action {
                SessionAction::OpenConnection => {
                    report.connect_attempts += 1;
                    if report.connect_attempts > 1 {
                        metrics::counter!("fleet_reconnects_total").increment(1);
                    }
                    info!(attempt = report.connect_attempts, "connecting");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => SessionEvent::CloseRequested,
                        result = connector.connect(&self.url, self.egress.as_ref()) => match result {
                            Ok(opened) => {
                                conn = Some(opened);
                                info!("connection opened");
                                metrics::gauge!("fleet_sessions_connected").increment(1.0);
                                self.set_link(true);
                                SessionEvent::Connected
                            }
                            Err(e) => SessionEvent::ConnectionLost(e.to_string()),
                        },
                    }
                }
                SessionAction::SendRegistration => {
                    let outcome = match register_message(&self.identity, &self.registration_id) {
                        Ok(text) => send(&mut conn, text).await,
                        Err(e) => Err(e),
                    };
                    match outcome {
                        Ok(()) => {
                            report.registrations += 1;
                            info!(registration_id = %self.registration_id, "registration sent");
                            SessionEvent::RegistrationSent
                        }
                        Err(e) => SessionEvent::ConnectionLost(e.to_string()),
                    }
                }
                SessionAction::StartHeartbeat => {
                    let period = self.timing.heartbeat_interval;
                    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    heartbeat = Some(ticker);
                    next_event(&mut conn, &mut heartbeat, &cancel).await
                }
                SessionAction::SendHeartbeat => {
                    let outcome = match heartbeat_message(&self.identity, &self.capacity) {
                        Ok(text) => send(&mut conn, text).await,
                        Err(e) => Err(e),
                    };
                    match outcome {
                        Ok(()) => {
                            report.heartbeats += 1;
                            metrics::counter!("fleet_heartbeats_sent_total").increment(1);
                            debug!(beats = report.heartbeats, "heartbeat sent");
                            next_event(&mut conn, &mut heartbeat, &cancel).await
                        }
                        Err(e) => SessionEvent::ConnectionLost(e.to_string()),
                    }
                }
                SessionAction::AcknowledgeJob { job_id } => {
                    let outcome = match job_assigned_message(&self.identity, &job_id) {
                        Ok(text) => send(&mut conn, text).await,
                        Err(e) => Err(e),
                    };
                    match outcome {
                        Ok(()) => {
                            report.jobs_acknowledged += 1;
                            metrics::counter!("fleet_jobs_acknowledged_total").increment(1);
                            info!(job_id = %job_id, "job acknowledged");
                            next_event(&mut conn, &mut heartbeat, &cancel).await
                        }
                        Err(e) => SessionEvent::ConnectionLost(e.to_string()),
                    }
                }
                SessionAction::None => next_event(&mut conn, &mut heartbeat, &cancel).await,
                SessionAction::ScheduleReconnect => {
                    heartbeat = None;
                    release(&mut conn).await;
                    self.set_link(false);
                    let delay = self.timing.reconnect_delay;
                    info!(delay_secs = delay.as_secs_f64(), "reconnecting after delay");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => SessionEvent::CloseRequested,
                        _ = tokio::time::sleep(delay) => SessionEvent::ReconnectTimer,
                    }
                }
                SessionAction::CloseConnection => {
                    heartbeat = None;
                    release(&mut conn).await;
                    self.set_link(false);
                    SessionEvent::ConnectionLost("closed locally".into())
                }
                SessionAction::Exit => {
                    info!(
                        heartbeats = report.heartbeats,
                        jobs = report.jobs_acknowledged,
                        "session closed"
                    );
                    return report;
                }
            };

            match &event {
                SessionEvent::ConnectionLost(reason) if state != (SessionState::Closing { reconnect: false }) => {
                    warn!(state = state.label(), reason = %reason, "connection lost");
                }
                SessionEvent::Inbound(InboundMessage::Malformed(e)) => {
                    warn!(error = %e, "discarding malformed message");
                }
                SessionEvent::Inbound(InboundMessage::Other(value)) => {
                    debug!(message = %value, "ignoring inbound message");
                }
                _ => {}
            }

            let (next_state, next_action) = handle_event(state, event);
            state = next_state;
            action = next_action;
        }
    }

    fn set_link(&self, up: bool) {
        if let Some(link) = &self.link {
            link.send_replace(up);
        }
    }
}

async fn send(conn: &mut Option<Box<dyn Connection>>, text: String) -> Result<()> {
    match conn.as_mut() {
        Some(conn) => conn.send(text).await,
        None => Err(crate::Error::Send("connection not open".into())),
    }
}

/// Close and drop the current connection, if any.
async fn release(conn: &mut Option<Box<dyn Connection>>) {
    if let Some(mut open) = conn.take() {
        open.close().await;
        metrics::gauge!("fleet_sessions_connected").decrement(1.0);
    }
}

/// Wait for whatever happens next while heartbeating: cancellation, the
/// heartbeat timer, or an inbound frame.
async fn next_event(
    conn: &mut Option<Box<dyn Connection>>,
    heartbeat: &mut Option<Interval>,
    cancel: &CancellationToken,
) -> SessionEvent {
    let (Some(conn), Some(ticker)) = (conn.as_mut(), heartbeat.as_mut()) else {
        cancel.cancelled().await;
        return SessionEvent::CloseRequested;
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => SessionEvent::CloseRequested,
        _ = ticker.tick() => SessionEvent::HeartbeatDue,
        frame = conn.recv() => match frame {
            Some(Ok(text)) => SessionEvent::Inbound(InboundMessage::parse(&text)),
            Some(Err(e)) => SessionEvent::ConnectionLost(e.to_string()),
            None => SessionEvent::ConnectionLost("closed by remote".into()),
        },
    }
}
