//! Prometheus metrics exposition
//!
//! The counters and the gauge are emitted by the library crates; this module
//! installs the recorder and describes them:
//!
//! - `fleet_heartbeats_sent_total`, `fleet_jobs_acknowledged_total`,
//!   `fleet_reconnects_total` (sessions)
//! - `fleet_reauthentications_total`, `fleet_claims_triggered_total`,
//!   `fleet_credential_failures_total` (supervisors)
//! - `fleet_sessions_connected` (gauge)

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe();
    Ok(handle)
}

/// Register help text so `/metrics` renders `# HELP` lines.
pub fn describe() {
    metrics::describe_counter!(
        "fleet_heartbeats_sent_total",
        "HEARTBEAT messages written across all sessions"
    );
    metrics::describe_counter!(
        "fleet_jobs_acknowledged_total",
        "JOB_ASSIGNED acknowledgments sent"
    );
    metrics::describe_counter!(
        "fleet_reconnects_total",
        "Connection attempts after the first one in a session"
    );
    metrics::describe_counter!(
        "fleet_reauthentications_total",
        "Cycles restarted because a credential was rejected"
    );
    metrics::describe_counter!(
        "fleet_claims_triggered_total",
        "Daily reward claims triggered"
    );
    metrics::describe_counter!(
        "fleet_credential_failures_total",
        "Failed or empty credential requests"
    );
    metrics::describe_gauge!(
        "fleet_sessions_connected",
        "Sessions with an open connection"
    );
}
