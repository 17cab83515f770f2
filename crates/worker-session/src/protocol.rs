//! JSON wire messages exchanged with the coordination service

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngExt;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Worker type advertised in every outbound message.
pub const WORKER_TYPE: &str = "LWEXT";

/// Advertised memory range, in GB.
const MEMORY_RANGE: std::ops::RangeInclusive<f64> = 10.0..=64.0;

/// Advertised storage range, in GB.
const STORAGE_RANGE: std::ops::RangeInclusive<f64> = 10.0..=500.0;

/// Who this session is, as far as the coordination service can tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    /// Reproducible encoding of the owner address
    pub worker_id: String,
    pub owner_address: String,
    pub host: String,
}

impl WorkerIdentity {
    /// The worker id is the base64 encoding of the address, so the same
    /// account always reconnects as the same worker.
    pub fn new(owner_address: &str, host: &str) -> Self {
        Self {
            worker_id: STANDARD.encode(owner_address.as_bytes()),
            owner_address: owner_address.to_string(),
            host: host.to_string(),
        }
    }
}

/// Resource advertisement sent with every heartbeat. Generated once per
/// session and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityProfile {
    #[serde(rename = "AvailableMem")]
    pub available_memory: f64,
    #[serde(rename = "AvailableStorage")]
    pub available_storage: f64,
    #[serde(rename = "AvailableGpu")]
    pub available_gpu: String,
    #[serde(rename = "AvailableModels")]
    pub available_models: Vec<String>,
}

impl CapacityProfile {
    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self {
            available_memory: round2(rng.random_range(MEMORY_RANGE)),
            available_storage: round2(rng.random_range(STORAGE_RANGE)),
            available_gpu: String::new(),
            available_models: Vec::new(),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Serialize)]
struct Envelope<'a, M: Serialize> {
    #[serde(rename = "workerID")]
    worker_id: &'a str,
    #[serde(rename = "msgType")]
    msg_type: &'static str,
    #[serde(rename = "workerType")]
    worker_type: &'static str,
    message: M,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    worker: RegisterWorker<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterWorker<'a> {
    host: &'a str,
    identity: &'a str,
    owner_address: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct HeartbeatBody<'a> {
    #[serde(rename = "Worker")]
    worker: HeartbeatWorker<'a>,
    #[serde(rename = "Capacity")]
    capacity: &'a CapacityProfile,
}

#[derive(Serialize)]
struct HeartbeatWorker<'a> {
    #[serde(rename = "Identity")]
    identity: &'a str,
    #[serde(rename = "ownerAddress")]
    owner_address: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "Host")]
    host: &'a str,
}

#[derive(Serialize)]
struct JobAssignedBody<'a> {
    #[serde(rename = "Status")]
    status: bool,
    #[serde(rename = "Ref")]
    reference: &'a str,
}

fn encode<M: Serialize>(identity: &WorkerIdentity, msg_type: &'static str, message: M) -> Result<String> {
    serde_json::to_string(&Envelope {
        worker_id: &identity.worker_id,
        msg_type,
        worker_type: WORKER_TYPE,
        message,
    })
    .map_err(|e| Error::Encode(format!("{msg_type}: {e}")))
}

/// REGISTER handshake, sent once per freshly opened connection.
pub fn register_message(identity: &WorkerIdentity, registration_id: &str) -> Result<String> {
    encode(
        identity,
        "REGISTER",
        RegisterBody {
            id: registration_id,
            kind: "REGISTER",
            worker: RegisterWorker {
                host: &identity.host,
                identity: &identity.worker_id,
                owner_address: &identity.owner_address,
                kind: WORKER_TYPE,
            },
        },
    )
}

/// Periodic HEARTBEAT carrying the session's capacity profile.
pub fn heartbeat_message(identity: &WorkerIdentity, capacity: &CapacityProfile) -> Result<String> {
    encode(
        identity,
        "HEARTBEAT",
        HeartbeatBody {
            worker: HeartbeatWorker {
                identity: &identity.worker_id,
                owner_address: &identity.owner_address,
                kind: WORKER_TYPE,
                host: &identity.host,
            },
            capacity,
        },
    )
}

/// Acknowledgment for one job assignment.
pub fn job_assigned_message(identity: &WorkerIdentity, job_id: &str) -> Result<String> {
    encode(
        identity,
        "JOB_ASSIGNED",
        JobAssignedBody {
            status: true,
            reference: job_id,
        },
    )
}

/// Classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `{"data":{"MsgType":"JOB","UUID":...}}`
    Job { job_id: String },
    /// Valid JSON that is not a job assignment. A JOB whose `UUID` is
    /// missing or empty lands here too: there is nothing to put in `Ref`,
    /// so it is never acknowledged.
    Other(Value),
    /// Not JSON; logged and dropped
    Malformed(String),
}

impl InboundMessage {
    pub fn parse(text: &str) -> Self {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => return InboundMessage::Malformed(e.to_string()),
        };
        let data = &value["data"];
        if data["MsgType"].as_str() == Some("JOB") {
            if let Some(job_id) = job_reference(&data["UUID"]) {
                return InboundMessage::Job { job_id };
            }
        }
        InboundMessage::Other(value)
    }
}

/// The `Ref` to acknowledge: a non-empty string or a number.
fn job_reference(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
