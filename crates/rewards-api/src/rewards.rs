//! Reward indexer payloads

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Accumulated heartbeat points for one account.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointTotal {
    pub total_heartbeats: u64,
}

impl PointTotal {
    /// Extract the total from the `reward_realtime` array.
    ///
    /// Element 0 carries `total_heartbeats` (number or numeric string). An
    /// empty array means the account has no reward record yet and counts as 0.
    pub(crate) fn from_realtime(body: &Value) -> Result<Self, String> {
        let entries = body
            .as_array()
            .ok_or_else(|| format!("expected array, got {body}"))?;
        let Some(first) = entries.first() else {
            return Ok(Self {
                total_heartbeats: 0,
            });
        };
        let raw = first
            .get("total_heartbeats")
            .ok_or_else(|| "missing total_heartbeats".to_string())?;
        let total = match raw {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            Value::Null => Some(0),
            _ => None,
        }
        .ok_or_else(|| format!("total_heartbeats is not a number: {raw}"))?;
        Ok(Self {
            total_heartbeats: total,
        })
    }
}

/// Daily claim eligibility. Refetched on every poll, never cached.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimState {
    #[serde(default)]
    pub tier: Value,
    /// Number, numeric string or `null`; anything else reads as absent.
    #[serde(default, deserialize_with = "lenient_number")]
    pub daily_point: Option<f64>,
    /// `null` reads as not claimed.
    #[serde(default, deserialize_with = "null_as_false")]
    pub claimed: bool,
    /// `null` until the account has claimed for the first time
    #[serde(default)]
    pub next_claim: Option<Value>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl ClaimState {
    /// Whether a claim should be triggered right now.
    pub fn should_claim(&self) -> bool {
        !self.claimed
    }

    /// Human-readable next-claim time for logs.
    pub fn next_claim_display(&self) -> String {
        match &self.next_claim {
            None | Some(Value::Null) => "not yet claimed".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Tier label for logs.
    pub fn tier_display(&self) -> String {
        match &self.tier {
            Value::Null => "none".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn point_total_reads_first_element() {
        let body = json!([{"total_heartbeats": 4821, "today": 12}, {"total_heartbeats": 1}]);
        assert_eq!(
            PointTotal::from_realtime(&body).unwrap().total_heartbeats,
            4821
        );
    }

    #[test]
    fn point_total_accepts_string_and_float() {
        let body = json!([{"total_heartbeats": "77"}]);
        assert_eq!(PointTotal::from_realtime(&body).unwrap().total_heartbeats, 77);
        let body = json!([{"total_heartbeats": 12.0}]);
        assert_eq!(PointTotal::from_realtime(&body).unwrap().total_heartbeats, 12);
    }

    #[test]
    fn point_total_empty_array_is_zero() {
        assert_eq!(
            PointTotal::from_realtime(&json!([])).unwrap().total_heartbeats,
            0
        );
    }

    #[test]
    fn point_total_rejects_non_array() {
        assert!(PointTotal::from_realtime(&json!({"total_heartbeats": 1})).is_err());
        assert!(PointTotal::from_realtime(&json!([{"other": 1}])).is_err());
    }

    #[test]
    fn claim_state_deserializes_camel_case() {
        let state: ClaimState = serde_json::from_value(json!({
            "tier": 2,
            "dailyPoint": 150.5,
            "claimed": true,
            "nextClaim": "2026-10-17T00:00:00Z"
        }))
        .unwrap();
        assert!(state.claimed);
        assert!(!state.should_claim());
        assert_eq!(state.daily_point, Some(150.5));
        assert_eq!(state.tier_display(), "2");
        assert_eq!(state.next_claim_display(), "2026-10-17T00:00:00Z");
    }

    #[test]
    fn null_next_claim_reads_not_yet_claimed() {
        let state: ClaimState =
            serde_json::from_value(json!({"tier": "bronze", "dailyPoint": 10, "claimed": false, "nextClaim": null}))
                .unwrap();
        assert!(state.should_claim());
        assert_eq!(state.next_claim_display(), "not yet claimed");
        assert_eq!(state.tier_display(), "bronze");
    }

    #[test]
    fn claim_state_tolerates_null_and_string_fields() {
        let state: ClaimState = serde_json::from_value(json!({
            "tier": null,
            "dailyPoint": null,
            "claimed": null,
            "nextClaim": null
        }))
        .unwrap();
        assert_eq!(state.daily_point, None);
        assert!(!state.claimed);
        assert!(state.should_claim());
        assert_eq!(state.tier_display(), "none");

        let state: ClaimState =
            serde_json::from_value(json!({"dailyPoint": "100", "claimed": true})).unwrap();
        assert_eq!(state.daily_point, Some(100.0));
        assert!(!state.should_claim());

        let state: ClaimState = serde_json::from_value(json!({"dailyPoint": {"x": 1}})).unwrap();
        assert_eq!(state.daily_point, None);
    }
}
