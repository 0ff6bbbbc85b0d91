// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalization of telephony provider events.
//!
//! Two vocabularies funnel into one event type: native ARI events
//! (`StasisStart`, `StasisEnd`, `ChannelStateChange`,
//! `ChannelDtmfReceived`) and a generic vocabulary
//! (`initiated`/`ringing`/`answered`/`completed`/`busy`/`failed`/
//! `no-answer`) for providers that pre-digest their signalling.

use serde_json::Value;
use tracing::debug;

use relayr_core::error::RelayrError;
use relayr_core::types::CallStatus;

/// One normalized telephony event, keyed by the provider channel id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelephonyEvent {
    /// A call session entered the application (ARI StasisStart).
    SessionStarted {
        external_id: String,
        caller: Option<String>,
        callee: Option<String>,
    },
    /// A call session left the application (ARI StasisEnd).
    SessionEnded { external_id: String },
    /// The provider reported a status transition.
    StatusChanged {
        external_id: String,
        status: CallStatus,
    },
    /// A DTMF digit was pressed. Logged, never persisted.
    Dtmf { external_id: String, digit: String },
}

/// Parses one provider event payload.
///
/// Unknown but well-formed events yield `None`; a payload with neither an
/// ARI `type` nor a generic `event` field is a [`RelayrError::Payload`].
pub fn parse_event(payload: &Value) -> Result<Option<TelephonyEvent>, RelayrError> {
    if let Some(kind) = payload.get("type").and_then(Value::as_str) {
        return parse_ari_event(kind, payload);
    }
    if let Some(name) = payload.get("event").and_then(Value::as_str) {
        return parse_generic_event(name, payload);
    }
    Err(RelayrError::Payload(
        "telephony payload carries neither 'type' nor 'event'".into(),
    ))
}

fn channel_id(payload: &Value) -> Result<String, RelayrError> {
    payload
        .pointer("/channel/id")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RelayrError::Payload("ari event is missing channel.id".into()))
}

fn parse_ari_event(kind: &str, payload: &Value) -> Result<Option<TelephonyEvent>, RelayrError> {
    match kind {
        "StasisStart" => {
            let external_id = channel_id(payload)?;
            let caller = payload
                .pointer("/channel/caller/number")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned);
            let callee = payload
                .pointer("/channel/connected/number")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| {
                    payload
                        .pointer("/channel/dialplan/exten")
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                })
                .map(str::to_owned);
            Ok(Some(TelephonyEvent::SessionStarted {
                external_id,
                caller,
                callee,
            }))
        }
        "StasisEnd" => Ok(Some(TelephonyEvent::SessionEnded {
            external_id: channel_id(payload)?,
        })),
        "ChannelStateChange" => {
            let external_id = channel_id(payload)?;
            let state = payload
                .pointer("/channel/state")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let status = match state {
                "Up" => CallStatus::Answered,
                "Down" => CallStatus::Completed,
                other => {
                    debug!(state = %other, "ignoring intermediate channel state");
                    return Ok(None);
                }
            };
            Ok(Some(TelephonyEvent::StatusChanged {
                external_id,
                status,
            }))
        }
        "ChannelDtmfReceived" => {
            let external_id = channel_id(payload)?;
            let digit = payload
                .get("digit")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Ok(Some(TelephonyEvent::Dtmf { external_id, digit }))
        }
        other => {
            debug!(kind = %other, "ignoring unhandled ari event");
            Ok(None)
        }
    }
}

fn parse_generic_event(name: &str, payload: &Value) -> Result<Option<TelephonyEvent>, RelayrError> {
    let external_id = payload
        .get("call_id")
        .or_else(|| payload.get("external_id"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RelayrError::Payload("telephony event is missing call_id".into()))?;

    let status = match name {
        "initiated" => CallStatus::Initiated,
        "ringing" => CallStatus::Ringing,
        "answered" => CallStatus::Answered,
        "completed" => CallStatus::Completed,
        "busy" | "failed" | "no-answer" => CallStatus::Failed,
        other => {
            debug!(event = %other, "ignoring unknown telephony event");
            return Ok(None);
        }
    };
    Ok(Some(TelephonyEvent::StatusChanged {
        external_id,
        status,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stasis_start_extracts_parties() {
        let payload = serde_json::json!({
            "type": "StasisStart",
            "channel": {
                "id": "ch-1",
                "caller": { "number": "+1000", "name": "" },
                "connected": { "number": "+2000" },
                "dialplan": { "exten": "100" }
            }
        });
        let event = parse_event(&payload).expect("parse").expect("event");
        assert_eq!(
            event,
            TelephonyEvent::SessionStarted {
                external_id: "ch-1".into(),
                caller: Some("+1000".into()),
                callee: Some("+2000".into()),
            }
        );
    }

    #[test]
    fn stasis_start_falls_back_to_dialplan_exten() {
        let payload = serde_json::json!({
            "type": "StasisStart",
            "channel": {
                "id": "ch-1",
                "caller": { "number": "+1000" },
                "dialplan": { "exten": "100" }
            }
        });
        let Some(TelephonyEvent::SessionStarted { callee, .. }) =
            parse_event(&payload).expect("parse")
        else {
            panic!("expected session start");
        };
        assert_eq!(callee.as_deref(), Some("100"));
    }

    #[test]
    fn channel_state_up_and_down_map() {
        let up = serde_json::json!({
            "type": "ChannelStateChange",
            "channel": { "id": "ch-1", "state": "Up" }
        });
        assert_eq!(
            parse_event(&up).expect("parse"),
            Some(TelephonyEvent::StatusChanged {
                external_id: "ch-1".into(),
                status: CallStatus::Answered,
            })
        );

        let ringing = serde_json::json!({
            "type": "ChannelStateChange",
            "channel": { "id": "ch-1", "state": "Ringing" }
        });
        assert_eq!(parse_event(&ringing).expect("parse"), None);
    }

    #[test]
    fn generic_vocabulary_maps_failures() {
        for name in ["busy", "failed", "no-answer"] {
            let payload = serde_json::json!({ "event": name, "call_id": "x1" });
            assert_eq!(
                parse_event(&payload).expect("parse"),
                Some(TelephonyEvent::StatusChanged {
                    external_id: "x1".into(),
                    status: CallStatus::Failed,
                })
            );
        }
    }

    #[test]
    fn dtmf_is_parsed() {
        let payload = serde_json::json!({
            "type": "ChannelDtmfReceived",
            "channel": { "id": "ch-1" },
            "digit": "5"
        });
        assert_eq!(
            parse_event(&payload).expect("parse"),
            Some(TelephonyEvent::Dtmf {
                external_id: "ch-1".into(),
                digit: "5".into(),
            })
        );
    }

    #[test]
    fn shapeless_payload_is_an_error() {
        assert!(parse_event(&serde_json::json!({ "hello": 1 })).is_err());
    }
}
