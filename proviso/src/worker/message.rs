//! Messages exchanged between the orchestrating side and isolated workers.

use std::fmt;
use std::time::Instant;

use serde::de::{Error as _, IntoDeserializer};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use crate::arbitrary::GenerationState;
use crate::error::PropertyError;

/// Identity of a registered predicate; routes a run to its lane of workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredicateId(pub u32);

impl fmt::Display for PredicateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one dispatched run; correlates a response to its request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inputs of a run, either as values or as the descriptor that rebuilds them
///
/// Serialized with a `source` tag: `{"source":"main","value":..}` or
/// `{"source":"state","seed":..,"size":..,"path":[..]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum Payload<T> {
    /// Materialized inputs, used as they are
    Main { value: T },
    /// Generation descriptor, replayed by the worker
    State(GenerationState),
}

impl<T> Payload<T> {
    /// Whether the worker has to rebuild the inputs
    pub fn is_state(&self) -> bool {
        matches!(self, Payload::State(_))
    }
}

/// Request sent from the orchestrator to a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMessage<T> {
    pub predicate_id: PredicateId,
    pub run_id: RunId,
    pub payload: Payload<T>,
}

impl<T> RunMessage<T> {
    pub fn new(predicate_id: PredicateId, run_id: RunId, payload: Payload<T>) -> Self {
        Self {
            predicate_id,
            run_id,
            payload,
        }
    }
}

/// Response sent from a worker back to the orchestrator, exactly one per accepted run
///
/// Serialized as `{"runId":..,"success":..,"output":..}` or
/// `{"runId":..,"success":false,"error":{..}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMessage<O> {
    pub run_id: RunId,
    pub outcome: Result<O, PropertyError>,
}

impl<O> ResultMessage<O> {
    pub fn new(run_id: RunId, outcome: Result<O, PropertyError>) -> Self {
        Self { run_id, outcome }
    }

    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn output(&self) -> Option<&O> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&PropertyError> {
        self.outcome.as_ref().err()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EncodedResult<'a, O> {
    run_id: RunId,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a O>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a PropertyError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecodedResult<O> {
    run_id: RunId,
    success: bool,
    output: Option<O>,
    error: Option<PropertyError>,
}

impl<O: Serialize> Serialize for ResultMessage<O> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EncodedResult {
            run_id: self.run_id,
            success: self.success(),
            output: self.output(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}

impl<'de, O: Deserialize<'de>> Deserialize<'de> for ResultMessage<O> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let decoded = DecodedResult::<O>::deserialize(deserializer)?;
        let outcome = if decoded.success {
            match decoded.output {
                Some(output) => Ok(output),
                // A unit output is written as `null`, which reads back as absent
                None => O::deserialize(IntoDeserializer::<'de, D::Error>::into_deserializer(()))
                    .map(Ok)
                    .map_err(|_: D::Error| D::Error::missing_field("output"))?,
            }
        } else {
            Err(decoded.error.ok_or_else(|| D::Error::missing_field("error"))?)
        };
        Ok(ResultMessage::new(decoded.run_id, outcome))
    }
}

/// Progress of one run, reported by the worker executing it
#[derive(Debug)]
pub enum WorkerEvent<O> {
    /// The worker picked the run up; its allotted duration starts here
    Started { run_id: RunId, at: Instant },
    /// The run resolved
    Finished(ResultMessage<O>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_payload_schema() {
        let message: RunMessage<i64> = RunMessage::new(
            PredicateId(1),
            RunId(100),
            Payload::State(GenerationState::new(42, 10).child(3)),
        );
        let encoded = serde_json::to_value(&message).expect("serializable");
        assert_eq!(
            encoded,
            json!({
                "predicateId": 1,
                "runId": 100,
                "payload": {"source": "state", "seed": 42, "size": 10, "path": [3]}
            })
        );
    }

    #[test]
    fn test_main_payload_schema() {
        let decoded: RunMessage<Vec<i64>> = serde_json::from_value(json!({
            "predicateId": 2,
            "runId": 7,
            "payload": {"source": "main", "value": [1, 2, 3]}
        }))
        .expect("valid message");
        assert_eq!(decoded.payload, Payload::Main { value: vec![1, 2, 3] });
        assert!(!decoded.payload.is_state());
    }

    #[test]
    fn test_state_path_defaults_to_empty() {
        let payload: Payload<i64> =
            serde_json::from_value(json!({"source": "state", "seed": 5, "size": 0}))
                .expect("path is optional");
        assert_eq!(payload, Payload::State(GenerationState::new(5, 0)));
    }

    #[test]
    fn test_result_accessors() {
        let ok: ResultMessage<u8> = ResultMessage::new(RunId(1), Ok(4));
        assert!(ok.success());
        assert_eq!(ok.output(), Some(&4));
        assert!(ok.error().is_none());

        let failed: ResultMessage<u8> =
            ResultMessage::new(RunId(2), Err(PropertyError::property_failed("no")));
        assert!(!failed.success());
        assert!(failed.output().is_none());
    }

    #[test]
    fn test_result_schema() {
        let ok: ResultMessage<Vec<i64>> = ResultMessage::new(RunId(3), Ok(vec![4, 9]));
        assert_eq!(
            serde_json::to_value(&ok).expect("serializable"),
            json!({"runId": 3, "success": true, "output": [4, 9]})
        );

        let crashed: ResultMessage<Vec<i64>> = ResultMessage::new(
            RunId(4),
            Err(PropertyError::WorkerCrash {
                run_id: RunId(4),
                reason: "gone".to_string(),
            }),
        );
        let encoded = serde_json::to_value(&crashed).expect("serializable");
        assert_eq!(
            encoded,
            json!({
                "runId": 4,
                "success": false,
                "error": {"kind": "workerCrash", "runId": 4, "reason": "gone"}
            })
        );
        assert!(encoded.get("output").is_none());

        let decoded: ResultMessage<Vec<i64>> =
            serde_json::from_value(encoded).expect("valid message");
        assert_eq!(decoded, crashed);
    }

    #[test]
    fn test_result_with_unit_output() {
        let ok: ResultMessage<()> = ResultMessage::new(RunId(8), Ok(()));
        let encoded = serde_json::to_string(&ok).expect("serializable");
        let decoded: ResultMessage<()> = serde_json::from_str(&encoded).expect("valid message");
        assert_eq!(decoded, ok);

        let bare: ResultMessage<()> =
            serde_json::from_value(json!({"runId": 8, "success": true})).expect("output is optional");
        assert!(bare.success());
    }

    #[test]
    fn test_result_rejects_missing_fields() {
        let no_error =
            serde_json::from_value::<ResultMessage<i64>>(json!({"runId": 1, "success": false}));
        assert!(no_error.is_err());

        let no_output =
            serde_json::from_value::<ResultMessage<i64>>(json!({"runId": 1, "success": true}));
        assert!(no_output.is_err());
    }
}
