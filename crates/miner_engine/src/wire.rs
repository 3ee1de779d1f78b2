//! JSON payloads exchanged with the mining service and their mapping onto core types.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use engine_logging::engine_warn;
use miner_core::{
    JobHandle, JobRecord, PhaseCounter, StartResponse, StatusKind, StatusSnapshot, WriterType,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{ApiError, FailureKind, History};

#[derive(Debug, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    progress: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    phases: Option<BTreeMap<String, PhaseCounterPayload>>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default, alias = "pattern_count")]
    patterns_count: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PhaseCounterPayload {
    #[serde(default)]
    current: Option<Value>,
    #[serde(default)]
    total: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct StartPayload {
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default, alias = "pattern_count")]
    patterns_count: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct HistoryPayload {
    #[serde(default)]
    selected_job_id: Option<String>,
    /// Entries are decoded one by one so a single bad record is skipped, not fatal.
    #[serde(default)]
    history: Vec<Value>,
}

/// Every field is optional and loosely typed; `null` reads the same as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JobRecordPayload {
    job_id: Option<Value>,
    writer_type: Option<Value>,
    node_count: Option<Value>,
    edge_count: Option<Value>,
    imported_on: Option<Value>,
    schema: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub fn parse_status(body: &[u8]) -> Result<StatusSnapshot, ApiError> {
    let payload: StatusPayload = serde_json::from_slice(body)
        .map_err(|err| ApiError::new(FailureKind::MalformedPayload, err.to_string()))?;

    let progress = match payload.progress {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|value| value.is_finite())
    .ok_or_else(|| ApiError::new(FailureKind::MalformedPayload, "missing or non-numeric progress"))?;

    let phases = payload
        .phases
        .unwrap_or_default()
        .into_iter()
        .map(|(name, counter)| {
            let current = count(counter.current.as_ref()).unwrap_or(0);
            let total = count(counter.total.as_ref()).unwrap_or(0);
            (name, PhaseCounter::new(current, total))
        })
        .collect();

    Ok(StatusSnapshot {
        progress,
        message: payload.message,
        status: payload
            .status
            .as_deref()
            .map_or(StatusKind::Unknown, StatusKind::from_wire),
        phases,
        download_url: payload.download_url,
        patterns_count: count(payload.patterns_count.as_ref()),
    })
}

/// A successful start reply may have an empty or unusable body; that still
/// means the job finished, so it maps to an empty response.
pub fn parse_start_response(body: &[u8]) -> StartResponse {
    if body.iter().all(u8::is_ascii_whitespace) {
        return StartResponse::default();
    }
    let payload = serde_json::from_slice::<StartPayload>(body).unwrap_or_else(|err| {
        engine_warn!("Start reply body not understood, using defaults: {}", err);
        StartPayload::default()
    });
    StartResponse {
        download_url: payload.download_url,
        patterns_count: count(payload.patterns_count.as_ref()),
    }
}

pub fn parse_history(body: &[u8]) -> Result<History, ApiError> {
    let payload: HistoryPayload = serde_json::from_slice(body)
        .map_err(|err| ApiError::new(FailureKind::MalformedPayload, err.to_string()))?;

    let records = payload
        .history
        .into_iter()
        .filter_map(|entry| {
            let record = match serde_json::from_value::<JobRecordPayload>(entry) {
                Ok(record) => record,
                Err(err) => {
                    engine_warn!("Skipping unreadable history entry: {}", err);
                    return None;
                }
            };
            let Some(job_id) = record.job_id.as_ref().and_then(text) else {
                engine_warn!("Skipping history entry without a job id");
                return None;
            };
            let imported_raw = record.imported_on.as_ref().and_then(text).unwrap_or_default();
            let Some(imported_on) = parse_timestamp(&imported_raw) else {
                engine_warn!(
                    "Skipping history entry {} with unreadable import time '{}'",
                    job_id,
                    imported_raw
                );
                return None;
            };
            Some(JobRecord {
                job_id: JobHandle::new(job_id),
                writer_type: record
                    .writer_type
                    .as_ref()
                    .and_then(text)
                    .map_or(WriterType::Other, |raw| WriterType::from_wire(&raw)),
                node_count: count(record.node_count.as_ref()),
                edge_count: count(record.edge_count.as_ref()),
                imported_on,
                schema: record.schema.and_then(|schema| match schema {
                    Value::Null => None,
                    Value::String(text) => Some(text),
                    other => Some(other.to_string()),
                }),
            })
        })
        .collect();

    Ok(History {
        selected_job_id: payload.selected_job_id,
        records,
    })
}

/// Pulls a human-readable message out of an error reply, if there is one.
pub fn error_message(body: &[u8]) -> Option<String> {
    let payload: ErrorPayload = serde_json::from_slice(body).ok()?;
    payload
        .error
        .or(payload.message)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Non-negative count from a JSON number or numeric string; fractions are truncated.
fn count(value: Option<&Value>) -> Option<u64> {
    let number = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then(|| number.max(0.0) as u64)
}

/// String or number as text; anything else (including `null`) is absent.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => Some(raw.trim().to_string()).filter(|raw| !raw.is_empty()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_accepts_numeric_strings_and_unknown_status() {
        let snapshot = parse_status(br#"{"progress": "42.5", "status": "queued"}"#).unwrap();
        assert_eq!(snapshot.progress, 42.5);
        assert_eq!(snapshot.status, StatusKind::Unknown);
        assert!(snapshot.phases.is_empty());
    }

    #[test]
    fn status_without_progress_is_malformed() {
        let err = parse_status(br#"{"status": "running"}"#).unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedPayload);
        let err = parse_status(b"<html>502</html>").unwrap_err();
        assert_eq!(err.kind, FailureKind::MalformedPayload);
    }

    #[test]
    fn negative_phase_counts_are_floored() {
        let snapshot = parse_status(
            br#"{"progress": 3, "phases": {"sampling": {"current": -1, "total": 8}}}"#,
        )
        .unwrap();
        assert_eq!(snapshot.phases["sampling"], PhaseCounter::new(0, 8));
    }

    #[test]
    fn fractional_phase_counts_are_accepted() {
        let snapshot = parse_status(
            br#"{"progress": 97, "status": "completed", "patterns_count": 12.0,
                 "phases": {"saving": {"current": 3.0, "total": "10"}, "sampling": {"current": null}}}"#,
        )
        .unwrap();
        assert_eq!(snapshot.phases["saving"], PhaseCounter::new(3, 10));
        assert_eq!(snapshot.phases["sampling"], PhaseCounter::new(0, 0));
        assert_eq!(snapshot.patterns_count, Some(12));
        assert_eq!(snapshot.status, StatusKind::Completed);
    }

    #[test]
    fn history_tolerates_nulls_and_odd_types_per_record() {
        let history = parse_history(
            br#"{"selected_job_id": "nx-1", "history": [
                {"job_id": "nx-1", "writer_type": null, "node_count": 12.0, "edge_count": null,
                 "imported_on": "2026-02-01T10:00:00Z"},
                {"job_id": "mk-2", "writer_type": "mork", "imported_on": null},
                {"job_id": null, "writer_type": "networkx", "imported_on": "2026-02-01T10:00:00Z"},
                "garbage",
                {"job_id": 7, "writer_type": "networkx", "imported_on": "2026-02-01 11:00:00"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(history.records.len(), 2);
        let first = &history.records[0];
        assert_eq!(first.job_id.as_str(), "nx-1");
        assert_eq!(first.writer_type, WriterType::Other);
        assert_eq!(first.node_count, Some(12));
        assert_eq!(first.edge_count, None);
        let second = &history.records[1];
        assert_eq!(second.job_id.as_str(), "7");
        assert_eq!(second.writer_type, WriterType::Networkx);
    }

    #[test]
    fn start_reply_tolerates_empty_and_garbage_bodies() {
        assert_eq!(parse_start_response(b""), StartResponse::default());
        assert_eq!(parse_start_response(b"ok"), StartResponse::default());
        assert_eq!(
            parse_start_response(br#"{"download_url": "/dl/1", "pattern_count": 4}"#),
            StartResponse {
                download_url: Some("/dl/1".to_string()),
                patterns_count: Some(4),
            }
        );
    }

    #[test]
    fn timestamps_accept_rfc3339_and_naive_forms() {
        assert!(parse_timestamp("2026-02-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2026-02-01 10:00:00").is_some());
        assert!(parse_timestamp("2026-02-01T10:00:00.123").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(
            error_message(br#"{"error": " no graph ", "message": "x"}"#).as_deref(),
            Some("no graph")
        );
        assert_eq!(error_message(br#"{"message": "busy"}"#).as_deref(), Some("busy"));
        assert_eq!(error_message(b"not json"), None);
    }
}
