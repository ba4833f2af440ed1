/// Submission recorder.
///
/// Each submission kind (contact message, itinerary request) owns one flat
/// file holding a pretty-printed JSON array of records. Records are only
/// ever appended; nothing updates or deletes them.
///
/// The read-modify-write cycle runs under an async mutex so concurrent
/// appends to the same file are serialized instead of racing (the original
/// flat-file pattern could lose updates, last writer wins).
///
/// A missing file is an empty array; an existing file that does not parse
/// as a JSON array is a hard error, never silently truncated.
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use rand::distr::{Alphanumeric, SampleString};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::info;

use crate::error::AppError;

pub const REQUIRED_ITINERARY_FIELDS: [&str; 6] = [
    "name",
    "email",
    "destination",
    "travelDates",
    "travelers",
    "interests",
];

const CONFIRMATION_MESSAGE: &str =
    "Your itinerary request has been received! We'll get back to you within 24 hours.";

const ITINERARY_ID_PREFIX: &str = "ITN";
const PENDING_STATUS: &str = "pending";

/// What the caller gets back after a successful itinerary submission.
#[derive(Debug, Clone)]
pub struct ItineraryReceipt {
    pub request_id: String,
    pub message: String,
}

pub struct SubmissionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SubmissionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a contact message. No field validation — the caller-supplied
    /// object is stamped with `submittedAt` and appended as-is.
    pub async fn record_contact(&self, fields: Map<String, Value>) -> Result<(), AppError> {
        let mut record = fields;
        record.insert("submittedAt".to_string(), json!(now_iso()));
        self.append(Value::Object(record)).await?;
        info!(file = %self.path.display(), "contact submission recorded");
        Ok(())
    }

    /// Record an itinerary request. Rejects before touching the file when
    /// any required field is absent or falsy; on success stamps the record
    /// with `submittedAt`, a generated `requestId`, and a pending `status`.
    pub async fn record_itinerary(
        &self,
        fields: Map<String, Value>,
    ) -> Result<ItineraryReceipt, AppError> {
        let missing = REQUIRED_ITINERARY_FIELDS
            .iter()
            .any(|field| is_absent(fields.get(*field)));
        if missing {
            return Err(AppError::Validation("Missing required fields".to_string()));
        }

        let request_id = new_request_id();
        let mut record = fields;
        record.insert("submittedAt".to_string(), json!(now_iso()));
        record.insert("requestId".to_string(), Value::String(request_id.clone()));
        record.insert("status".to_string(), json!(PENDING_STATUS));
        self.append(Value::Object(record)).await?;

        info!(request_id = %request_id, file = %self.path.display(), "itinerary request recorded");
        Ok(ItineraryReceipt {
            request_id,
            message: CONFIRMATION_MESSAGE.to_string(),
        })
    }

    /// All records currently on disk. A missing file reads as empty.
    pub async fn read_all(&self) -> Result<Vec<Value>, AppError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => {
                serde_json::from_str::<Vec<Value>>(&text).map_err(|source| AppError::Corrupt {
                    path: self.path.display().to_string(),
                    source,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn append(&self, record: Value) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        records.push(record);
        let text = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(&self.path, text).await?;
        Ok(())
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generated identifier: prefix, millisecond timestamp, short random suffix.
fn new_request_id() -> String {
    let suffix = Alphanumeric
        .sample_string(&mut rand::rng(), 9)
        .to_lowercase();
    format!(
        "{ITINERARY_ID_PREFIX}-{}-{}",
        Utc::now().timestamp_millis(),
        suffix
    )
}

/// Absent means missing, `null`, `false`, `0`, or the empty string —
/// matching the truthiness check the submission forms were written against.
fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}
