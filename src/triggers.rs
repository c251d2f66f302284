//! Queue event entry point

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event has no Records[0].body string")]
    MissingBody,
    #[error("event body is not JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

/// Decode the body of the first record of a queue event
pub fn parse_event_body(event: &Value) -> Result<Value, EventError> {
    let body = event
        .get("Records")
        .and_then(|records| records.get(0))
        .and_then(|record| record.get("body"))
        .and_then(Value::as_str)
        .ok_or(EventError::MissingBody)?;
    Ok(serde_json::from_str(body)?)
}

/// Returns `false` when the event cannot be parsed
pub fn sample_handler(event: &Value) -> bool {
    match parse_event_body(event) {
        Ok(body) => {
            tracing::debug!("Sample handler executed successfully: {}", body);
            true
        },
        Err(e) => {
            tracing::error!("Error parsing event: {}", e);
            false
        },
    }
}
