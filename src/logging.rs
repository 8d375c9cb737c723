use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use data_encoding::BASE64;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};
use serde_json::Value;
use thiserror::Error;

use crate::model::protocol::{normalize_key, HttpMethod};
use crate::model::ticket::VotingKey;

const FALLBACK_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l:<5})} {t} - {m}{n}";

/// A unique identifier for a particular provider exchange.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Log an outgoing provider request.
pub fn log_request(id: RequestId, method: HttpMethod, path: &str) {
    let method = match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
    };
    info!("->req{id} {method} {path}");
}

/// Log a provider response with its body, secrets redacted.
pub fn log_response(id: RequestId, status: u16, path: &str, body: &[u8]) {
    let log_msg = response_line(id, status, path, body);
    match status {
        500..=599 => error!("{log_msg}"),
        400..=499 => warn!("{log_msg}"),
        _ => info!("{log_msg}"),
    }
}

/// The line logged for a response.
pub fn response_line(id: RequestId, status: u16, path: &str, body: &[u8]) -> String {
    format!("<-rsp{id} {status} {path} {}", redact_body(body))
}

/// A response body fit for the log. JSON bodies have voting keys
/// shortened, including inside an echoed request; anything else is shown
/// lossily as text.
pub fn redact_body(body: &[u8]) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(mut value) => {
            redact(&mut value);
            value.to_string()
        }
        Err(_) => String::from_utf8_lossy(body).trim_end().to_string(),
    }
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(fields) => {
            for (key, field) in fields.iter_mut() {
                let key = normalize_key(key);
                match field {
                    Value::String(secret) if key == "votingkey" => {
                        *secret = VotingKey::new(secret.as_str()).to_string();
                    }
                    // An echoed request may travel as an encoded blob.
                    Value::String(blob) if key == "request" => {
                        *field = redacted_blob(blob);
                    }
                    other => redact(other),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

fn redacted_blob(blob: &str) -> Value {
    let decoded = BASE64
        .decode(blob.as_bytes())
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
    match decoded {
        Some(mut request) => {
            redact(&mut request);
            request
        }
        None => Value::String(format!("<{} bytes>", blob.len())),
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log4rs config {path}: {reason}")]
    File { path: String, reason: String },
    #[error("Could not build fallback logger: {0}")]
    Fallback(String),
}

/// Initialise log4rs from `path`, or log to the console at `info` when
/// there is no such file.
pub fn init(path: &Path) -> Result<(), LoggingError> {
    if path.exists() {
        return log4rs::init_file(path, Default::default()).map_err(|e| LoggingError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        });
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(FALLBACK_PATTERN)))
        .build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
        .map_err(|e| LoggingError::Fallback(e.to_string()))?;
    log4rs::init_config(config).map_err(|e| LoggingError::Fallback(e.to_string()))?;
    info!("No log config at {}, logging to console", path.display());
    Ok(())
}
