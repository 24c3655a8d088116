use log::trace;
use reqwest::StatusCode;
use thiserror::Error;

use super::response::ResourceRecord;
use crate::provider::{ProviderError, TxtRecord};

/// Reg.ru error codes that indicate a temporary condition. Everything else is treated as permanent
const TRANSIENT_ERROR_CODES: [&str; 5] = [
    "IP_EXCEEDED_ALLOWED_CONNECTION_RATE",
    "ACCOUNT_EXCEEDED_ALLOWED_CONNECTION_RATE",
    "SERVICE_UNAVAILABLE",
    "SERVICE_TEMPORARILY_UNAVAILABLE",
    "INTERNAL_ERROR",
];

/// Failure of a single call against the Reg.ru API, before it is classified into a [`ProviderError`]
#[derive(Error, Debug)]
pub enum ApiFailure {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("[{code}] {text}")]
    Api { code: String, text: String },
}

impl From<ApiFailure> for ProviderError {
    fn from(f: ApiFailure) -> Self {
        let msg = f.to_string();
        let transient = match &f {
            ApiFailure::Transport(e) => !e.is_builder(),
            ApiFailure::Status(s) => *s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error(),
            ApiFailure::Malformed(_) => false,
            ApiFailure::Api { code, .. } => TRANSIENT_ERROR_CODES.contains(&code.as_str()),
        };
        trace!("Classified API failure (transient: {}): {}", transient, msg);
        if transient {
            ProviderError::Transient(msg)
        } else {
            ProviderError::Permanent(msg)
        }
    }
}

impl TryFrom<&ResourceRecord> for TxtRecord {
    type Error = String;

    fn try_from(r: &ResourceRecord) -> Result<Self, Self::Error> {
        if !r.rectype.eq_ignore_ascii_case("TXT") {
            return Err(format!("Invalid record type: {}", r.rectype));
        }
        Ok(TxtRecord {
            subdomain: r.subname.to_owned(),
            // The zone listing may return TXT data in presentation format
            content: r.content.trim_matches('"').to_owned(),
        })
    }
}
