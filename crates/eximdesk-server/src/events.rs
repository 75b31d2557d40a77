//! Import progress protocol — the events carried on the NDJSON stream.

use serde::Serialize;

/// No-op line emitted while the pipeline is between events, so idle-timeout
/// proxies keep the connection open. The ':' prefix lets readers discard it
/// without attempting to parse JSON.
pub const KEEP_ALIVE_LINE: &str = ": keep-alive";

/// One line of the import stream. The server emits exactly one terminal
/// event (`done` or `error`) per run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImportEvent {
    Log {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Progress {
        total_processed: usize,
        total_records: usize,
        percentage: u32,
    },
    Done {
        count: usize,
        message: String,
    },
    Error {
        message: String,
    },
}

impl ImportEvent {
    pub fn log(message: impl Into<String>) -> Self {
        ImportEvent::Log {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportEvent::Done { .. } | ImportEvent::Error { .. })
    }
}
