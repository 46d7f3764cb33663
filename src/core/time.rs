//! Clock stamps, unique ids and the envelope around `--format json` output.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use ulid::Ulid;

pub const ENVELOPE_VERSION: &str = "1.0.0";

/// Whole seconds since the Unix epoch with a `Z` suffix, e.g. `1771220592Z`.
pub fn epoch_stamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    format!("{secs}Z")
}

/// Lexically sortable unique id.
pub fn unique_id() -> String {
    Ulid::new().to_string()
}

/// Machine-readable result of one command. The body's fields are emitted beside the
/// envelope's own.
#[derive(Debug, Serialize)]
pub struct CommandEnvelope<'a, T> {
    pub envelope_version: &'static str,
    pub ts: String,
    pub event_id: String,
    pub cmd: &'a str,
    pub status: &'a str,
    #[serde(flatten)]
    pub body: T,
}

impl<'a, T: Serialize> CommandEnvelope<'a, T> {
    pub fn new(cmd: &'a str, status: &'a str, body: T) -> Self {
        Self {
            envelope_version: ENVELOPE_VERSION,
            ts: epoch_stamp(),
            event_id: unique_id(),
            cmd,
            status,
            body,
        }
    }
}
