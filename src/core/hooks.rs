//! Hook entry points: raw input document in, response document out.
//!
//! Handlers take the raw stdin text (or `None` when nothing arrived in time) so they can
//! be driven directly from tests. Absent or malformed input always degrades to the
//! permissive response.

use std::io::Read;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::core::config::PlanlockConfig;
use crate::core::dispatch::{DispatchAction, KeywordDispatcher};
use crate::core::error::PlanlockError;
use crate::core::events::{PromptEvent, PromptResponse, ToolEvent, Verdict};
use crate::core::gate::EnforcementGate;
use crate::core::git::BranchCoordinator;
use crate::core::store::StateRepository;
use crate::core::sync::PostToolSync;

/// Read `reader` to the end on a helper thread, giving up after `timeout`.
///
/// On timeout the helper thread is abandoned; the process is short-lived.
pub fn read_bounded<R>(mut reader: R, timeout: Duration) -> Option<String>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = String::new();
        let result = reader.read_to_string(&mut buf).map(|_| buf);
        let _ = tx.send(result);
    });
    match rx.recv_timeout(timeout) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "failed to read hook input");
            None
        }
        Err(_) => {
            tracing::warn!(timeout_secs = timeout.as_secs(), "hook input timed out, treating as absent");
            None
        }
    }
}

pub fn read_stdin_bounded(timeout: Duration) -> Option<String> {
    read_bounded(std::io::stdin(), timeout)
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

pub fn pre_tool_use(
    raw: Option<&str>,
    project_root: &Path,
    store: &dyn StateRepository,
    branches: &dyn BranchCoordinator,
    config: &PlanlockConfig,
) -> Verdict {
    let Some(raw) = non_empty(raw) else {
        return Verdict::allow();
    };
    let event: ToolEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "malformed tool-invocation event, allowing");
            return Verdict::allow();
        }
    };
    let state = store.load();
    EnforcementGate::new(project_root, branches, config).evaluate(&state, &event)
}

pub fn user_prompt(
    raw: Option<&str>,
    project_root: &Path,
    store: &dyn StateRepository,
    branches: &dyn BranchCoordinator,
    config: &PlanlockConfig,
) -> Result<PromptResponse, PlanlockError> {
    let Some(raw) = non_empty(raw) else {
        return Ok(PromptResponse::Allow);
    };
    let event = PromptEvent::parse(raw);
    let state = store.load();
    let dispatcher = KeywordDispatcher::new(project_root, store, branches, config);
    Ok(match dispatcher.dispatch(&event.message, &state)? {
        DispatchAction::Passthrough => PromptResponse::Allow,
        DispatchAction::Inject(context) => PromptResponse::Inject { context },
    })
}

/// Returns advisory text for the host, if any.
pub fn post_tool_use(
    raw: Option<&str>,
    project_root: &Path,
    store: &dyn StateRepository,
    branches: &dyn BranchCoordinator,
) -> Result<Option<String>, PlanlockError> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    let event: ToolEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "malformed post-invocation event, ignoring");
            return Ok(None);
        }
    };
    PostToolSync::new(project_root, store, branches).apply(&event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Stalled;

    impl Read for Stalled {
        fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
            thread::sleep(Duration::from_secs(2));
            Ok(0)
        }
    }

    #[test]
    fn bounded_read_returns_input() {
        let text = read_bounded(Cursor::new(b"{\"message\":\"hi\"}".to_vec()), Duration::from_secs(1));
        assert_eq!(text.as_deref(), Some("{\"message\":\"hi\"}"));
    }

    #[test]
    fn bounded_read_gives_up_on_stalled_input() {
        assert_eq!(read_bounded(Stalled, Duration::from_millis(50)), None);
    }
}
