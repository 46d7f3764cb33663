//! Hook event documents and the typed view of intercepted tool calls.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::core::error::PlanlockError;
use crate::core::tasks::Task;

/// Raw pre/post tool-use event as delivered by the host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolEvent {
    #[serde(alias = "tool_name", alias = "toolName", default)]
    pub tool: String,
    #[serde(alias = "tool_input", alias = "toolInput", default)]
    pub parameters: JsonValue,
    /// Only present on post-invocation events.
    #[serde(default = "default_success")]
    pub success: bool,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoEntry {
    pub content: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub active_form: Option<String>,
}

impl TodoEntry {
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("completed")
    }

    pub fn to_task(&self) -> Task {
        Task::new(&self.content, self.is_completed())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    WriteFile { file_path: String },
    EditFile { file_path: String },
    MultiEdit { file_paths: Vec<String> },
    NotebookEdit { notebook_path: String },
    TodoWrite { todos: Vec<TodoEntry> },
    Shell { command: String },
    Other { tool: String, parameters: JsonValue },
}

#[derive(Deserialize)]
struct FilePathParams {
    file_path: String,
}

#[derive(Deserialize)]
struct MultiEditParams {
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    edits: Vec<EditParams>,
}

#[derive(Deserialize)]
struct EditParams {
    #[serde(default)]
    file_path: Option<String>,
}

#[derive(Deserialize)]
struct NotebookParams {
    notebook_path: String,
}

#[derive(Deserialize)]
struct TodoParams {
    todos: Vec<TodoEntry>,
}

#[derive(Deserialize)]
struct ShellParams {
    command: String,
}

fn params<T: serde::de::DeserializeOwned>(tool: &str, value: &JsonValue) -> Result<T, PlanlockError> {
    serde_json::from_value(value.clone()).map_err(|e| {
        PlanlockError::ValidationError(format!("malformed parameters for {tool}: {e}"))
    })
}

impl ToolInvocation {
    /// Map a host tool name and its parameter bag onto a known tool shape.
    ///
    /// Unknown tools become [`ToolInvocation::Other`]; a known tool with parameters of the
    /// wrong shape is an error.
    pub fn from_event(event: &ToolEvent) -> Result<Self, PlanlockError> {
        let tool = event.tool.as_str();
        let p = &event.parameters;
        let invocation = match tool {
            "Write" | "write_file" | "write-file" => Self::WriteFile {
                file_path: params::<FilePathParams>(tool, p)?.file_path,
            },
            "Edit" | "edit_file" | "edit-file" => Self::EditFile {
                file_path: params::<FilePathParams>(tool, p)?.file_path,
            },
            "MultiEdit" | "multi_edit" | "multi-edit" => {
                let parsed: MultiEditParams = params(tool, p)?;
                let mut file_paths: Vec<String> = parsed.file_path.into_iter().collect();
                for edit in parsed.edits {
                    if let Some(path) = edit.file_path
                        && !file_paths.contains(&path)
                    {
                        file_paths.push(path);
                    }
                }
                if file_paths.is_empty() {
                    return Err(PlanlockError::ValidationError(format!(
                        "{tool} carries no file_path"
                    )));
                }
                Self::MultiEdit { file_paths }
            }
            "NotebookEdit" | "notebook_edit" | "notebook-edit" => Self::NotebookEdit {
                notebook_path: params::<NotebookParams>(tool, p)?.notebook_path,
            },
            "TodoWrite" | "todo_write" | "write_todo_list" | "write-todo-list" => Self::TodoWrite {
                todos: params::<TodoParams>(tool, p)?.todos,
            },
            "Bash" | "shell" | "shell_command" | "shell-command" => Self::Shell {
                command: params::<ShellParams>(tool, p)?.command,
            },
            _ => Self::Other {
                tool: tool.to_string(),
                parameters: p.clone(),
            },
        };
        Ok(invocation)
    }

    /// Target paths of file-mutating tools; empty for everything else.
    pub fn target_paths(&self) -> Vec<&str> {
        match self {
            Self::WriteFile { file_path } | Self::EditFile { file_path } => vec![file_path.as_str()],
            Self::MultiEdit { file_paths } => file_paths.iter().map(String::as_str).collect(),
            Self::NotebookEdit { notebook_path } => vec![notebook_path.as_str()],
            _ => Vec::new(),
        }
    }

    pub fn proposed_tasks(&self) -> Option<Vec<Task>> {
        match self {
            Self::TodoWrite { todos } => Some(todos.iter().map(TodoEntry::to_task).collect()),
            _ => None,
        }
    }
}

/// Pre-tool-use response: `{"action": "allow"|"block", "message"?: ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Verdict {
    Allow {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Block { message: String },
}

impl Verdict {
    pub fn allow() -> Self {
        Self::Allow { message: None }
    }

    pub fn allow_with(message: impl Into<String>) -> Self {
        Self::Allow {
            message: Some(message.into()),
        }
    }

    pub fn block(message: impl Into<String>) -> Self {
        Self::Block {
            message: message.into(),
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block { .. })
    }
}

/// User-prompt event: structured `{"message": ...}` or a bare string.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptEvent {
    #[serde(alias = "prompt")]
    pub message: String,
}

impl PromptEvent {
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<PromptEvent>(raw) {
            Ok(event) => event,
            Err(_) => match serde_json::from_str::<String>(raw) {
                Ok(message) => Self { message },
                Err(_) => Self {
                    message: raw.trim().to_string(),
                },
            },
        }
    }
}

/// User-prompt response: `{"action": "allow"|"inject", "context"?: ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PromptResponse {
    Allow,
    Inject { context: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(tool: &str, parameters: JsonValue) -> ToolEvent {
        ToolEvent {
            tool: tool.to_string(),
            parameters,
            success: true,
        }
    }

    #[test]
    fn parses_host_and_snake_case_names() {
        let w = ToolInvocation::from_event(&event("Write", json!({"file_path": "a.rs", "content": "x"}))).unwrap();
        assert_eq!(w, ToolInvocation::WriteFile { file_path: "a.rs".into() });
        let e = ToolInvocation::from_event(&event("edit_file", json!({"file_path": "b.rs"}))).unwrap();
        assert_eq!(e.target_paths(), vec!["b.rs"]);
        let s = ToolInvocation::from_event(&event("Bash", json!({"command": "ls"}))).unwrap();
        assert_eq!(s, ToolInvocation::Shell { command: "ls".into() });
    }

    #[test]
    fn multi_edit_collects_all_paths() {
        let inv = ToolInvocation::from_event(&event(
            "MultiEdit",
            json!({"file_path": "a.rs", "edits": [{"file_path": "b.rs"}, {"old_string": "x"}, {"file_path": "a.rs"}]}),
        ))
        .unwrap();
        assert_eq!(inv.target_paths(), vec!["a.rs", "b.rs"]);
        assert!(ToolInvocation::from_event(&event("MultiEdit", json!({"edits": []}))).is_err());
    }

    #[test]
    fn todo_status_maps_to_completion() {
        let inv = ToolInvocation::from_event(&event(
            "TodoWrite",
            json!({"todos": [
                {"content": "Create model", "status": "completed", "activeForm": "Creating model"},
                {"content": "Add tests", "status": "in_progress"},
                {"content": "Docs", "status": "pending"}
            ]}),
        ))
        .unwrap();
        let tasks = inv.proposed_tasks().unwrap();
        assert_eq!(tasks.iter().filter(|t| t.completed).count(), 1);
        assert_eq!(tasks[0].content, "Create model");
    }

    #[test]
    fn malformed_known_tool_is_an_error_unknown_tool_is_other() {
        assert!(ToolInvocation::from_event(&event("Write", json!({"path": "x"}))).is_err());
        let other = ToolInvocation::from_event(&event("WebFetch", json!({"url": "u"}))).unwrap();
        assert!(matches!(other, ToolInvocation::Other { ref tool, .. } if tool == "WebFetch"));
        assert!(other.target_paths().is_empty());
    }

    #[test]
    fn test_event_field_aliases() {
        let e: ToolEvent =
            serde_json::from_str(r#"{"tool_name":"Edit","tool_input":{"file_path":"x"}}"#).unwrap();
        assert_eq!(e.tool, "Edit");
        assert!(e.success);
        let e: ToolEvent =
            serde_json::from_str(r#"{"tool":"Edit","parameters":{},"success":false}"#).unwrap();
        assert!(!e.success);
    }

    #[test]
    fn test_verdict_wire_shape() {
        assert_eq!(serde_json::to_value(Verdict::allow()).unwrap(), json!({"action": "allow"}));
        assert_eq!(
            serde_json::to_value(Verdict::block("no")).unwrap(),
            json!({"action": "block", "message": "no"})
        );
        assert_eq!(
            serde_json::to_value(PromptResponse::Inject { context: "c".into() }).unwrap(),
            json!({"action": "inject", "context": "c"})
        );
        assert_eq!(serde_json::to_value(PromptResponse::Allow).unwrap(), json!({"action": "allow"}));
    }

    #[test]
    fn prompt_event_accepts_bare_strings() {
        assert_eq!(PromptEvent::parse(r#"{"message":"apply: x"}"#).message, "apply: x");
        assert_eq!(PromptEvent::parse(r#"{"prompt":"hi"}"#).message, "hi");
        assert_eq!(PromptEvent::parse(r#""quoted""#).message, "quoted");
        assert_eq!(PromptEvent::parse("  plain text \n").message, "plain text");
    }
}
