//! `generate_graph` tool boundary.
//!
//! Adapts the orchestrator to the request/response shape an LLM tool layer
//! expects: plain JSON in, `{url, logs}` or `{error, logs}` out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::{GenerationRequest, LogObserver, ProvisioningResult};
use crate::orchestrator::Orchestrator;

pub const TOOL_NAME: &str = "generate_graph";

/// Arguments of a `generate_graph` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub code: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl From<ToolRequest> for GenerationRequest {
    fn from(req: ToolRequest) -> Self {
        GenerationRequest::new(req.code, req.dependencies)
    }
}

/// Result handed back to the tool layer. Serialized without a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResponse {
    Ready { url: String, logs: Vec<String> },
    Failed { error: String, logs: Vec<String> },
}

impl ToolResponse {
    pub fn logs(&self) -> &[String] {
        match self {
            ToolResponse::Ready { logs, .. } | ToolResponse::Failed { logs, .. } => logs,
        }
    }
}

impl From<ProvisioningResult> for ToolResponse {
    fn from(result: ProvisioningResult) -> Self {
        let logs = result.log_lines();
        match result {
            ProvisioningResult::Success { url, .. } => ToolResponse::Ready { url, logs },
            ProvisioningResult::Failure { error, .. } => ToolResponse::Failed {
                error: error.to_string(),
                logs,
            },
        }
    }
}

/// Execute one `generate_graph` call.
pub async fn execute_generate_graph(orchestrator: &Orchestrator, request: ToolRequest) -> ToolResponse {
    execute_with_observer(orchestrator, request, None).await
}

/// As [`execute_generate_graph`], also streaming each line to `observer`.
pub async fn execute_with_observer(
    orchestrator: &Orchestrator,
    request: ToolRequest,
    observer: Option<Arc<dyn LogObserver>>,
) -> ToolResponse {
    let request = GenerationRequest::from(request);
    orchestrator.run(&request, observer).await.into()
}

/// Tool definition advertised to the model.
pub fn tool_definition() -> Value {
    json!({
        "name": TOOL_NAME,
        "description": "Generates and deploys a React graph application",
        "parameters": {
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "The full source code for App.tsx"
                },
                "dependencies": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "List of npm dependencies to install"
                }
            },
            "required": ["code", "dependencies"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreviewConfig;
    use crate::fakes::MemoryProvider;
    use std::sync::Mutex;

    #[test]
    fn test_request_defaults_dependencies() {
        let req: ToolRequest = serde_json::from_str(r#"{"code":"x"}"#).unwrap();
        assert!(req.dependencies.is_empty());
    }

    #[test]
    fn test_response_is_untagged() {
        let ok = ToolResponse::Ready {
            url: "https://h".into(),
            logs: vec!["a".into()],
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"url": "https://h", "logs": ["a"]})
        );

        let parsed: ToolResponse =
            serde_json::from_value(json!({"error": "boom", "logs": []})).unwrap();
        assert!(matches!(parsed, ToolResponse::Failed { .. }));
    }

    #[test]
    fn test_definition_lists_parameters() {
        let def = tool_definition();
        assert_eq!(def["name"], TOOL_NAME);
        assert_eq!(def["parameters"]["properties"]["code"]["type"], "string");
        assert_eq!(
            def["parameters"]["properties"]["dependencies"]["items"]["type"],
            "string"
        );
    }

    #[tokio::test]
    async fn test_execute_success_and_failure() {
        let ok = Orchestrator::new(Arc::new(MemoryProvider::new()), PreviewConfig::default());
        let resp = execute_generate_graph(
            &ok,
            ToolRequest {
                code: "export default () => null".into(),
                dependencies: vec!["recharts".into()],
            },
        )
        .await;
        match &resp {
            ToolResponse::Ready { url, logs } => {
                assert!(url.starts_with("https://"));
                assert!(logs.last().unwrap().starts_with("Preview available at"));
            }
            other => panic!("expected Ready, got {:?}", other),
        }

        let bad = Orchestrator::new(
            Arc::new(MemoryProvider::new().with_install_exit_code(1)),
            PreviewConfig::default(),
        );
        let resp = execute_generate_graph(
            &bad,
            ToolRequest {
                code: String::new(),
                dependencies: vec![],
            },
        )
        .await;
        match resp {
            ToolResponse::Failed { error, logs } => {
                assert!(error.contains("1"));
                assert!(!logs.is_empty());
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_observer_sees_every_returned_line() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: Arc<dyn LogObserver> = Arc::new(move |line: &str| {
            sink.lock().unwrap().push(line.to_string());
        });
        let orch = Orchestrator::new(Arc::new(MemoryProvider::new()), PreviewConfig::default());

        let resp = execute_with_observer(
            &orch,
            ToolRequest {
                code: String::new(),
                dependencies: vec![],
            },
            Some(observer),
        )
        .await;

        assert_eq!(*seen.lock().unwrap(), resp.logs().to_vec());
    }
}
