//! Ollama chat adapter for the decision oracle.
//!
//! One non-streaming `POST {endpoint}/api/chat` per decision. The system
//! instruction is sent as a leading `system` message; routing actions, when
//! offered, go in the `tools` array.

use super::schema::JsonSchemaActionConverter;
use crate::config::FileOracleConfig;
use async_trait::async_trait;
use council_application::ports::decision_oracle::{DecisionOracle, OracleError, OracleReply};
use council_domain::{ActionCall, ActionDefinition, Message, preview};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct ToolCall {
    #[serde(default)]
    id: Option<String>,
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Decision oracle backed by an Ollama server
pub struct OllamaDecisionOracle {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    converter: JsonSchemaActionConverter,
}

impl OllamaDecisionOracle {
    pub fn new(config: &FileOracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| OracleError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            converter: JsonSchemaActionConverter,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.endpoint)
    }

    fn build_request<'a>(
        &'a self,
        system_instruction: &'a str,
        history: &'a [Message],
        actions: Option<&[ActionDefinition]>,
    ) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: system_instruction,
        });
        messages.extend(history.iter().map(|m| ChatMessage {
            role: m.role().as_str(),
            content: m.content(),
        }));

        ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            tools: actions
                .map(|a| self.converter.actions_schema(a))
                .unwrap_or_default(),
        }
    }

    async fn post(&self, request: &ChatRequest<'_>) -> Result<OracleReply, OracleError> {
        let response = self
            .client
            .post(self.chat_url())
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(OracleError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                preview(&body, 200)
            )));
        }
        trace!("Ollama response: {}", body);

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
        into_reply(parsed)
    }
}

fn transport_error(error: reqwest::Error) -> OracleError {
    if error.is_timeout() {
        OracleError::Timeout
    } else if error.is_connect() {
        OracleError::Connection(error.to_string())
    } else {
        OracleError::RequestFailed(error.to_string())
    }
}

fn into_reply(response: ChatResponse) -> Result<OracleReply, OracleError> {
    let Some(tool_calls) = response.message.tool_calls else {
        return Ok(OracleReply::FreeText(response.message.content));
    };
    tool_calls
        .into_iter()
        .map(into_action_call)
        .collect::<Result<Vec<_>, _>>()
        .map(OracleReply::ActionCalls)
}

fn into_action_call(call: ToolCall) -> Result<ActionCall, OracleError> {
    // Some models return the arguments as a JSON-encoded string.
    let arguments = match call.function.arguments {
        Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
            OracleError::InvalidResponse(format!(
                "arguments of '{}' are not JSON: {}",
                call.function.name, e
            ))
        })?,
        other => other,
    };
    let mut action = ActionCall::new(call.function.name);
    match arguments {
        Value::Object(map) => action.arguments.extend(map),
        Value::Null => {}
        other => {
            return Err(OracleError::InvalidResponse(format!(
                "arguments of '{}' must be an object, got {}",
                action.name, other
            )));
        }
    }
    if let Some(id) = call.id {
        action = action.with_call_id(id);
    }
    Ok(action)
}

#[async_trait]
impl DecisionOracle for OllamaDecisionOracle {
    async fn decide(
        &self,
        system_instruction: &str,
        history: &[Message],
        actions: Option<&[ActionDefinition]>,
        cancellation: &CancellationToken,
    ) -> Result<OracleReply, OracleError> {
        let request = self.build_request(system_instruction, history, actions);
        debug!(
            "Ollama chat: model={}, messages={}, tools={}",
            self.model,
            request.messages.len(),
            request.tools.len()
        );

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(OracleError::Cancelled),
            reply = self.post(&request) => reply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::ActionCatalogue;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn config(endpoint: &str) -> FileOracleConfig {
        FileOracleConfig {
            endpoint: endpoint.to_string(),
            timeout_seconds: 5,
            ..FileOracleConfig::default()
        }
    }

    /// Serve one HTTP response and hand back the raw request body.
    async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            let body_start = loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&raw[..body_start]).to_lowercase();
            let length: usize = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while raw.len() < body_start + length {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw[body_start..]).to_string()
        });
        (endpoint, handle)
    }

    #[test]
    fn test_request_shape_with_actions() {
        let oracle = OllamaDecisionOracle::new(&config("http://localhost:11434/")).unwrap();
        let history = vec![Message::user("Add dark mode", "user")];
        let catalogue = ActionCatalogue::routing();

        let request = oracle.build_request("be a manager", &history, Some(catalogue.all()));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(oracle.chat_url(), "http://localhost:11434/api/chat");
        assert_eq!(json["model"], "llama3.1");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "be a manager");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["tools"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_request_without_actions_omits_tools() {
        let oracle = OllamaDecisionOracle::new(&config("http://localhost:11434")).unwrap();
        let history = vec![Message::assistant("q", "coordinator")];

        let request = oracle.build_request("be a worker", &history, None);
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("tools").is_none());
        assert_eq!(json["messages"][1]["role"], "assistant");
    }

    #[test]
    fn test_tool_calls_become_action_calls() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"message": {"role": "assistant", "content": "", "tool_calls": [
                {"function": {"name": "ask_worker",
                  "arguments": {"worker_name": "Worker_0", "question": "Cost?"}}},
                {"function": {"name": "ask_all_workers",
                  "arguments": "{\"question\": \"Risks?\"}"}}
            ]}}"#,
        )
        .unwrap();

        let reply = into_reply(response).unwrap();

        let OracleReply::ActionCalls(calls) = reply else {
            panic!("expected action calls");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "ask_worker");
        assert_eq!(calls[0].get_string("worker_name"), Some("Worker_0"));
        assert_eq!(calls[1].get_string("question"), Some("Risks?"));
    }

    #[test]
    fn test_empty_tool_calls_stay_empty() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"message": {"content": "hmm", "tool_calls": []}}"#).unwrap();

        assert_eq!(
            into_reply(response).unwrap(),
            OracleReply::ActionCalls(vec![])
        );
    }

    #[test]
    fn test_content_without_tool_calls_is_free_text() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"message": {"role": "assistant", "content": "Ship it"}}"#)
                .unwrap();

        assert_eq!(
            into_reply(response).unwrap(),
            OracleReply::FreeText("Ship it".to_string())
        );
    }

    #[test]
    fn test_non_object_arguments_are_invalid() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"message": {"tool_calls": [{"function": {"name": "ask_user", "arguments": [1]}}]}}"#,
        )
        .unwrap();

        assert!(matches!(
            into_reply(response),
            Err(OracleError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_decide_round_trip() {
        let (endpoint, server) =
            serve_once(200, r#"{"message": {"role": "assistant", "content": "done"}}"#).await;
        let oracle = OllamaDecisionOracle::new(&config(&endpoint)).unwrap();

        let reply = oracle
            .decide(
                "policy",
                &[Message::user("task", "user")],
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(reply, OracleReply::FreeText("done".to_string()));
        let sent: Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent["stream"], false);
        assert_eq!(sent["messages"][1]["content"], "task");
    }

    #[tokio::test]
    async fn test_http_error_is_request_failed() {
        let (endpoint, _server) = serve_once(500, r#"{"error": "model not found"}"#).await;
        let oracle = OllamaDecisionOracle::new(&config(&endpoint)).unwrap();

        let result = oracle
            .decide("policy", &[], None, &CancellationToken::new())
            .await;

        assert!(
            matches!(result, Err(OracleError::RequestFailed(msg)) if msg.contains("500"))
        );
    }

    #[tokio::test]
    async fn test_garbage_body_is_invalid_response() {
        let (endpoint, _server) = serve_once(200, "not json").await;
        let oracle = OllamaDecisionOracle::new(&config(&endpoint)).unwrap();

        let result = oracle
            .decide("policy", &[], None, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(OracleError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let oracle = OllamaDecisionOracle::new(&config("http://127.0.0.1:9")).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = oracle.decide("policy", &[], None, &cancel).await;

        assert!(matches!(result, Err(OracleError::Cancelled)));
    }
}
