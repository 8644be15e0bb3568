//! Mock provider tests
//!
//! Drive the `Provider` trait and `ModelClient` through mockall.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use logpilot_provider::{
    ChatParams, ChatResponse, Message, ModelClient, Provider, ProviderError, Tool, ToolCall,
    ToolChoice, Usage,
};
use serde_json::json;

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn name(&self) -> &str;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

fn mock_with_model(model: &str) -> MockProvider {
    let mut mock = MockProvider::new();
    let model = model.to_string();
    mock.expect_default_model().returning(move || model.clone());
    mock.expect_name().return_const("mock".to_string());
    mock
}

fn list_logs_tool() -> Tool {
    Tool::new(
        "list_log_files",
        "List available log files",
        json!({"type": "object", "properties": {}, "required": []}),
    )
}

#[tokio::test]
async fn test_mock_provider_chat_returns_text() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .returning(|_| Ok(ChatResponse::text("Two log files are available.")));

    let response = mock.chat(ChatParams::default()).await.unwrap();

    assert_eq!(
        response.content.as_deref(),
        Some("Two log files are available.")
    );
    assert!(!response.has_tool_calls());
}

#[tokio::test]
async fn test_mock_provider_chat_returns_error() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .returning(|_| Err(ProviderError::Api("quota exceeded".to_string())));

    match mock.chat(ChatParams::default()).await {
        Err(ProviderError::Api(msg)) => assert_eq!(msg, "quota exceeded"),
        other => panic!("expected Api error, got {:?}", other.map(|r| r.content)),
    }
}

#[tokio::test]
async fn test_mock_provider_rate_limited() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .returning(|_| Err(ProviderError::RateLimited));

    let result = mock.chat(ChatParams::default()).await;
    assert!(matches!(result, Err(ProviderError::RateLimited)));
}

#[tokio::test]
async fn test_model_client_binds_tools_and_settings() {
    let mut mock = mock_with_model("gemini-2.5-flash");
    mock.expect_chat()
        .times(1)
        .withf(|params| {
            params.model == "gemini-2.5-flash"
                && params.temperature == 0.1
                && params.max_tokens == 4096
                && params.tools.len() == 1
                && params.tools[0].function.name == "list_log_files"
                && params.messages.len() == 2
                && matches!(params.tool_choice, ToolChoice::Auto)
        })
        .returning(|_| Ok(ChatResponse::text("ok")));

    let client = ModelClient::new(Arc::new(mock), vec![list_logs_tool()]);
    assert_eq!(client.model(), "gemini-2.5-flash");
    assert_eq!(client.tools().len(), 1);

    let messages = vec![Message::system("You are a DevOps assistant"), Message::user("hi")];
    let response = client.invoke(&messages).await.unwrap();
    assert_eq!(response.text_content().as_deref(), Some("ok"));
}

#[tokio::test]
async fn test_model_client_overrides() {
    let mut mock = mock_with_model("default-model");
    mock.expect_chat()
        .times(1)
        .withf(|params| {
            params.model == "openai/gpt-5" && params.temperature == 0.5 && params.max_tokens == 512
        })
        .returning(|_| Ok(ChatResponse::text("ok")));

    let client = ModelClient::new(Arc::new(mock), vec![])
        .with_model("openai/gpt-5")
        .with_temperature(0.5)
        .with_max_tokens(512);

    client.invoke(&[Message::user("hi")]).await.unwrap();
}

#[tokio::test]
async fn test_model_client_returns_tool_calls() {
    let mut mock = mock_with_model("m");
    mock.expect_chat().times(1).returning(|_| {
        Ok(ChatResponse {
            content: Some("Let me look.".to_string()),
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                name: "list_log_files".to_string(),
                arguments: json!({}),
            }],
            finish_reason: "tool_calls".to_string(),
            usage: Usage {
                prompt_tokens: 120,
                completion_tokens: 12,
                total_tokens: 132,
            },
        })
    });

    let client = ModelClient::new(Arc::new(mock), vec![list_logs_tool()]);
    let response = client.invoke(&[Message::user("What logs exist?")]).await.unwrap();

    assert!(response.has_tool_calls());
    assert_eq!(response.tool_calls[0].name, "list_log_files");
    assert_eq!(response.usage.total_tokens, 132);
}

#[tokio::test]
async fn test_model_client_propagates_errors() {
    let mut mock = mock_with_model("m");
    mock.expect_chat()
        .times(1)
        .returning(|_| Err(ProviderError::InvalidResponse));

    let client = ModelClient::new(Arc::new(mock), vec![]);
    let result = client.invoke(&[Message::user("hi")]).await;
    assert!(matches!(result, Err(ProviderError::InvalidResponse)));
}

#[tokio::test]
async fn test_model_client_passes_full_history() {
    let mut mock = mock_with_model("m");
    mock.expect_chat()
        .times(1)
        .withf(|params| {
            let roles: Vec<&str> = params.messages.iter().map(|m| m.role.as_str()).collect();
            roles == ["system", "user", "assistant", "tool"]
        })
        .returning(|_| Ok(ChatResponse::text("Found 3 errors.")));

    let call = ToolCall {
        id: "call_9".to_string(),
        name: "search_logs".to_string(),
        arguments: json!({"filename": "app.log", "search_term": "ERROR"}),
    };
    let messages = vec![
        Message::system("prompt"),
        Message::user("Any errors in app.log?"),
        Message::assistant_with_tools(None, &[call]),
        Message::tool("call_9", "search_logs", "Found 3 matches"),
    ];

    let client = ModelClient::new(Arc::new(mock), vec![]);
    let response = client.invoke(&messages).await.unwrap();
    assert_eq!(response.text_content().as_deref(), Some("Found 3 errors."));
}
