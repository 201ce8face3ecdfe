use anyhow::Context;
use aws_config::BehaviorVersion;
use lambda_http::http::Method;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use academy_shared::{
    AcademyError, BedrockConfig, BedrockService, ChatRequest, ChatResponse, CorsConfig,
    CourseAssistant, Responder,
};

/// Parse the request body, rejecting blank questions.
fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, &'static str> {
    if body.is_empty() {
        return Err("Request body is required");
    }

    let request: ChatRequest = serde_json::from_slice(body).map_err(|e| {
        warn!("Invalid chat request body: {}", e);
        "Invalid request body"
    })?;

    if request.message.trim().is_empty() {
        return Err("message is required");
    }
    Ok(request)
}

async fn function_handler<A: CourseAssistant>(
    assistant: &A,
    responder: &Responder,
    event: Request,
) -> Result<Response<Body>, Error> {
    info!("Received {} {}", event.method(), event.uri().path());

    if event.method() == Method::OPTIONS {
        return responder.preflight();
    }
    if event.method() != Method::POST {
        return responder.method_not_allowed();
    }

    let request = match parse_chat_request(event.body().as_ref()) {
        Ok(request) => request,
        Err(message) => return responder.bad_request(message),
    };

    match assistant.process_message(&request).await {
        Ok(response) => responder.ok(&ChatResponse {
            response,
            course_id: assistant.course_id().to_string(),
            model_id: assistant.model_id().to_string(),
        }),
        Err(e @ AcademyError::BedrockError(_)) => {
            error!("Model invocation failed: {}", e);
            responder.bad_gateway("The assistant is not available right now")
        }
        Err(e) => {
            error!("Failed to process chat message: {}", e);
            responder.server_error("Internal server error")
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    info!("Starting bedrock-chat Lambda function");

    let bedrock = BedrockConfig::from_env().context("loading Bedrock configuration")?;
    info!("Lambda configuration - BEDROCK_MODEL_ID: {}", bedrock.model_id);

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let client = aws_sdk_bedrockruntime::Client::new(&config);

    let assistant = BedrockService::new(client, bedrock);
    let responder = Responder::new(CorsConfig::from_env(), "POST,OPTIONS");

    let assistant_ref = &assistant;
    let responder_ref = &responder;
    run(service_fn(move |event: Request| async move {
        function_handler(assistant_ref, responder_ref, event).await
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_shared::AcademyResult;
    use async_trait::async_trait;
    use lambda_http::http::StatusCode;

    enum Behaviour {
        Echo,
        Unreachable,
        Broken,
    }

    struct StubAssistant(Behaviour);

    #[async_trait]
    impl CourseAssistant for StubAssistant {
        fn course_id(&self) -> &str {
            "bedrock-rag"
        }

        fn model_id(&self) -> &str {
            "stub-model"
        }

        async fn process_message(&self, request: &ChatRequest) -> AcademyResult<String> {
            match self.0 {
                Behaviour::Echo => Ok(format!("echo: {}", request.message)),
                Behaviour::Unreachable => Err(AcademyError::BedrockError("dispatch failure".to_string())),
                Behaviour::Broken => Err(AcademyError::SerializationError("bad reply".to_string())),
            }
        }
    }

    fn request(method: &str, body: &str) -> Request {
        lambda_http::http::Request::builder()
            .method(method)
            .uri("/api/chat")
            .body(Body::from(body))
            .unwrap()
    }

    async fn call(behaviour: Behaviour, event: Request) -> (StatusCode, serde_json::Value) {
        let responder = Responder::new(CorsConfig::default(), "POST,OPTIONS");
        let response = function_handler(&StubAssistant(behaviour), &responder, event)
            .await
            .unwrap();
        let body = serde_json::from_slice(response.body().as_ref()).unwrap_or(serde_json::Value::Null);
        (response.status(), body)
    }

    #[test]
    fn test_parse_rejects_blank_message() {
        assert_eq!(parse_chat_request(b"").unwrap_err(), "Request body is required");
        assert_eq!(parse_chat_request(b"{nope").unwrap_err(), "Invalid request body");
        assert_eq!(parse_chat_request(br#"{"message":"   "}"#).unwrap_err(), "message is required");
    }

    #[test]
    fn test_parse_full_request() {
        let request = parse_chat_request(
            br#"{"message":"What is RAG?","step_id":2,"history":[{"role":"assistant","content":"Hi"}],"user":{"name":"Ada"}}"#,
        )
        .unwrap();

        assert_eq!(request.step_id, Some(2));
        assert_eq!(request.history.len(), 1);
        assert_eq!(request.user.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_answer() {
        let (status, body) = call(Behaviour::Echo, request("POST", r#"{"message":"What is RAG?"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "echo: What is RAG?");
        assert_eq!(body["course_id"], "bedrock-rag");
        assert_eq!(body["model_id"], "stub-model");
    }

    #[tokio::test]
    async fn test_bad_request() {
        let (status, body) = call(Behaviour::Echo, request("POST", r#"{"message":""}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "message is required");
    }

    #[tokio::test]
    async fn test_model_unreachable() {
        let (status, _) = call(Behaviour::Unreachable, request("POST", r#"{"message":"hi"}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_unexpected_failure() {
        let (status, body) = call(Behaviour::Broken, request("POST", r#"{"message":"hi"}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_preflight_and_methods() {
        let (preflight, _) = call(Behaviour::Echo, request("OPTIONS", "")).await;
        let (get, _) = call(Behaviour::Echo, request("GET", "")).await;

        assert_eq!(preflight, StatusCode::OK);
        assert_eq!(get, StatusCode::METHOD_NOT_ALLOWED);
    }
}
