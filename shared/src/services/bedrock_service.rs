use async_trait::async_trait;
use aws_sdk_bedrockruntime::{error::ProvideErrorMetadata, primitives::Blob, Client as BedrockClient};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{AcademyError, AcademyResult, BedrockConfig, ChatMessage, ChatRequest, ChatRole, ChatUser};

pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
pub const RAG_COURSE_ID: &str = "bedrock-rag";

pub const EMPTY_REPLY: &str =
    "Sorry, I couldn't generate an answer. Please try rephrasing your question.";

/// Steps of the "RAG with Amazon Bedrock" course, indexed by step id.
pub const COURSE_STEPS: [&str; 7] = [
    "Introduction to RAG and core concepts",
    "Setting up a Knowledge Base in Bedrock",
    "Configuring S3 and uploading documents",
    "Connecting S3 to the Knowledge Base",
    "Choosing and configuring AI models",
    "Syncing and indexing data",
    "Testing and tuning the chatbot",
];

pub const SYSTEM_PROMPT: &str = "You are an assistant for the course \"RAG with Amazon Bedrock\". \
Help students understand and complete the course.

Core knowledge:
- Amazon Bedrock and its foundation models (Claude, Titan, ...)
- Retrieval Augmented Generation techniques and architectures
- Bedrock Knowledge Bases
- Amazon S3 for document storage
- Amazon OpenSearch for vector search
- Embeddings and semantic search
- API integration and chatbot development

Course steps:
Step #0: Introduction to RAG and core concepts
Step #1: Setting up a Knowledge Base in Bedrock
Step #2: Configuring S3 and uploading documents
Step #3: Connecting S3 to the Knowledge Base
Step #4: Choosing and configuring AI models
Step #5: Syncing and indexing data
Step #6: Testing and tuning the chatbot

Answer with clear technical explanations, practical examples and concrete steps. \
Recommend AWS best practices. If you are not sure about something, say so and point to the official documentation. \
Relate the answer to the student's current step.";

/// Why Bedrock refused to answer
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeFailure {
    AccessDenied,
    ModelNotFound,
    Service(String),
}

impl InvokeFailure {
    /// Text returned to the student instead of a model answer
    pub fn user_message(&self) -> String {
        match self {
            InvokeFailure::AccessDenied => {
                "Permission error. Check that you have access to Amazon Bedrock.".to_string()
            }
            InvokeFailure::ModelNotFound => {
                "Model not found. Check the model configuration.".to_string()
            }
            InvokeFailure::Service(code) => {
                format!("AWS error: {}. Please try again.", code)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvokeModelReply {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

/// Prompt sent for the current question
pub fn build_context_prompt(
    message: &str,
    user: &ChatUser,
    step_id: Option<u32>,
    context: Option<&str>,
) -> String {
    let mut sections = Vec::new();

    if let Some(name) = user.name.as_deref().filter(|n| !n.trim().is_empty()) {
        sections.push(format!("Student: {}", name.trim()));
    }

    if let Some(step) = step_id {
        match COURSE_STEPS.get(step as usize) {
            Some(title) => sections.push(format!("Current course step: Step #{}: {}", step, title)),
            None => sections.push(format!("Current course step: Step #{}", step)),
        }
    }

    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        sections.push(format!("Additional context:\n{}", context));
    }

    sections.push(format!("Question: {}", message.trim()));
    sections.join("\n\n")
}

/// Anthropic messages body: the last `history_window` turns plus the prompt
pub fn build_request_body(
    prompt: &str,
    history: &[ChatMessage],
    history_window: usize,
    max_tokens: u32,
) -> Value {
    let start = history.len().saturating_sub(history_window);
    let mut messages: Vec<Value> = history[start..]
        .iter()
        .map(|m| json!({ "role": m.role, "content": m.content }))
        .collect();
    messages.push(json!({ "role": ChatRole::User, "content": prompt }));

    json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": max_tokens,
        "system": SYSTEM_PROMPT,
        "messages": messages,
    })
}

/// First text block of the model reply, or [`EMPTY_REPLY`]
pub fn extract_reply(body: &[u8]) -> AcademyResult<String> {
    let reply: InvokeModelReply = serde_json::from_slice(body)?;

    let text = reply
        .content
        .into_iter()
        .filter(|block| block.kind.as_deref().map_or(true, |k| k == "text"))
        .find_map(|block| block.text);

    Ok(text.unwrap_or_else(|| EMPTY_REPLY.to_string()))
}

/// Answers student questions about a course.
#[async_trait]
pub trait CourseAssistant: Send + Sync {
    fn course_id(&self) -> &str;

    fn model_id(&self) -> &str;

    async fn process_message(&self, request: &ChatRequest) -> AcademyResult<String>;
}

pub struct BedrockService {
    client: BedrockClient,
    config: BedrockConfig,
}

impl BedrockService {
    pub fn new(client: BedrockClient, config: BedrockConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl CourseAssistant for BedrockService {
    fn course_id(&self) -> &str {
        RAG_COURSE_ID
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    /// Answer a student question.
    ///
    /// Access and model errors reported by Bedrock become an explanatory
    /// reply; transport failures are returned as [`AcademyError::BedrockError`].
    async fn process_message(&self, request: &ChatRequest) -> AcademyResult<String> {
        let prompt = build_context_prompt(
            &request.message,
            &request.user,
            request.step_id,
            request.context.as_deref(),
        );
        let body = build_request_body(
            &prompt,
            &request.history,
            self.config.history_window,
            self.config.max_tokens,
        );

        tracing::info!(
            "Invoking model {} - history: {}, step: {:?}",
            self.config.model_id,
            request.history.len(),
            request.step_id
        );

        let result = self
            .client
            .invoke_model()
            .model_id(&self.config.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(serde_json::to_vec(&body)?))
            .send()
            .await;

        match result {
            Ok(output) => extract_reply(output.body().as_ref()),
            Err(e) => match e.as_service_error() {
                Some(service_error) => {
                    let failure = if service_error.is_access_denied_exception() {
                        InvokeFailure::AccessDenied
                    } else if service_error.is_resource_not_found_exception() {
                        InvokeFailure::ModelNotFound
                    } else {
                        InvokeFailure::Service(service_error.code().unwrap_or("Unknown").to_string())
                    };
                    tracing::warn!("Bedrock rejected the request: {:?} ({})", failure, service_error);
                    Ok(failure.user_message())
                }
                None => {
                    tracing::error!("Error processing message with Bedrock: {:?}", e);
                    Err(AcademyError::BedrockError(e.to_string()))
                }
            },
        }
    }
}
