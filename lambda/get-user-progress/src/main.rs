use anyhow::Context;
use lambda_http::http::Method;
use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use academy_shared::{
    AcademyError, CorsConfig, DatabaseConfig, PostgresRepository, ProgressRepository,
    ProgressService, Responder,
};

async fn function_handler<R: ProgressRepository>(
    service: &ProgressService<R>,
    responder: &Responder,
    event: Request,
) -> Result<Response<Body>, Error> {
    let method = event.method().clone();
    let path = event.uri().path().to_string();

    info!("Received {} {}", method, path);

    if method == Method::OPTIONS {
        return responder.preflight();
    }
    if method != Method::GET {
        return responder.method_not_allowed();
    }
    if path.ends_with("/health") {
        return health_check(service, responder).await;
    }

    let params = event.query_string_parameters();
    let raw_user_id = match params.first("user_id").filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => return responder.bad_request("user_id parameter is required"),
    };

    let user_id = match Uuid::parse_str(raw_user_id) {
        Ok(id) => id,
        Err(e) => {
            warn!("Rejected user_id {}: {}", raw_user_id, e);
            return responder.bad_request("user_id must be a valid UUID");
        }
    };

    match service.get_user_progress(user_id).await {
        Ok(progress) => responder.ok(&progress),
        Err(AcademyError::UserNotFound(_)) => {
            warn!("User not found: {}", user_id);
            responder.not_found("User not found")
        }
        Err(e @ AcademyError::DatabaseError(_)) => {
            error!("Database error: {}", e);
            responder.server_error("Database connection failed")
        }
        Err(e) => {
            error!("Failed to get user progress: {}", e);
            responder.server_error("Internal server error")
        }
    }
}

async fn health_check<R: ProgressRepository>(
    service: &ProgressService<R>,
    responder: &Responder,
) -> Result<Response<Body>, Error> {
    if service.is_healthy().await {
        responder.ok(&json!({ "status": "healthy", "database": "connected" }))
    } else {
        responder.service_unavailable(&json!({ "status": "unhealthy", "database": "disconnected" }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // CloudWatch adds the ingestion time
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    info!("Starting get-user-progress Lambda function");

    let database = DatabaseConfig::from_env().context("loading database configuration")?;
    let repository = PostgresRepository::new(database.lazy_pool());
    let service = ProgressService::new(repository);
    let responder = Responder::new(CorsConfig::from_env(), "GET,OPTIONS");

    let service_ref = &service;
    let responder_ref = &responder;
    let result = run(service_fn(move |event: Request| async move {
        function_handler(service_ref, responder_ref, event).await
    }))
    .await;

    service.repository().close().await;
    result
}
