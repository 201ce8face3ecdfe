use anyhow::Context;
use aws_config::BehaviorVersion;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use academy_shared::{
    CognitoPostConfirmationEvent, DatabaseConfig, EmailConfig, PostgresRepository,
    RegistrationOutcome, RegistrationService, SESService, UserRepository, WelcomeMailer,
};

async fn function_handler<U: UserRepository, M: WelcomeMailer>(
    service: &RegistrationService<U, M>,
    event: LambdaEvent<CognitoPostConfirmationEvent>,
) -> Result<CognitoPostConfirmationEvent, Error> {
    let response_event = event.payload;

    info!("Received post confirmation event");
    info!("User: {:?}", response_event.user_name);
    info!("Trigger source: {}", response_event.trigger_source);

    // Registration must never be blocked by a failure here: the event is
    // always handed back to Cognito.
    match service.handle(&response_event).await {
        Ok(RegistrationOutcome::Skipped) => {
            info!("Not a sign-up confirmation, nothing to do");
        }
        Ok(RegistrationOutcome::Registered {
            user_id,
            welcome_message_id,
        }) => {
            info!(
                "Registered user {} - welcome email: {}",
                user_id,
                welcome_message_id.as_deref().unwrap_or("not sent")
            );
        }
        Err(e) => {
            error!("Failed to process confirmed user: {}", e);
        }
    }

    Ok(response_event)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    info!("Starting post-confirmation Lambda function");

    let database = DatabaseConfig::from_env().context("loading database configuration")?;
    let email = EmailConfig::from_env();
    info!("Lambda configuration - FROM_EMAIL: {}", email.from_email);

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let ses_client = aws_sdk_ses::Client::new(&config);

    let repository = PostgresRepository::new(database.lazy_pool());
    let service = RegistrationService::new(repository.clone(), SESService::new(ses_client, email));

    let service_ref = &service;
    let result = run(service_fn(move |event: LambdaEvent<CognitoPostConfirmationEvent>| async move {
        function_handler(service_ref, event).await
    }))
    .await;

    repository.close().await;
    result
}
