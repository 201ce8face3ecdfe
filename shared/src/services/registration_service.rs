use uuid::Uuid;

use crate::{
    identity_provider, is_valid_email, AcademyError, AcademyResult, CognitoPostConfirmationEvent,
    NewUserProfile, UserRepository, WelcomeMailer,
};

/// What happened while handling a confirmed sign-up
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    /// Trigger source was not a sign-up confirmation
    Skipped,
    /// Profile stored; `welcome_message_id` is `None` when the email failed
    Registered {
        user_id: Uuid,
        welcome_message_id: Option<String>,
    },
}

/// Extract the profile fields from a post-confirmation event
pub fn extract_profile(event: &CognitoPostConfirmationEvent) -> AcademyResult<NewUserProfile> {
    let cognito_user_id = event
        .user_name
        .clone()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AcademyError::ValidationError("userName missing from event".to_string()))?;

    let attributes = &event.request.user_attributes;

    let email = attributes
        .get("email")
        .ok_or_else(|| AcademyError::ValidationError("Email not found in user attributes".to_string()))?;

    if !is_valid_email(email) {
        return Err(AcademyError::ValidationError(format!("Invalid email format: {}", email)));
    }

    let non_empty = |key: &str| attributes.get(key).filter(|v| !v.is_empty()).cloned();

    Ok(NewUserProfile {
        provider: identity_provider(&cognito_user_id).to_string(),
        cognito_user_id,
        email: email.clone(),
        name: non_empty("name"),
        picture_url: non_empty("picture"),
    })
}

/// Creates the user profile and sends the welcome email for a confirmed sign-up.
pub struct RegistrationService<U, M> {
    users: U,
    mailer: M,
}

impl<U: UserRepository, M: WelcomeMailer> RegistrationService<U, M> {
    pub fn new(users: U, mailer: M) -> Self {
        Self { users, mailer }
    }

    /// Store the profile, then greet the user. Email failures are logged and
    /// do not fail the registration.
    pub async fn handle(&self, event: &CognitoPostConfirmationEvent) -> AcademyResult<RegistrationOutcome> {
        if !event.is_confirm_sign_up() {
            tracing::info!("Skipping trigger source: {}", event.trigger_source);
            return Ok(RegistrationOutcome::Skipped);
        }

        let profile = extract_profile(event)?;
        tracing::info!(
            "Registering user - email: {}, provider: {}, Cognito ID: {}",
            profile.email,
            profile.provider,
            profile.cognito_user_id
        );

        let user_id = self.users.upsert_user(&profile).await?;
        tracing::info!("User profile stored with ID: {}", user_id);

        let welcome_message_id = match self.mailer.send_welcome(&profile).await {
            Ok(message_id) => Some(message_id),
            Err(e) => {
                tracing::error!("Failed to send welcome email to {}: {}", profile.email, e);
                None
            }
        };

        Ok(RegistrationOutcome::Registered {
            user_id,
            welcome_message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> CognitoPostConfirmationEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extract_profile() {
        let profile = extract_profile(&event(json!({
            "userName": "Google_10293",
            "triggerSource": "PostConfirmation_ConfirmSignUp",
            "request": { "userAttributes": {
                "email": "ada@example.com",
                "name": "Ada Lovelace",
                "picture": "https://example.com/ada.png"
            }}
        })))
        .unwrap();

        assert_eq!(profile.cognito_user_id, "Google_10293");
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.picture_url.as_deref(), Some("https://example.com/ada.png"));
        assert_eq!(profile.provider, "google");
    }

    #[test]
    fn test_extract_profile_optional_attributes() {
        let profile = extract_profile(&event(json!({
            "userName": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "request": { "userAttributes": { "email": "grace@example.com", "name": "" } }
        })))
        .unwrap();

        assert_eq!(profile.name, None);
        assert_eq!(profile.picture_url, None);
        assert_eq!(profile.provider, "cognito");
    }

    #[test]
    fn test_extract_profile_requires_email() {
        let missing = extract_profile(&event(json!({
            "userName": "Google_1",
            "request": { "userAttributes": { "name": "Nobody" } }
        })));
        let malformed = extract_profile(&event(json!({
            "userName": "Google_1",
            "request": { "userAttributes": { "email": "not-an-email" } }
        })));

        assert!(matches!(missing, Err(AcademyError::ValidationError(_))));
        assert!(matches!(malformed, Err(AcademyError::ValidationError(_))));
    }

    #[test]
    fn test_extract_profile_requires_user_name() {
        let result = extract_profile(&event(json!({
            "request": { "userAttributes": { "email": "ada@example.com" } }
        })));
        assert!(matches!(result, Err(AcademyError::ValidationError(_))));
    }
}
