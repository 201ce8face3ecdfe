/// Validate email format (basic validation)
pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

/// Identity provider of a Cognito user, derived from the federated username
/// prefix (`Google_1234...`). Native user pool accounts have no prefix.
pub fn identity_provider(user_name: &str) -> &'static str {
    let lower = user_name.to_ascii_lowercase();
    match lower.split_once('_') {
        Some(("google", _)) => "google",
        Some(("facebook", _)) => "facebook",
        Some(("signinwithapple", _)) => "apple",
        Some(("loginwithamazon", _)) => "amazon",
        _ => "cognito",
    }
}
