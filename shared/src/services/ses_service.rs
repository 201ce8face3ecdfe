use async_trait::async_trait;
use aws_sdk_ses::{
    types::{Body, Content, Destination, Message},
    Client as SesClient,
};

use crate::{AcademyError, AcademyResult, EmailConfig, NewUserProfile};

/// Sends the greeting for a freshly confirmed account.
#[async_trait]
pub trait WelcomeMailer: Send + Sync {
    /// Returns the provider message id
    async fn send_welcome(&self, profile: &NewUserProfile) -> AcademyResult<String>;
}

/// Rendered welcome email
#[derive(Debug, Clone, PartialEq)]
pub struct WelcomeEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl WelcomeEmail {
    pub fn render(brand_name: &str, base_url: &str, name: Option<&str>) -> Self {
        let greeting_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("student");

        let subject = format!("Welcome to {}!", brand_name);

        let html = format!(
            r#"
            <html>
            <body>
                <div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
                    <h1 style="color: #6366f1;">Welcome to {brand}!</h1>
                    <p>Hi {name},</p>
                    <p>Thanks for joining {brand}. We're glad to have you in our learning community.</p>
                    <h2 style="color: #4f46e5;">What you can do now</h2>
                    <ul>
                        <li>Explore the <strong>RAG with Amazon Bedrock</strong> course</li>
                        <li>Learn to build <strong>VPCs on AWS</strong></li>
                        <li>Master <strong>cloud security</strong></li>
                        <li>Work on <strong>hands-on</strong> projects</li>
                    </ul>
                    <div style="background-color: #f0f9ff; padding: 20px; border-radius: 10px; margin: 20px 0;">
                        <h3 style="color: #0369a1;">Your next step</h3>
                        <p>Complete your first course and start your Cloud &amp; DevOps journey.</p>
                        <a href="{url}"
                           style="background-color: #6366f1; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; display: inline-block;">
                            Get started
                        </a>
                    </div>
                    <p>See you in class!</p>
                    <p style="color: #6b7280;">The {brand} team</p>
                </div>
            </body>
            </html>
            "#,
            brand = brand_name,
            name = html_escape(greeting_name),
            url = base_url,
        );

        let text = format!(
            "Welcome to {brand}!\n\nHi {name},\n\nThanks for joining {brand}. We're glad to have you in our learning community.\n\nWhat you can do now:\n- Explore the RAG with Amazon Bedrock course\n- Learn to build VPCs on AWS\n- Master cloud security\n- Work on hands-on projects\n\nYour next step: complete your first course and start your Cloud & DevOps journey.\n\nVisit us at: {url}\n\nSee you in class!\n\nThe {brand} team",
            brand = brand_name,
            name = greeting_name,
            url = base_url,
        );

        Self { subject, html, text }
    }
}

fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn utf8_content(data: String) -> AcademyResult<Content> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| AcademyError::SESError(e.to_string()))
}

pub struct SESService {
    client: SesClient,
    config: EmailConfig,
}

impl SESService {
    pub fn new(client: SesClient, config: EmailConfig) -> Self {
        Self { client, config }
    }

    /// Send a message with both HTML and plain text bodies
    pub async fn send_email(&self, to_email: &str, email: WelcomeEmail) -> AcademyResult<String> {
        let destination = Destination::builder().to_addresses(to_email).build();

        let body = Body::builder()
            .html(utf8_content(email.html)?)
            .text(utf8_content(email.text)?)
            .build();

        let message = Message::builder()
            .subject(utf8_content(email.subject)?)
            .body(body)
            .build();

        let output = self
            .client
            .send_email()
            .source(&self.config.from_email)
            .destination(destination)
            .message(message)
            .send()
            .await
            .map_err(|e| AcademyError::EmailDeliveryFailed(e.to_string()))?;

        Ok(output.message_id().to_string())
    }
}

#[async_trait]
impl WelcomeMailer for SESService {
    async fn send_welcome(&self, profile: &NewUserProfile) -> AcademyResult<String> {
        let email = WelcomeEmail::render(
            &self.config.brand_name,
            &self.config.base_url,
            profile.name.as_deref(),
        );

        let message_id = self.send_email(&profile.email, email).await?;
        tracing::info!("Welcome email sent to {} - Message ID: {}", profile.email, message_id);
        Ok(message_id)
    }
}
