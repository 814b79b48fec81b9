// src/notify/mailer.rs

use maud::{html, Markup, DOCTYPE};
use reqwest::blocking::Client;
use serde::Serialize;
use std::error::Error;
use std::fmt;
use tracing::info;

use crate::domain::diff::DiffEntry;

#[derive(Debug)]
pub enum MailerError {
    RequestFailed(String),
    ApiError(String),
}

impl fmt::Display for MailerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailerError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            MailerError::ApiError(msg) => write!(f, "API error: {}", msg),
        }
    }
}

impl Error for MailerError {}

/// The outbound notification contract. The dispatcher only ever sees this;
/// which provider (or mock) sits behind it is wiring.
pub trait DealMailer: Send + Sync {
    fn send_deal_alert(
        &self,
        recipient_email: &str,
        user_name: &str,
        deals: &[&DiffEntry],
    ) -> Result<(), MailerError>;
}

/// Sends deal alerts through the Resend transactional email API.
pub struct ResendMailer {
    api_key: String,
    sender_email: String,
    sender_name: String,
    client: Client,
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: String,
    to: Vec<&'a str>,
    subject: String,
    html: String,
}

impl ResendMailer {
    pub fn new(api_key: String, sender_email: String, sender_name: String) -> Self {
        Self {
            api_key,
            sender_email,
            sender_name,
            client: Client::new(),
        }
    }
}

impl DealMailer for ResendMailer {
    fn send_deal_alert(
        &self,
        recipient_email: &str,
        user_name: &str,
        deals: &[&DiffEntry],
    ) -> Result<(), MailerError> {
        let payload = ResendPayload {
            from: format!("{} <{}>", self.sender_name, self.sender_email),
            to: vec![recipient_email],
            subject: format!("{} New Deals Available!", deals.len()),
            html: deal_alert_body(user_name, deals).into_string(),
        };

        let resp = self
            .client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .map_err(|e| MailerError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let error_body = resp.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MailerError::ApiError(format!(
                "Failed to send email: {}",
                error_body
            )));
        }

        Ok(())
    }
}

/// Stand-in used when no provider key is configured: logs what would have
/// been sent and reports success.
pub struct MockMailer;

impl DealMailer for MockMailer {
    fn send_deal_alert(
        &self,
        recipient_email: &str,
        user_name: &str,
        deals: &[&DiffEntry],
    ) -> Result<(), MailerError> {
        let names: Vec<&str> = deals.iter().take(5).map(|d| d.deal.name.as_str()).collect();
        info!(
            recipient = recipient_email,
            user = user_name,
            deals = deals.len(),
            "MOCK EMAIL - would send deal alert: {names:?}"
        );
        Ok(())
    }
}

/// Renders the deal-alert email body.
fn deal_alert_body(user_name: &str, deals: &[&DiffEntry]) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head { meta charset="UTF-8"; }
            body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;" {
                h1 style="color: #10b981; margin-bottom: 20px;" { "New Deals Available!" }

                p { "Hi " (user_name) "," }

                p { "We found " (deals.len()) " new deals that match your preferences:" }

                @for entry in deals {
                    div style="border: 1px solid #e5e7eb; border-radius: 8px; padding: 16px; margin-bottom: 16px;" {
                        h3 style="margin: 0 0 8px 0;" { (entry.deal.name) }
                        p style="margin: 0; color: #6b7280;" {
                            strong { "$" (format!("{:.2}", entry.deal.discount_price)) }
                            @if entry.deal.original_price > 0.0 {
                                " (was $" (format!("{:.2}", entry.deal.original_price)) ")"
                            }
                        }
                        p style="margin: 4px 0 0 0; color: #6b7280; font-size: 14px;" {
                            (entry.store.name) " - " (entry.store.city)
                        }
                    }
                }

                p style="color: #6b7280; font-size: 14px; margin-top: 32px;" {
                    "You're receiving this email because you've enabled deal notifications in your Dealwatch preferences."
                }
            }
        }
    }
}
