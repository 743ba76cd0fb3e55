// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Content and spam classifier oracle.
//!
//! The admission pipeline treats the classifier as a black box returning a
//! content-safety verdict and a spam likelihood. Failures are reported as
//! [`ClassifierError`] and resolved to safe defaults by the caller.

use crate::config::ClassifierConfig;
use crate::window::ActivityEntry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const CONTENT_PROMPT: &str = "You review domain registrations for inappropriate names: \
swear words, insults, racism, classism, adult content and similar. \
Reply only with a JSON object {\"response\":\"yes\"} if the domain is inappropriate \
or {\"response\":\"no\"} if it is not. Do not explain.";

const SPAM_PROMPT: &str = "You review domain registrations for spam. You receive the most \
recently registered domains with the IP or URL each points at, followed by the domain \
being registered now. Judge repeated strings, random characters, nonsense names and \
repeated targets. Reply only with a JSON object {\"chance\":<float between 0.00 and 1.00>} \
giving the likelihood that the new domain is spam. Do not explain.";

/// Classifier failure.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Classifier timed out after {0:?}")]
    Timeout(Duration),

    #[error("Classifier returned status {0}")]
    Status(u16),

    #[error("Malformed classifier reply: {0}")]
    Malformed(String),
}

/// External classifier oracle.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Whether `domain` is inappropriate content.
    async fn is_unsafe_content(&self, domain: &str) -> Result<bool, ClassifierError>;

    /// Likelihood in [0.0, 1.0] that `domain` is spam, given recent admissions.
    async fn spam_score(
        &self,
        recent: &[ActivityEntry],
        domain: &str,
    ) -> Result<f64, ClassifierError>;
}

/// Classifier used when no oracle is configured: every domain is safe and
/// scores zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveClassifier;

#[async_trait]
impl Classifier for PermissiveClassifier {
    async fn is_unsafe_content(&self, _domain: &str) -> Result<bool, ClassifierError> {
        Ok(false)
    }

    async fn spam_score(
        &self,
        _recent: &[ActivityEntry],
        _domain: &str,
    ) -> Result<f64, ClassifierError> {
        Ok(0.0)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    role: String,
    #[serde(default)]
    content: String,
}

/// Classifier backed by an OpenAI-compatible chat completions endpoint.
pub struct ChatClassifier {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl ChatClassifier {
    pub fn new(config: &ClassifierConfig, api_key: String, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            client,
        })
    }

    /// Send a system/user message pair and return the assistant's reply.
    async fn prompt(&self, system: &str, user: &str) -> Result<String, ClassifierError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClassifierError::Status(response.status().as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        match body.choices.into_iter().next() {
            Some(choice) if choice.message.role == "assistant" => Ok(choice.message.content),
            _ => Ok(String::new()),
        }
    }
}

#[async_trait]
impl Classifier for ChatClassifier {
    async fn is_unsafe_content(&self, domain: &str) -> Result<bool, ClassifierError> {
        let reply = self.prompt(CONTENT_PROMPT, domain).await?;
        debug!(%domain, %reply, "Content classifier reply");
        Ok(reply.to_lowercase().contains("yes"))
    }

    async fn spam_score(
        &self,
        recent: &[ActivityEntry],
        domain: &str,
    ) -> Result<f64, ClassifierError> {
        let reply = self.prompt(SPAM_PROMPT, &spam_context(recent, domain)).await?;
        debug!(%domain, %reply, "Spam classifier reply");
        parse_chance(&reply)
    }
}

fn spam_context(recent: &[ActivityEntry], domain: &str) -> String {
    let listed = recent
        .iter()
        .map(|e| format!("{} points to {}", e.name, e.target))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Last {} domains: {listed}. New domain being registered: {domain}", recent.len())
}

/// Extract the `chance` value from a reply such as `{"chance": 0.15}`.
///
/// Accepts the number quoted as a string, and ignores text around the object.
fn parse_chance(reply: &str) -> Result<f64, ClassifierError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => return Err(ClassifierError::Malformed(reply.to_string())),
    };

    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| ClassifierError::Malformed(e.to_string()))?;

    let chance = match &value["chance"] {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    chance.ok_or_else(|| ClassifierError::Malformed(reply.to_string()))
}

/// Clamp an oracle score into [0.0, 1.0]; non-finite scores count as 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
