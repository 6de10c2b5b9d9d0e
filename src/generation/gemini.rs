//! Gemini API client
//!
//! Uses a long-lived reqwest::Client for connection pooling. The task id on
//! a request picks the system instruction.

use super::{AskRequest, TextGenerator};
use crate::auth::UserToken;
use crate::error::PrepCoachError;
use crate::transcript::Role;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/{}:generateContent", BASE_URL, model),
        })
    }

    /// Generate a response from Gemini
    pub async fn generate(&self, request: &AskRequest) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(PrepCoachError::TextGeneration(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        info!(
            task_id = request.task_id.as_deref().unwrap_or("general"),
            history = request.history.len(),
            "Calling Gemini API"
        );

        let response = self
            .http_request(request)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Gemini API request failed: {}", e);
                PrepCoachError::TextGeneration(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(PrepCoachError::TextGeneration(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!("Failed to parse Gemini response: {}", e);
            PrepCoachError::TextGeneration(format!("Gemini parse error: {}", e))
        })?;

        extract_text(&gemini_response)
    }

    // The key travels in a header so it never shows up in a URL
    fn http_request(&self, request: &AskRequest) -> RequestBuilder {
        self.client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&build_request(request))
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn ask(&self, token: &UserToken, request: AskRequest) -> crate::Result<String> {
        info!(owner = %token.owner_id(), "Text generation requested");
        self.generate(&request).await
    }
}

/// System instruction for a task id
fn system_prompt(task_id: Option<&str>) -> &'static str {
    match task_id {
        Some("loan-readiness") => {
            r#"You are PrepCoach, a commercial lending coach. Assess how ready the user's deal and
sponsor are to approach lenders. Ask one clarifying question at a time, then give a short,
prioritized list of gaps to close before applying."#
        }
        Some("lender-questions") => {
            r#"You are PrepCoach, a commercial lending coach. Help the user rehearse the questions
a commercial lender will ask about their deal. Pose realistic underwriter questions and give
feedback on the user's answers."#
        }
        Some("deal-structure") => {
            r#"You are PrepCoach, a commercial lending coach. Help the user think through loan
structure: leverage, amortization, recourse, reserves and which loan programs fit."#
        }
        Some("document-prep") => {
            r#"You are PrepCoach, a commercial lending coach. Help the user assemble a complete
lender package. Explain what each document is, why lenders need it, and how to prepare it."#
        }
        Some("program-fit") => {
            r#"You are a commercial loan analyst writing for a lender audience. Given structured
deal data, write two or three concise paragraphs assessing which loan programs fit
(conventional bank, agency, SBA 504/7(a), bridge, DSCR, construction) and why. Plain text only,
no markdown, no headings."#
        }
        Some("analyst-notes") => {
            r#"You are a commercial loan analyst writing for a lender audience. Given structured
deal data, write short analyst notes: strengths, risks, and mitigants. Use lines starting with
"- " for each point. Plain text only, no markdown headings."#
        }
        _ => {
            r#"You are PrepCoach, a commercial lending education assistant.

Guidelines:
- Provide accurate and educational commercial real estate lending information
- Be structured and concise
- Explain ratios like LTV, DSCR and debt yield when relevant
- Never promise approval or quote specific lender terms

Format: Plain text suitable for a chat window."#
        }
    }
}

fn build_request(request: &AskRequest) -> GeminiRequest {
    let mut contents: Vec<Content> = request
        .history
        .iter()
        .map(|turn| Content {
            role: Some(
                match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }
                .to_string(),
            ),
            parts: vec![Part {
                text: turn.content.clone(),
            }],
        })
        .collect();

    contents.push(Content {
        role: Some("user".to_string()),
        parts: vec![Part {
            text: request.prompt.clone(),
        }],
    });

    GeminiRequest {
        contents,
        generation_config: GenerationConfig {
            temperature: 0.3,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 1024,
        },
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: system_prompt(request.task_id.as_deref()).to_string(),
            }],
        },
    }
}

fn extract_text(response: &GeminiResponse) -> crate::Result<String> {
    let candidate = response.candidates.first().ok_or_else(|| {
        PrepCoachError::TextGeneration("No response from Gemini API".to_string())
    })?;

    let text: String = candidate
        .content
        .parts
        .iter()
        .map(|p| p.text.as_str())
        .collect();

    if text.trim().is_empty() {
        return Err(PrepCoachError::TextGeneration(
            "Empty response from Gemini".to_string(),
        ));
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
