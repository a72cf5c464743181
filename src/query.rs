//! The query engine: retrieval-augmented answer generation.
//!
//! Embeds the question, ranks the index's chunks by cosine similarity,
//! and hands the top-k chunks to a chat-completion model as grounding
//! context. Uses the same retry policy as the embedding client: retry on
//! 429/5xx and network errors, fail fast on other client errors.

use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::embedding::EmbeddingClient;
use crate::index::SemanticIndex;
use crate::models::RetrievedChunk;

const SYSTEM_PROMPT: &str = "You are an assistant answering questions about a software \
repository. Answer using only the provided repository excerpts. When the excerpts do not \
contain the answer, say so. Cite file paths when they support your answer.";

/// Answers questions against a built [`SemanticIndex`].
pub struct QueryEngine {
    index: SemanticIndex,
    embedder: EmbeddingClient,
    client: reqwest::Client,
    config: GenerationConfig,
    api_key: String,
}

impl QueryEngine {
    pub fn new(
        index: SemanticIndex,
        embedder: EmbeddingClient,
        config: GenerationConfig,
        api_key: String,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to construct HTTP client")?;

        Ok(Self {
            index,
            embedder,
            client,
            config,
            api_key,
        })
    }

    /// Answer a natural-language question about the indexed repository.
    pub async fn answer(&self, question: &str) -> Result<String> {
        if question.trim().is_empty() {
            bail!("question must not be empty");
        }

        let query_vec = self
            .embedder
            .embed_query(question)
            .await
            .context("Failed to embed the question")?;

        let retrieved = self.index.retrieve(&query_vec, self.config.top_k);
        tracing::debug!(retrieved = retrieved.len(), "retrieved context chunks");

        let body = build_request_body(&self.config.model, question, &retrieved);
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "chat API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("chat API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Answer generation failed after retries")))
    }
}

/// Assemble the chat-completion request from the question and context.
fn build_request_body(
    model: &str,
    question: &str,
    retrieved: &[RetrievedChunk],
) -> serde_json::Value {
    let mut context = String::new();
    for chunk in retrieved {
        context.push_str(&format!(
            "--- {} (section {}) ---\n{}\n\n",
            chunk.path, chunk.chunk_index, chunk.text
        ));
    }

    let user_message = format!(
        "Repository excerpts:\n\n{}Question: {}",
        context, question
    );

    serde_json::json!({
        "model": model,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": user_message},
        ],
    })
}

/// Pull the answer text out of a chat-completion response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid chat response: missing choices[0].message.content"))
}
