//! Semantic service over an OpenAI style Responses endpoint, using blocking HTTP.
//!
//! Every request is bounded by the configured timeout and repeated on transport failures
//! and 5xx answers, up to the configured number of retries. Any other failure is returned
//! at once.

use reqwest::blocking::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::SemanticServiceConfig;
use crate::instruction::ParsedInstruction;
use crate::semantic::{
    CandidateMatcher, EXTRACTION_PROMPT, InstructionExtractor, MATCHING_PROMPT, SemanticError,
    candidate_query, candidate_schema, instruction_schema, parse_candidate_payload,
    parse_instruction_payload,
};

pub struct OpenAiService {
    config: SemanticServiceConfig,
    client: Client,
}

impl OpenAiService {
    pub fn new(config: SemanticServiceConfig) -> Result<Self, SemanticError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SemanticError::Transport(format!("failed to build http client: {}", e)))?;
        Ok(OpenAiService { config, client })
    }

    /// Ask for a JSON answer following the schema, return the answer text.
    fn respond(&self, system: &str, user: &str, name: &str, schema: Value) -> Result<String, SemanticError> {
        let body = json!({
            "model": self.config.model,
            "input": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "text": {
                "format": { "type": "json_schema", "name": name, "strict": true, "schema": schema }
            }
        });
        let response = self.post_with_retry("responses", &body)?;
        output_text(&response)
            .ok_or_else(|| SemanticError::InvalidResponse("response has no output text".to_string()))
    }

    fn post_with_retry(&self, endpoint: &str, body: &Value) -> Result<Value, SemanticError> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut attempt = 0;
        loop {
            match self.post_once(&url, body) {
                Err(e) if attempt < self.config.retries && is_transient(&e) => {
                    attempt += 1;
                    warn!("Request to {} failed ({}), retry {} of {}", url, e, attempt, self.config.retries);
                }
                result => return result,
            }
        }
    }

    fn post_once(&self, url: &str, body: &Value) -> Result<Value, SemanticError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .map_err(|e| SemanticError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SemanticError::Status { status: status.as_u16(), body });
        }
        response
            .json()
            .map_err(|e| SemanticError::InvalidResponse(format!("not JSON: {}", e)))
    }
}

fn is_transient(error: &SemanticError) -> bool {
    match error {
        SemanticError::Transport(_) => true,
        SemanticError::Status { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Concatenated text of all `output_text` parts of a Responses API answer.
fn output_text(response: &Value) -> Option<String> {
    if let Some(text) = response.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    let text: String = response
        .get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() { None } else { Some(text) }
}

impl InstructionExtractor for OpenAiService {
    fn is_available(&self) -> bool {
        true
    }

    fn extract(&self, text: &str) -> Result<ParsedInstruction, SemanticError> {
        let answer = self.respond(EXTRACTION_PROMPT, text, "ik_intent", instruction_schema())?;
        debug!("Extraction answer: {}", answer);
        parse_instruction_payload(&answer)
    }
}

impl CandidateMatcher for OpenAiService {
    fn is_available(&self) -> bool {
        true
    }

    fn pick(&self, query: &str, candidates: &[String]) -> Result<Option<String>, SemanticError> {
        let answer = self.respond(
            MATCHING_PROMPT,
            &candidate_query(query, candidates),
            "tool_match",
            candidate_schema(candidates),
        )?;
        debug!("Matching answer: {}", answer);
        parse_candidate_payload(&answer)
    }
}
