//! Unified request and outcome types for safegen

use serde::{Deserialize, Serialize};

// ===== Request Types =====

/// Recognized completion options
/// All optional; unset options are left to the provider defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams
{   /// Model name; normalized if it matches a legacy pattern
    pub model: Option<String>
  , /// Legacy parameter key; its presence forces the default model
    pub engine: Option<String>
  , /// Max tokens to generate
    pub max_output_tokens: Option<usize>
  , /// Temperature for sampling
    pub temperature: Option<f32>
  , /// Nucleus sampling parameter; 1 is the provider default
    pub top_p: Option<f32>
  , /// Top-k sampling parameter
    pub top_k: Option<u32>
}

/// One completion request: a prompt plus its options
/// Never mutated after construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest
{   /// The prompt text
    pub prompt: String
  , /// Completion options
    pub params: CompletionParams
}

impl CompletionRequest
{   /// Request with default options
    pub fn new(prompt: String) -> Self
    {   CompletionRequest
        {   prompt
          , params: CompletionParams::default()
        }
    }

    pub fn with_params(
      prompt: String
    , params: CompletionParams
    ) -> Self
    {   CompletionRequest
        {   prompt
          , params
        }
    }
}

// ===== Transport Outcome =====

/// Legacy sentinel strings kept at the text/log boundary
pub const SENTINEL_RATE_LIMITED: &str = "TOKEN LIMIT EXCEEDED";
pub const SENTINEL_API_ERROR: &str = "API ERROR";
pub const SENTINEL_EMPTY: &str = "ERROR: Empty response";
pub const SENTINEL_FAILED: &str = "ERROR";
pub const SENTINEL_CHAT_FAILED: &str = "ChatGPT ERROR";

/// Result of one transport call
/// Every failure path is a variant, so the retry engine matches
/// exhaustively instead of comparing strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome
{   /// Assistant message text from the first completion choice
    Text(String)
  , /// Provider reported a rate limit
    RateLimited
  , /// Provider reported any other API error
    ApiError
  , /// Empty or absent choices list
    EmptyResponse
  , /// Network, serialization, or other unexpected failure
    Failed
}

impl TransportOutcome
{   pub fn is_failure(&self) -> bool
    {   !matches!(self, TransportOutcome::Text(_))
    }

    /// Render the outcome as boundary text
    /// Failure variants produce their legacy sentinel strings
    pub fn sentinel_text(&self) -> &str
    {   match self
        {   TransportOutcome::Text(text) => text
          , TransportOutcome::RateLimited => SENTINEL_RATE_LIMITED
          , TransportOutcome::ApiError => SENTINEL_API_ERROR
          , TransportOutcome::EmptyResponse => SENTINEL_EMPTY
          , TransportOutcome::Failed => SENTINEL_FAILED
        }
    }

    /// Classify boundary text back into an outcome
    /// Empty text counts as an empty response; otherwise only exact
    /// sentinel matches classify as failures
    pub fn from_text_exact(raw: &str) -> TransportOutcome
    {   let trimmed = raw.trim();
        if trimmed.is_empty()
        {   return TransportOutcome::EmptyResponse;
        }

        match trimmed
        {   SENTINEL_RATE_LIMITED => TransportOutcome::RateLimited
          , SENTINEL_API_ERROR => TransportOutcome::ApiError
          , SENTINEL_EMPTY => TransportOutcome::EmptyResponse
          , SENTINEL_FAILED => TransportOutcome::Failed
          , SENTINEL_CHAT_FAILED => TransportOutcome::Failed
          , _ => TransportOutcome::Text(raw.to_string())
        }
    }

    /// Exact classification plus the legacy containment rule: text
    /// containing "ERROR" or "LIMIT EXCEEDED" classifies as failed.
    /// Part of the legacy string protocol; it will swallow a
    /// legitimate response that happens to contain those words, so it
    /// applies only where the raw text is the final payload
    pub fn from_text(raw: &str) -> TransportOutcome
    {   match TransportOutcome::from_text_exact(raw)
        {   TransportOutcome::Text(text) => {
              if text.contains("ERROR")
                || text.contains("LIMIT EXCEEDED")
              {   TransportOutcome::Failed
              } else
              {   TransportOutcome::Text(text)
              }
            }
          , outcome => outcome
        }
    }
}
