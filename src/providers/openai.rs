use serde::{Deserialize, Serialize};
use log::{debug, trace, error, warn};
use std::time::Duration;

// ===== Wire Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , pub content: String
}

/// Chat completion request body
/// Unset options are omitted from the wire entirely
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse
{   pub choices: Vec<Choice>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ChatMessage
  , pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRequest
{   pub model: String
  , pub input: Vec<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingResponse
{   pub data: Vec<EmbeddingData>
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingData
{   pub embedding: Vec<f32>
}

// ===== Request Building =====

/// Build the wire request from caller params
/// Legacy model names ("davinci" family) and the legacy engine key
/// both normalize to the configured default model; the engine key
/// never reaches the wire. top_p equal to 1 is the provider default
/// and is omitted
pub fn build_chat_request(
  prompt: &str
, params: &crate::request::CompletionParams
, default_model: &str
) -> ChatCompletionRequest
{   let mut model = params.model.clone()
      .unwrap_or_else(|| default_model.to_string());

    if model.contains("davinci") || params.engine.is_some()
    {   debug!(
          "Normalizing legacy model name to: {}",
          default_model
        );
        model = default_model.to_string();
    }

    ChatCompletionRequest
    {   model
      , messages: vec![
          ChatMessage
          {   role: "user".to_string()
            , content: prompt.to_string()
          }
        ]
      , max_tokens: params.max_output_tokens
      , temperature: params.temperature
      , top_p: params.top_p.filter(|p| *p != 1.0)
      , top_k: params.top_k
    }
}

/// Prepare text for the embedding endpoint
/// Newlines are flattened and blank input is substituted
pub fn normalize_embedding_input(text: &str) -> String
{   let flattened = text.replace('\n', " ");
    if flattened.trim().is_empty()
    {   "this is blank".to_string()
    } else
    {   flattened
    }
}

// ===== OpenAI Client =====

/// Client for an OpenAI-style completion endpoint
/// Holds the credential and model configuration for its lifetime
#[derive(Debug, Clone)]
pub struct OpenAiClient
{   api_key: Option<String>
  , default_model: String
  , embedding_model: String
  , api_base: String
  , pace_delay: Option<Duration>
  , http_client: reqwest::Client
}

impl OpenAiClient
{   pub fn new(config: &crate::config::ApiConfig) -> Self
    {   debug!("Creating OpenAiClient");
        let pace_delay = if config.pace_delay_ms == 0
        {   None
        } else
        {   Some(Duration::from_millis(config.pace_delay_ms))
        };

        OpenAiClient
        {   api_key: config.api_key.clone()
          , default_model: config.default_model.clone()
          , embedding_model: config.embedding_model.clone()
          , api_base: config.api_base.clone()
          , pace_delay
          , http_client: reqwest::Client::new()
        }
    }

    /// Disable the pre-call pacing delay
    /// Clients clone cheaply, so a one-off unpaced call is
    /// `client.clone().without_pacing()`
    pub fn without_pacing(mut self) -> Self
    {   self.pace_delay = None;
        self
    }

    pub fn default_model(&self) -> &str
    {   &self.default_model
    }

    fn api_key(&self)
      -> Result<String, crate::error::Error>
    {   match &self.api_key
        {   Some(key) => Ok(key.clone())
          , None => {
              error!("No API key configured");
              Err(crate::error::Error::MissingApiKey(
                "completion endpoint".to_string()
              ))
            }
        }
    }

    /// Fixed short delay to smooth bursty call patterns
    async fn pace(&self)
    {   if let Some(delay) = self.pace_delay
        {   trace!("Pacing delay: {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// One call to the chat completion endpoint
    /// Errors propagate; sentinel mapping happens in the
    /// CompletionService impl
    async fn request_chat(
      &self
    , request: &ChatCompletionRequest
    ) -> Result<String, crate::error::Error>
    {   let api_key = self.api_key()?;

        trace!("Chat request: {:?}", request);

        let response = self.http_client
          .post(format!("{}/chat/completions", self.api_base))
          .header("Authorization", format!("Bearer {}", api_key))
          .header("Content-Type", "application/json")
          .json(request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            crate::error::Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("Chat response status: {}", status);

        if status.as_u16() == 429
        {   error!("Rate limit reported by provider");
            return Err(crate::error::Error::RateLimitExceeded);
        }

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Provider API error: {}", error_text);
            return Err(crate::error::Error::ApiError(
              error_text
            ));
        }

        let chat_response: ChatCompletionResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            crate::error::Error::ParseError(e.to_string())
          })?;

        chat_response.choices.first()
          .map(|c| c.message.content.clone())
          .ok_or_else(|| {
            error!("No choices in response");
            crate::error::Error::NoChoicesInResponse
          })
    }

    /// One unguarded completion call with default options
    /// Unlike the CompletionService path, failures propagate to the
    /// caller instead of collapsing into an outcome variant
    pub async fn single_request(
      &self
    , prompt: &str
    ) -> Result<String, crate::error::Error>
    {   debug!("single_request");
        self.pace().await;

        let chat_request = build_chat_request(
          prompt,
          &crate::request::CompletionParams::default(),
          &self.default_model
        );

        self.request_chat(&chat_request).await
    }

    /// Embed one text with the configured embedding model
    pub async fn embed(
      &self
    , text: &str
    ) -> Result<Vec<f32>, crate::error::Error>
    {   debug!("embed");
        let api_key = self.api_key()?;

        let request = EmbeddingRequest
        {   model: self.embedding_model.clone()
          , input: vec![normalize_embedding_input(text)]
        };

        let response = self.http_client
          .post(format!("{}/embeddings", self.api_base))
          .header("Authorization", format!("Bearer {}", api_key))
          .header("Content-Type", "application/json")
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            crate::error::Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("Embedding response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Embedding API error: {}", error_text);
            return Err(crate::error::Error::ApiError(
              error_text
            ));
        }

        let parsed: EmbeddingResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            crate::error::Error::ParseError(e.to_string())
          })?;

        parsed.data.into_iter().next()
          .map(|d| d.embedding)
          .ok_or_else(|| {
            error!("No embedding in response");
            crate::error::Error::ParseError(
              "empty embedding data".to_string()
            )
          })
    }
}

#[async_trait::async_trait]
impl crate::service::CompletionService for OpenAiClient
{   /// One paced call, every failure folded into the outcome sum
    /// Never returns an error to the caller
    async fn complete(
      &self
    , request: &crate::request::CompletionRequest
    ) -> crate::request::TransportOutcome
    {   self.pace().await;

        let chat_request = build_chat_request(
          &request.prompt,
          &request.params,
          &self.default_model
        );

        match self.request_chat(&chat_request).await
        {   Ok(text) => {
              if text.trim().is_empty()
              {   warn!("Empty completion text");
                  crate::request::TransportOutcome::EmptyResponse
              } else
              {   crate::request::TransportOutcome::Text(text)
              }
            }
          , Err(crate::error::Error::RateLimitExceeded) => {
              crate::request::TransportOutcome::RateLimited
            }
          , Err(crate::error::Error::ApiError(_)) => {
              crate::request::TransportOutcome::ApiError
            }
          , Err(crate::error::Error::NoChoicesInResponse) => {
              crate::request::TransportOutcome::EmptyResponse
            }
          , Err(e) => {
              error!("Transport failure: {}", e);
              crate::request::TransportOutcome::Failed
            }
        }
    }
}
