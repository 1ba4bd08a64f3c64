//! Configuration for the completion endpoint, read once at process start

use serde::{Deserialize, Serialize};
use log::debug;

/// Default chat model, used when the environment does not override it
/// and when legacy model names are normalized away
pub const DEFAULT_MODEL: &str = "gpt-5-nano";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str
  = "text-embedding-ada-002";

/// Default API base URL
pub const DEFAULT_API_BASE: &str
  = "https://api.openai.com/v1";

/// Default pre-call pacing delay in milliseconds
pub const DEFAULT_PACE_DELAY_MS: u64 = 100;

/// Endpoint configuration
/// Built once at startup and passed by reference into the client;
/// there is no ambient global
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig
{   /// API credential, sourced from the environment
    pub api_key: Option<String>
  , /// Chat model used when a request names none
    pub default_model: String
  , /// Model used for embedding requests
    pub embedding_model: String
  , /// API base URL
    pub api_base: String
  , /// Delay before each completion call; 0 disables pacing
    pub pace_delay_ms: u64
}

impl ApiConfig
{   /// Read configuration from the process environment
    pub fn from_env() -> Self
    {   debug!("Reading ApiConfig from environment");
        ApiConfig
        {   api_key: std::env::var("OPENAI_API_KEY").ok()
          , default_model: std::env::var("OPENAI_MODEL")
              .unwrap_or_else(|_| DEFAULT_MODEL.to_string())
          , embedding_model: std::env::var("OPENAI_EMBEDDING_MODEL")
              .unwrap_or_else(|_|
                DEFAULT_EMBEDDING_MODEL.to_string()
              )
          , api_base: std::env::var("OPENAI_API_BASE")
              .unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
          , pace_delay_ms: DEFAULT_PACE_DELAY_MS
        }
    }
}

impl Default for ApiConfig
{   fn default() -> Self
    {   ApiConfig
        {   api_key: None
          , default_model: DEFAULT_MODEL.to_string()
          , embedding_model: DEFAULT_EMBEDDING_MODEL.to_string()
          , api_base: DEFAULT_API_BASE.to_string()
          , pace_delay_ms: DEFAULT_PACE_DELAY_MS
        }
    }
}
