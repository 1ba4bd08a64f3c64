pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod service;
pub mod extract;
pub mod engine;
pub mod prompt;
pub mod client;

use std::time::Duration;

pub use client::SafegenBackend;

/*

safegen is an async-only rust library that wraps a remote LLM
completion endpoint with a retry-validate-cleanup pipeline: every
response is checked by a caller-supplied validator, normalized by a
caller-supplied clean-up function, and contained by a bounded attempt
budget with a caller-visible fallback.

safegen/
├── Cargo.toml          # Main manifest
├── src/
│   ├── lib.rs          # Re-exports, backend command/reply types
│   ├── error.rs        # Custom error types and handling
│   ├── config.rs       # Endpoint configuration from environment
│   ├── request.rs      # Unified request and outcome types
│   ├── providers/      # Provider-specific implementations
│   │   ├── mod.rs      # Re-exports all providers
│   │   └── openai.rs   # OpenAI-style API client
│   ├── service.rs      # Completion service seam + test double
│   ├── extract.rs      # JSON "output" field extraction
│   ├── engine.rs       # Retry-validate-cleanup core
│   ├── prompt.rs       # Template placeholder substitution
│   └── client.rs       # Backend actor facade
└── tests/              # Integration and unit tests

*/

/// SAFEGEN API INTERFACE:

// ===== Policy Functions =====

/// Caller-supplied validation: (candidate, prompt) -> accept
pub type ValidateFn
  = Box<dyn Fn(&str, &str) -> bool + Send>;

/// Caller-supplied normalization: (candidate, prompt) -> cleaned
pub type CleanUpFn
  = Box<dyn Fn(&str, &str) -> String + Send>;

// ===== Generate =====

pub type GenerateReply = Result<String, crate::error::Error>;
pub type GenerateReplySender
  = tokio::sync::mpsc::UnboundedSender<GenerateReply>;

pub struct GenerateArgs
{   pub prompt: String
  , pub params: crate::request::CompletionParams
  , pub repeat: usize
  , pub fail_safe: String
  , pub validate: ValidateFn
  , pub clean_up: CleanUpFn
  , pub deadline: Option<Duration>
  , pub reply: GenerateReplySender
}

// ===== GenerateJson =====

pub struct GenerateJsonArgs
{   pub prompt: String
  , pub example_output: String
  , pub special_instruction: String
  , pub repeat: usize
  , pub validate: ValidateFn
  , pub clean_up: CleanUpFn
  , pub deadline: Option<Duration>
  , pub reply: GenerateReplySender
}

// ===== Embed =====

pub type EmbedReply
  = Result<Vec<f32>, crate::error::Error>;
pub type EmbedReplySender
  = tokio::sync::mpsc::UnboundedSender<EmbedReply>;

pub struct EmbedArgs
{   pub text: String
  , pub reply: EmbedReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== SafegenHand (sender side) =====

pub struct SafegenHand
{   pub generate_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateArgs>
  , pub generate_json_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateJsonArgs>
  , pub embed_tx
      : tokio::sync::mpsc::UnboundedSender<EmbedArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== SafegenFoot (receiver side) =====

pub struct SafegenFoot
{   pub generate_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateArgs>
  , pub generate_json_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateJsonArgs>
  , pub embed_rx
      : tokio::sync::mpsc::UnboundedReceiver<EmbedArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}
