use std::time::Duration;
use tokio::sync::mpsc;
use log::{debug, error, info};
use crate::SafegenFoot;

/// Backend state for serving generation commands
pub struct SafegenBackendState
{   pub client: crate::providers::openai::OpenAiClient
}

impl SafegenBackendState
{   /// Create a new backend state from endpoint configuration
    pub fn new(config: &crate::config::ApiConfig) -> Self
    {   debug!("Initializing SafegenBackendState");
        SafegenBackendState
        {   client: crate::providers::openai::OpenAiClient::new(
              config
            )
        }
    }
}

/// Public API for the safegen backend - owns the task
pub struct SafegenBackend
{   hand: crate::SafegenHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl SafegenBackend
{   /// Create and spawn a new safegen backend
    /// Returns immediately - spawns background task
    pub fn new(config: crate::config::ApiConfig) -> Self
    {   debug!("Creating SafegenBackend with task ownership");

        let (generate_tx, generate_rx)
          = mpsc::unbounded_channel();
        let (generate_json_tx, generate_json_rx)
          = mpsc::unbounded_channel();
        let (embed_tx, embed_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::SafegenHand
        {   generate_tx: generate_tx.clone()
          , generate_json_tx: generate_json_tx.clone()
          , embed_tx: embed_tx.clone()
          , kill_process_tx: kill_process_tx.clone()
        };

        let foot = crate::SafegenFoot
        {   generate_rx
          , generate_json_rx
          , embed_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, config).await
        });

        SafegenBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a direct-validation generation - returns almost
    /// immediately; the reply carries the cleaned value or, after
    /// exhaustion, the fail-safe
    pub async fn generate(
      &self
    , prompt: String
    , params: crate::request::CompletionParams
    , repeat: usize
    , fail_safe: String
    , validate: crate::ValidateFn
    , clean_up: crate::CleanUpFn
    , deadline: Option<Duration>
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateReply>,
        crate::error::Error
      >
    {   debug!("generate queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateArgs
        {   prompt
          , params
          , repeat
          , fail_safe
          , validate
          , clean_up
          , deadline
          , reply: reply_tx
        };

        self.hand.generate_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Queue a JSON-extraction generation - returns almost
    /// immediately; on exhaustion the reply is Err(NoValidResponse)
    /// rather than a fallback value
    pub async fn generate_json(
      &self
    , prompt: String
    , example_output: String
    , special_instruction: String
    , repeat: usize
    , validate: crate::ValidateFn
    , clean_up: crate::CleanUpFn
    , deadline: Option<Duration>
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateReply>,
        crate::error::Error
      >
    {   debug!("generate_json queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateJsonArgs
        {   prompt
          , example_output
          , special_instruction
          , repeat
          , validate
          , clean_up
          , deadline
          , reply: reply_tx
        };

        self.hand.generate_json_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Queue an embedding request - returns almost immediately
    pub async fn embed(
      &self
    , text: String
    ) -> Result<
        mpsc::UnboundedReceiver<crate::EmbedReply>,
        crate::error::Error
      >
    {   debug!("embed queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::EmbedArgs
        {   text
          , reply: reply_tx
        };

        self.hand.embed_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down SafegenBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(crate::error::Error::Timeout)
        }
    }
}

/// Main backend event loop
///
/// Design: tokio::select! is ONLY for command routing. Commands are
/// handled one at a time, so generation attempts within an invocation
/// stay strictly sequential
async fn run_backend_loop(
  foot: crate::SafegenFoot
, config: crate::config::ApiConfig
)
{   debug!("Starting SafegenBackend event loop");
    let state = SafegenBackendState::new(&config);
    let SafegenFoot
    {   mut generate_rx
      , mut generate_json_rx
      , mut embed_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = generate_rx.recv() => {
          debug!("Received Generate");
          handle_generate(&state, cmd).await;
        }
      , Some(cmd) = generate_json_rx.recv() => {
          debug!("Received GenerateJson");
          handle_generate_json(&state, cmd).await;
        }
      , Some(cmd) = embed_rx.recv() => {
          debug!("Received Embed");
          let result = state.client.embed(&cmd.text).await;
          let _ = cmd.reply.send(result);
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("SafegenBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}

/// Run the direct-validation variant, bounded by the optional
/// whole-invocation deadline; on expiry the fail-safe is the reply
async fn handle_generate(
  state: &SafegenBackendState
, cmd: crate::GenerateArgs
)
{   let crate::GenerateArgs
    {   prompt
      , params
      , repeat
      , fail_safe
      , validate
      , clean_up
      , deadline
      , reply
    } = cmd;

    let run = crate::engine::safe_generate(
      &state.client,
      &prompt,
      &params,
      repeat,
      fail_safe.clone(),
      validate,
      clean_up
    );

    let value = match deadline
    {   Some(limit) => {
          match tokio::time::timeout(limit, run).await
          {   Ok(value) => value
            , Err(_) => {
                error!("Generate deadline elapsed");
                fail_safe
              }
          }
        }
      , None => run.await
    };

    let _ = reply.send(Ok(value));
}

/// Run the JSON-extraction variant; exhaustion and deadline expiry
/// reply with distinguished errors instead of a fallback value
async fn handle_generate_json(
  state: &SafegenBackendState
, cmd: crate::GenerateJsonArgs
)
{   let crate::GenerateJsonArgs
    {   prompt
      , example_output
      , special_instruction
      , repeat
      , validate
      , clean_up
      , deadline
      , reply
    } = cmd;

    let run = crate::engine::safe_generate_json(
      &state.client,
      &prompt,
      &example_output,
      &special_instruction,
      repeat,
      validate,
      clean_up
    );

    let result = match deadline
    {   Some(limit) => {
          match tokio::time::timeout(limit, run).await
          {   Ok(outcome) => outcome
                .ok_or(crate::error::Error::NoValidResponse)
            , Err(_) => {
                error!("GenerateJson deadline elapsed");
                Err(crate::error::Error::Timeout)
              }
          }
        }
      , None => run.await
          .ok_or(crate::error::Error::NoValidResponse)
    };

    let _ = reply.send(result);
}
