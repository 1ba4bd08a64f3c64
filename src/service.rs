//! Completion service seam between the retry engine and the transport

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use log::trace;

/// One call to a remote completion endpoint
/// Implementations fold every failure into the outcome sum so the
/// engine sees a single uniform signal shape
#[async_trait::async_trait]
pub trait CompletionService: Send + Sync
{   async fn complete(
      &self
    , request: &crate::request::CompletionRequest
    ) -> crate::request::TransportOutcome;
}

// ===== Scripted Service (test double) =====

/// Service double that replays scripted outcomes without any network
/// Outcomes are served in order; once the script runs out the final
/// outcome repeats. Counts calls for test assertions
pub struct ScriptedService
{   script: Mutex<VecDeque<crate::request::TransportOutcome>>
  , repeated: crate::request::TransportOutcome
  , calls: AtomicUsize
}

impl ScriptedService
{   pub fn new(
      outcomes: Vec<crate::request::TransportOutcome>
    ) -> Self
    {   let repeated = outcomes.last().cloned()
          .unwrap_or(crate::request::TransportOutcome::Failed);

        ScriptedService
        {   script: Mutex::new(outcomes.into())
          , repeated
          , calls: AtomicUsize::new(0)
        }
    }

    /// Script a single outcome, repeated forever
    pub fn fixed(
      outcome: crate::request::TransportOutcome
    ) -> Self
    {   ScriptedService::new(vec![outcome])
    }

    /// Number of times complete() was called
    pub fn calls(&self) -> usize
    {   self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl CompletionService for ScriptedService
{   async fn complete(
      &self
    , _request: &crate::request::CompletionRequest
    ) -> crate::request::TransportOutcome
    {   self.calls.fetch_add(1, Ordering::Relaxed);

        let mut script = self.script.lock()
          .unwrap_or_else(|poisoned| poisoned.into_inner());

        let outcome = script.pop_front()
          .unwrap_or_else(|| self.repeated.clone());

        trace!("Scripted outcome: {:?}", outcome);
        outcome
    }
}
