//! Retry-validate-cleanup engine
//!
//! The sole orchestration point callers use to get a trustworthy value
//! out of the model. Each attempt makes one transport call, classifies
//! the outcome, and runs the caller's validate and clean-up functions
//! on usable text only. Attempts are strictly sequential; there is no
//! backoff and no speculation. Transport and parse failures are
//! absorbed as retry triggers and observable only through logging

use log::{debug, trace, warn};

use crate::request::{CompletionParams, CompletionRequest,
  TransportOutcome};
use crate::service::CompletionService;

/// First 200 chars, for log lines
fn preview(text: &str) -> String
{   text.chars().take(200).collect()
}

/// Reduce a transport outcome to usable text
/// Text is re-classified so sentinel strings arriving through the
/// text boundary still count as transport failures. The classifier
/// is the variant's own: the direct variant applies the legacy
/// containment rule, while the JSON variant matches sentinels
/// exactly, since its payload may legitimately mention those words
fn usable_text(
  outcome: TransportOutcome
, classify: fn(&str) -> TransportOutcome
) -> Result<String, String>
{   match outcome
    {   TransportOutcome::Text(raw) => {
          match classify(&raw)
          {   TransportOutcome::Text(text) => Ok(text)
            , failed => {
                Err(format!(
                  "sentinel response: {}",
                  failed.sentinel_text()
                ))
              }
          }
        }
      , failed => {
          Err(format!(
            "transport failure: {}",
            failed.sentinel_text()
          ))
        }
    }
}

/// Generate with retries, validating the raw response text directly
///
/// Per attempt: one transport call; usable text goes through
/// `validate(candidate, prompt)` and, on success, `clean_up(candidate,
/// prompt)` becomes the terminal result. Both run at most once per
/// attempt and never on a failed value. When the budget is exhausted
/// the caller's `fail_safe` is returned
pub async fn safe_generate<S, T, V, C>(
  service: &S
, prompt: &str
, params: &CompletionParams
, repeat: usize
, fail_safe: T
, validate: V
, clean_up: C
) -> T
where
  S: CompletionService
, V: Fn(&str, &str) -> bool
, C: Fn(&str, &str) -> T
{   debug!("safe_generate: up to {} attempts", repeat);
    trace!("Prompt: {}", preview(prompt));

    let request = CompletionRequest::with_params(
      prompt.to_string(),
      params.clone()
    );

    for attempt in 1..=repeat
    {   let outcome = service.complete(&request).await;

        let raw = match usable_text(
          outcome,
          TransportOutcome::from_text
        )
        {   Ok(text) => text
          , Err(reason) => {
              warn!("Attempt {}: {}", attempt, reason);
              continue;
            }
        };

        if validate(&raw, prompt)
        {   debug!("Attempt {}: response validated", attempt);
            return clean_up(&raw, prompt);
        }

        warn!("Attempt {}: response failed validation", attempt);
        trace!("Rejected response: {}", preview(&raw));
    }

    warn!(
      "All {} attempts failed, using fail-safe response",
      repeat
    );
    fail_safe
}

/// Wrap a prompt with the JSON output instruction and an example
pub fn wrap_json_prompt(
  prompt: &str
, example_output: &str
, special_instruction: &str
) -> String
{   let mut wrapped = format!("\"\"\"\n{}\n\"\"\"\n", prompt);
    wrapped.push_str(&format!(
      "Output the response to the prompt above in json. {}\n",
      special_instruction
    ));
    wrapped.push_str("Example output json:\n");
    wrapped.push_str(&format!(
      "{{\"output\": \"{}\"}}",
      example_output
    ));
    wrapped
}

/// Generate with retries, requiring a JSON "output" field
///
/// The prompt is wrapped with an instruction to answer as
/// `{"output": ...}` plus an example; each attempt must pass the
/// extractor before validation runs. Validate and clean-up receive the
/// wrapped prompt, which is what was actually sent. On exhaustion this
/// variant returns None rather than a caller fallback; callers must
/// handle both shapes
pub async fn safe_generate_json<S, T, V, C>(
  service: &S
, prompt: &str
, example_output: &str
, special_instruction: &str
, repeat: usize
, validate: V
, clean_up: C
) -> Option<T>
where
  S: CompletionService
, V: Fn(&str, &str) -> bool
, C: Fn(&str, &str) -> T
{   let wrapped = wrap_json_prompt(
      prompt,
      example_output,
      special_instruction
    );

    debug!("safe_generate_json: up to {} attempts", repeat);
    trace!("Wrapped prompt: {}", preview(&wrapped));

    let request = CompletionRequest::new(wrapped.clone());

    for attempt in 1..=repeat
    {   let outcome = service.complete(&request).await;

        let raw = match usable_text(
          outcome,
          TransportOutcome::from_text_exact
        )
        {   Ok(text) => text
          , Err(reason) => {
              warn!("Attempt {}: {}", attempt, reason);
              continue;
            }
        };

        let value = match crate::extract::extract_output_field(
          raw.trim()
        )
        {   Ok(value) => value
          , Err(e) => {
              warn!("Attempt {}: {}", attempt, e);
              continue;
            }
        };

        if validate(&value, &wrapped)
        {   debug!("Attempt {}: response validated", attempt);
            return Some(clean_up(&value, &wrapped));
        }

        warn!("Attempt {}: response failed validation", attempt);
        trace!("Rejected response: {}", preview(&value));
    }

    warn!("No valid response after {} attempts", repeat);
    None
}
