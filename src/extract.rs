//! Recovery of the "output" field from model text
//!
//! Models asked for JSON often wrap it in prose. The extractor slices
//! from the first opening brace to the last closing brace before
//! parsing, which recovers the object from leading and trailing
//! commentary. Known limitation: a `}` inside a nested or quoted
//! structure after the intended terminator defeats the heuristic

use log::trace;

/// Field the JSON generation variant asks the model to emit
pub const OUTPUT_FIELD: &str = "output";

/// Pull the expected field out of raw model text
/// A missing brace, a JSON parse failure, and a missing field are all
/// parse failures, reported as Error::ParseError
pub fn extract_output_field(raw: &str)
  -> Result<String, crate::error::Error>
{   let end = raw.rfind('}').ok_or_else(|| {
      crate::error::Error::ParseError(
        "no closing brace in response".to_string()
      )
    })?;

    let start = raw.find('{').ok_or_else(|| {
      crate::error::Error::ParseError(
        "no opening brace in response".to_string()
      )
    })?;

    if start > end
    {   return Err(crate::error::Error::ParseError(
          "braces out of order in response".to_string()
        ));
    }

    let candidate = &raw[start..=end];
    trace!("Extraction candidate: {}", candidate);

    let parsed: serde_json::Value
      = serde_json::from_str(candidate).map_err(|e| {
        crate::error::Error::ParseError(e.to_string())
      })?;

    match parsed.get(OUTPUT_FIELD)
    {   Some(serde_json::Value::String(value)) => {
          Ok(value.clone())
        }
      , Some(value) => {
          // Non-string values surface in their JSON rendering
          Ok(value.to_string())
        }
      , None => {
          Err(crate::error::Error::ParseError(format!(
            "response JSON missing \"{}\" key",
            OUTPUT_FIELD
          )))
        }
    }
}
