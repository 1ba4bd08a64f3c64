//! Prompt template materialization

use std::fs;
use std::path::Path;
use log::{debug, trace};

/// Delimiter separating template header commentary from the body
pub const BLOCK_MARKER: &str
  = "<commentblockmarker>###</commentblockmarker>";

/// Load a template file and substitute positional placeholders
///
/// Each occurrence of `!<INPUT i>!` is replaced with the i-th input.
/// If the block marker occurs, only the text after its first
/// occurrence is kept. The result is trimmed of surrounding
/// whitespace. A single input is passed as a one-element slice
pub fn generate_prompt<S: AsRef<str>>(
  inputs: &[S]
, template_path: &Path
) -> Result<String, crate::error::Error>
{   debug!(
      "Materializing prompt from: {}",
      template_path.display()
    );

    let mut prompt = fs::read_to_string(template_path)
      .map_err(|e| {
        crate::error::Error::TemplateError(format!(
          "{}: {}",
          template_path.display(),
          e
        ))
      })?;

    for (count, input) in inputs.iter().enumerate()
    {   let placeholder = format!("!<INPUT {}>!", count);
        prompt = prompt.replace(&placeholder, input.as_ref());
    }

    if let Some(index) = prompt.find(BLOCK_MARKER)
    {   prompt = prompt[index + BLOCK_MARKER.len()..]
          .to_string();
    }

    let prompt = prompt.trim().to_string();
    trace!("Materialized prompt: {}", prompt);
    Ok(prompt)
}
