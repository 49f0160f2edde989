//! Completion request and response types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use log::{error, warn};

/// Returned when the reply has none of the known shapes
pub const UNRECOGNIZED_REPLY: &str
  = "Sorry, I couldn't process that request. Please try again.";

/// Returned when a known key holds the wrong shape
pub const MALFORMED_REPLY: &str
  = "Sorry, there was an error processing the response.";

/// Request body sent to the completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest
{   /// Model name
    pub model: String
  , /// Fully wrapped prompt text
    pub prompt: String
  , /// Max tokens to generate
    pub max_tokens: u32
  , /// Sampling temperature
    pub temperature: f32
}

impl CompletionRequest
{   pub fn new(
      model: impl Into<String>
    , prompt: impl Into<String>
    , max_tokens: u32
    , temperature: f32
    ) -> Result<Self, crate::error::Error>
    {   crate::config::validate_generation(max_tokens, temperature)?;
        Ok(CompletionRequest
        {   model: model.into()
          , prompt: prompt.into()
          , max_tokens
          , temperature
        })
    }
}

/// Decoded completion reply
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResponse
{   /// `choices[0].text`
    Choice(String)
  , /// `result`
    Result(String)
  , /// Anything else, kept for logging
    Unrecognized(Value)
}

impl CompletionResponse
{   /// Try `choices`, then `result`, then give up without failing.
    /// An empty `choices` list falls through to `result`.
    pub fn decode(value: &Value)
      -> Result<Self, crate::error::Error>
    {   if let Some(choices) = value.get("choices")
        {   let list = choices.as_array().ok_or_else(|| {
              crate::error::Error::FormatError(
                "`choices` is not a list".to_string()
              )
            })?;
            if let Some(first) = list.first()
            {   let text = first.get("text")
                  .and_then(Value::as_str)
                  .ok_or_else(|| {
                    crate::error::Error::FormatError(
                      "`choices[0].text` is missing or not a string"
                        .to_string()
                    )
                  })?;
                return Ok(CompletionResponse::Choice(text.to_string()));
            }
        }

        if let Some(result) = value.get("result")
        {   let text = result.as_str().ok_or_else(|| {
              crate::error::Error::FormatError(
                "`result` is not a string".to_string()
              )
            })?;
            return Ok(CompletionResponse::Result(text.to_string()));
        }

        Ok(CompletionResponse::Unrecognized(value.clone()))
    }

    /// Trimmed generated text, if any
    pub fn text(&self) -> Option<&str>
    {   match self
        {   CompletionResponse::Choice(t)
          | CompletionResponse::Result(t) => Some(t.trim())
          , CompletionResponse::Unrecognized(_) => None
        }
    }
}

/// Typed extraction: generated text, or why there is none
pub fn extract(value: &Value) -> Result<String, crate::error::Error>
{   let decoded = CompletionResponse::decode(value)?;
    decoded.text()
      .map(str::to_string)
      .ok_or(crate::error::Error::UnrecognizedResponse)
}

/// Generated text, or one of the fixed fallback replies
pub fn extract_text(value: &Value) -> String
{   match extract(value)
    {   Ok(text) => text
      , Err(e) => recover(value, &e).to_string()
    }
}

/// Log an extraction failure and pick its fallback reply
pub(crate) fn recover(value: &Value, error: &crate::error::Error)
  -> &'static str
{   match error
    {   crate::error::Error::UnrecognizedResponse => {
          warn!("Unexpected API response format: {}", value);
          UNRECOGNIZED_REPLY
        }
      , _ => {
          error!("Error extracting response text: {}", error);
          MALFORMED_REPLY
        }
    }
}
