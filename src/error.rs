use std::fmt;

/// Error type for clinichat operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key is missing; the client cannot be built
    MissingApiKey
  , /// Invalid configuration value
    InvalidConfiguration(String)
  , /// Connection-level HTTP failure
    HttpError(String)
  , /// Endpoint answered with a non-2xx status
    ApiError
    {   status: u16
      , body: String
    }
  , /// Request timed out
    Timeout
  , /// Response body was not JSON
    ParseError(String)
  , /// Response JSON had the expected keys with the wrong shape
    FormatError(String)
  , /// Response JSON had none of the expected keys
    UnrecognizedResponse
  , /// Generic error
    Other(String)
}

impl Error
{   /// Network, status and body-decoding failures of the outbound call
    pub fn is_transport(&self) -> bool
    {   matches!(
          self,
          Error::HttpError(_)
            | Error::ApiError { .. }
            | Error::Timeout
            | Error::ParseError(_)
        )
    }

    /// Reply arrived but its JSON shape could not be read
    pub fn is_format(&self) -> bool
    {   matches!(
          self,
          Error::FormatError(_) | Error::UnrecognizedResponse
        )
    }

    pub fn is_configuration(&self) -> bool
    {   matches!(
          self,
          Error::MissingApiKey | Error::InvalidConfiguration(_)
        )
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey => {
              write!(f, "Databricks API key is required")
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError { status, body } => {
              write!(f,
                "API error (status {}): {}",
                status, body
              )
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::FormatError(msg) => {
              write!(f, "Malformed response: {}", msg)
            }
          , Error::UnrecognizedResponse => {
              write!(f, "Unexpected API response format")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<reqwest::Error> for Error
{   fn from(e: reqwest::Error) -> Self
    {   if e.is_timeout()
        {   Error::Timeout
        } else if e.is_decode()
        {   Error::ParseError(e.to_string())
        } else
        {   Error::HttpError(e.to_string())
        }
    }
}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
