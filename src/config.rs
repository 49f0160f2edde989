//! Configuration for the completion client and chat session

use std::path::Path;
use serde::{Deserialize, Serialize};
use log::{debug, warn, LevelFilter};

pub const DEFAULT_WORKSPACE_URL: &str
  = "https://dbc-xxxxxxxx-xxxx.cloud.databricks.com";
pub const DEFAULT_ENDPOINT: &str
  = "/api/2.0/genie/completions";
pub const DEFAULT_MODEL: &str = "genie-1-mistral";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_WINDOW_SIZE: usize = 5;

pub const MAX_TEMPERATURE: f32 = 2.0;

/// Chat configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig
{   /// Databricks API key
    pub api_key: String
  , /// Workspace base URL
    pub workspace_url: String
  , /// Completion endpoint path under the workspace
    pub endpoint: String
  , /// Default model name
    pub model: String
  , /// Default max tokens to generate
    pub max_tokens: u32
  , /// Default sampling temperature
    pub temperature: f32
  , /// Log request and response bodies
    pub debug: bool
  , /// Log level name (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    pub log_level: String
  , /// Request timeout in seconds
    pub timeout_secs: u64
  , /// Number of user/assistant turn pairs sent as context
    pub window_size: usize
}

impl Default for ChatConfig
{   fn default() -> Self
    {   ChatConfig
        {   api_key: String::new()
          , workspace_url: DEFAULT_WORKSPACE_URL.to_string()
          , endpoint: DEFAULT_ENDPOINT.to_string()
          , model: DEFAULT_MODEL.to_string()
          , max_tokens: DEFAULT_MAX_TOKENS
          , temperature: DEFAULT_TEMPERATURE
          , debug: false
          , log_level: "INFO".to_string()
          , timeout_secs: DEFAULT_TIMEOUT_SECS
          , window_size: DEFAULT_WINDOW_SIZE
        }
    }
}

impl ChatConfig
{   /// Load a `.env` file into the process environment.
    /// With no path, searches the working directory and its parents.
    /// A missing file is not an error.
    pub fn load_dotenv(path: Option<&Path>)
    {   let loaded = match path
        {   Some(p) => dotenvy::from_path(p).map(|_| p.to_path_buf())
          , None => dotenvy::dotenv()
        };
        match loaded
        {   Ok(p) => debug!("Loaded environment from {}", p.display())
          , Err(e) if e.not_found() => {
              debug!("No .env file found")
            }
          , Err(e) => warn!("Failed to load .env file: {}", e)
        }
    }

    /// Read configuration from process environment
    pub fn from_env() -> Result<Self, crate::error::Error>
    {   Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through a key lookup; unset keys keep defaults
    pub fn from_lookup<F>(lookup: F)
      -> Result<Self, crate::error::Error>
    where F: Fn(&str) -> Option<String>
    {   let mut config = ChatConfig::default();

        if let Some(v) = lookup("DATABRICKS_API_KEY")
        {   config.api_key = v;
        }
        if let Some(v) = lookup("DATABRICKS_WORKSPACE_URL")
        {   config.workspace_url = v;
        }
        if let Some(v) = lookup("DATABRICKS_GENIE_ENDPOINT")
        {   config.endpoint = v;
        }
        if let Some(v) = lookup("MODEL_NAME")
        {   config.model = v;
        }
        if let Some(v) = lookup("MAX_TOKENS")
        {   config.max_tokens = parse_var("MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("TEMPERATURE")
        {   config.temperature = parse_var("TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("DEBUG_MODE")
        {   config.debug = v.trim().eq_ignore_ascii_case("true");
        }
        if let Some(v) = lookup("LOG_LEVEL")
        {   config.log_level = v;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS")
        {   config.timeout_secs
              = parse_var("REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("CONTEXT_WINDOW")
        {   config.window_size = parse_var("CONTEXT_WINDOW", &v)?;
        }

        Ok(config)
    }

    /// Range checks; the API key is checked by the client
    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   validate_generation(self.max_tokens, self.temperature)?;
        if self.window_size == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "window_size must be greater than 0".to_string()
            ));
        }
        if self.timeout_secs == 0
        {   return Err(crate::error::Error::InvalidConfiguration(
              "timeout_secs must be greater than 0".to_string()
            ));
        }
        Ok(())
    }

    /// Full completion URL: workspace and endpoint joined by one slash
    pub fn endpoint_url(&self) -> String
    {   format!(
          "{}/{}",
          self.workspace_url.trim_end_matches('/'),
          self.endpoint.trim_start_matches('/')
        )
    }

    /// Map the configured level name onto a log filter
    pub fn log_filter(&self) -> LevelFilter
    {   match self.log_level.trim().to_ascii_uppercase().as_str()
        {   "TRACE" => LevelFilter::Trace
          , "DEBUG" => LevelFilter::Debug
          , "INFO" => LevelFilter::Info
          , "WARN" | "WARNING" => LevelFilter::Warn
          , "ERROR" | "CRITICAL" => LevelFilter::Error
          , "OFF" => LevelFilter::Off
          , _ => LevelFilter::Info
        }
    }
}

/// Shared range check for max_tokens and temperature
pub fn validate_generation(max_tokens: u32, temperature: f32)
  -> Result<(), crate::error::Error>
{   if max_tokens == 0
    {   return Err(crate::error::Error::InvalidConfiguration(
          "max_tokens must be greater than 0".to_string()
        ));
    }
    if !(0.0..=MAX_TEMPERATURE).contains(&temperature)
    {   return Err(crate::error::Error::InvalidConfiguration(
          format!(
            "temperature must be within [0, {}], got {}",
            MAX_TEMPERATURE, temperature
          )
        ));
    }
    Ok(())
}

fn parse_var<T>(key: &str, value: &str)
  -> Result<T, crate::error::Error>
where T: std::str::FromStr
{   value.trim().parse::<T>().map_err(|_| {
      crate::error::Error::InvalidConfiguration(
        format!("{} has an invalid value: {:?}", key, value)
      )
    })
}
