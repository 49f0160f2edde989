use std::time::Duration;
use serde_json::Value;
use log::{debug, error, info, trace};

use crate::config::ChatConfig;
use crate::request::CompletionRequest;

/// Wrap a prompt in the clinical instruction template
pub fn format_clinical_prompt(prompt: &str) -> String
{   format!(
      "\nYou are a clinical assistant providing information based on \
       medical knowledge.\nAlways indicate when information is uncertain \
       and recommend consulting healthcare professionals.\n\n\
       QUESTION: {}\n\nANSWER:\n",
      prompt
    )
}

/// Databricks Genie completion client
#[derive(Clone)]
pub struct GenieClient
{   api_key: String
  , url: String
  , model: String
  , max_tokens: u32
  , temperature: f32
  , debug: bool
  , http_client: reqwest::Client
}

impl std::fmt::Debug for GenieClient
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.debug_struct("GenieClient")
          .field("url", &self.url)
          .field("model", &self.model)
          .field("max_tokens", &self.max_tokens)
          .field("temperature", &self.temperature)
          .field("debug", &self.debug)
          .finish_non_exhaustive()
    }
}

impl GenieClient
{   /// Build a client; fails without an API key
    pub fn new(config: &ChatConfig)
      -> Result<Self, crate::error::Error>
    {   debug!("Creating GenieClient");
        if config.api_key.trim().is_empty()
        {   error!("No Databricks API key configured");
            return Err(crate::error::Error::MissingApiKey);
        }
        config.validate()?;

        let http_client = reqwest::Client::builder()
          .timeout(Duration::from_secs(config.timeout_secs))
          .build()
          .map_err(|e| {
            error!("Failed to build HTTP client: {}", e);
            crate::error::Error::InvalidConfiguration(e.to_string())
          })?;

        let url = config.endpoint_url();
        info!("Completion endpoint: {}", url);

        Ok(GenieClient
        {   api_key: config.api_key.clone()
          , url
          , model: config.model.clone()
          , max_tokens: config.max_tokens
          , temperature: config.temperature
          , debug: config.debug
          , http_client
        })
    }

    pub fn url(&self) -> &str
    {   &self.url
    }

    pub fn model(&self) -> &str
    {   &self.model
    }

    /// Value of the Authorization header
    pub fn authorization(&self) -> String
    {   format!("Bearer {}", self.api_key)
    }

    /// Request body for `prompt`; unset settings use configured defaults
    pub fn build_request(
      &self
    , prompt: &str
    , model: Option<&str>
    , max_tokens: Option<u32>
    , temperature: Option<f32>
    ) -> Result<CompletionRequest, crate::error::Error>
    {   CompletionRequest::new(
          model.unwrap_or(self.model.as_str())
        , format_clinical_prompt(prompt)
        , max_tokens.unwrap_or(self.max_tokens)
        , temperature.unwrap_or(self.temperature)
        )
    }

    /// POST one completion request and return the raw JSON reply
    pub async fn generate_completion(
      &self
    , prompt: &str
    , model: Option<&str>
    , max_tokens: Option<u32>
    , temperature: Option<f32>
    ) -> Result<Value, crate::error::Error>
    {   let request = self.build_request(
          prompt, model, max_tokens, temperature
        )?;
        debug!("Sending completion request for: {}", request.model);

        if self.debug
        {   debug!(
              "Request payload: {}",
              serde_json::to_string_pretty(&request)
                .unwrap_or_default()
            );
        }

        let response = self.http_client
          .post(self.url.as_str())
          .header("Authorization", self.authorization())
          .header("Content-Type", "application/json")
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            error!("API request failed: {}", e);
            crate::error::Error::from(e)
          })?;

        let status = response.status();
        trace!("Genie response status: {}", status);

        if !status.is_success()
        {   let body = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Response status: {}", status.as_u16());
            error!("Response body: {}", body);
            return Err(crate::error::Error::ApiError
            {   status: status.as_u16()
              , body
            });
        }

        let result: Value = response.json().await.map_err(|e| {
          error!("Parse error: {}", e);
          crate::error::Error::ParseError(e.to_string())
        })?;

        if self.debug
        {   debug!(
              "Response: {}",
              serde_json::to_string_pretty(&result)
                .unwrap_or_default()
            );
        }

        Ok(result)
    }
}
