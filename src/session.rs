//! Conversation state and turn orchestration

use log::{debug, error};

use crate::config::DEFAULT_WINDOW_SIZE;
use crate::context::build_context;
use crate::providers::GenieClient;
use crate::request::{extract, recover, MALFORMED_REPLY};
use crate::Message;

/// Assistant turn recorded when the completion call fails
pub const APOLOGY: &str
  = "I'm sorry, I encountered an error processing your request. \
     Please try again.";

/// How a turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnStatus
{   /// Model text was extracted
    Answered
  , /// Endpoint replied but the body could not be read
    Unreadable(crate::error::Error)
  , /// Endpoint could not be reached or refused the request
    Failed(crate::error::Error)
}

/// Reply text plus how it was obtained
#[derive(Debug, Clone, PartialEq)]
pub struct Turn
{   pub reply: String
  , pub status: TurnStatus
}

impl Turn
{   pub fn is_answered(&self) -> bool
    {   self.status == TurnStatus::Answered
    }
}

/// Owns the history of one conversation
#[derive(Debug)]
pub struct ChatSession
{   client: GenieClient
  , history: Vec<Message>
  , window_size: usize
}

impl ChatSession
{   pub fn new(client: GenieClient) -> Self
    {   ChatSession::with_window(client, DEFAULT_WINDOW_SIZE)
    }

    /// Session sending the last `window_size` turn pairs as context
    pub fn with_window(client: GenieClient, window_size: usize) -> Self
    {   debug!("Creating ChatSession (window {})", window_size);
        ChatSession
        {   client
          , history: Vec::new()
          , window_size
        }
    }

    /// Client and window both taken from `config`
    pub fn from_config(config: &crate::config::ChatConfig)
      -> Result<Self, crate::error::Error>
    {   let client = GenieClient::new(config)?;
        Ok(ChatSession::with_window(client, config.window_size))
    }

    pub fn history(&self) -> &[Message]
    {   &self.history
    }

    pub fn window_size(&self) -> usize
    {   self.window_size
    }

    /// Prompt the next request would carry
    pub fn context(&self) -> String
    {   build_context(&self.history, self.window_size)
    }

    /// Answer `user_message`; always yields text
    pub async fn respond(&mut self, user_message: &str) -> String
    {   self.respond_with_status(user_message).await.reply
    }

    /// Answer `user_message` and report how the reply was obtained.
    /// History gains exactly one user and one assistant entry.
    pub async fn respond_with_status(&mut self, user_message: &str)
      -> Turn
    {   self.history.push(Message::user(user_message));
        let context = self.context();

        let turn = match self.client
          .generate_completion(&context, None, None, None)
          .await
        {   Ok(value) => match extract(&value)
            {   Ok(text) if text.is_empty() => {
                  error!("Completion text is empty");
                  Turn
                  {   reply: MALFORMED_REPLY.to_string()
                    , status: TurnStatus::Unreadable(
                        crate::error::Error::FormatError(
                          "completion text is empty".to_string()
                        )
                      )
                  }
                }
              , Ok(text) => Turn
                {   reply: text
                  , status: TurnStatus::Answered
                }
              , Err(e) => Turn
                {   reply: recover(&value, &e).to_string()
                  , status: TurnStatus::Unreadable(e)
                }
            }
          , Err(e) => {
              error!("Error getting response: {}", e);
              Turn
              {   reply: APOLOGY.to_string()
                , status: TurnStatus::Failed(e)
              }
            }
        };

        self.history.push(Message::assistant(turn.reply.clone()));
        debug!("History now holds {} messages", self.history.len());
        turn
    }

    /// Forget the conversation
    pub fn reset(&mut self)
    {   debug!("Clearing {} messages", self.history.len());
        self.history.clear();
    }
}
