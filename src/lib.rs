pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod context;
pub mod session;
pub mod client;
pub mod utils;

use serde::{Deserialize, Serialize};

pub use client::ChatBackend;
pub use config::ChatConfig;
pub use context::build_context;
pub use error::Error;
pub use providers::GenieClient;
pub use request::{extract_text, CompletionRequest, CompletionResponse};
pub use session::{ChatSession, Turn, TurnStatus};

/*

clinichat: a terminal clinical chat assistant over a Databricks
Genie style completion endpoint. A session keeps the conversation,
renders the last few turns into a prompt, and always answers with
some text even when the endpoint fails.

clinichat/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports, messages, backend commands
│   ├── main.rs         # Terminal front end
│   ├── error.rs        # Error taxonomy
│   ├── config.rs       # Environment / .env configuration
│   ├── request.rs      # Completion request and reply decoding
│   ├── context.rs      # Conversation window -> prompt
│   ├── session.rs      # History owner, turn orchestration
│   ├── client.rs       # Backend task serializing a session
│   ├── utils.rs        # Display helpers
│   └── providers/
│       ├── mod.rs
│       └── genie.rs    # HTTP completion client
└── tests/

*/

/// CLINICHAT STRUCTURES:

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role
{   User
  , Assistant
}

impl Role
{   /// Capitalized form used in prompts
    pub fn label(&self) -> &'static str
    {   match self
        {   Role::User => "User"
          , Role::Assistant => "Assistant"
        }
    }
}

impl std::fmt::Display for Role
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   match self
        {   Role::User => write!(f, "user")
          , Role::Assistant => write!(f, "assistant")
        }
    }
}

/// One immutable conversation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message
{   role: Role
  , content: String
}

impl Message
{   pub fn new(role: Role, content: impl Into<String>) -> Self
    {   Message
        {   role
          , content: content.into()
        }
    }

    pub fn user(content: impl Into<String>) -> Self
    {   Message::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self
    {   Message::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role
    {   self.role
    }

    pub fn content(&self) -> &str
    {   &self.content
    }
}

/// CLINICHAT BACKEND INTERFACE:

// ===== SendMessage =====

pub type SendMessageReply = Result<Turn, crate::error::Error>;
pub type SendMessageReplySender
  = tokio::sync::mpsc::UnboundedSender<SendMessageReply>;

pub struct SendMessageArgs
{   pub text: String
  , pub reply: SendMessageReplySender
}

// ===== ClearHistory =====

pub type ClearHistoryReply = Result<(), crate::error::Error>;
pub type ClearHistoryReplySender
  = tokio::sync::mpsc::UnboundedSender<ClearHistoryReply>;

pub struct ClearHistoryArgs
{   pub reply: ClearHistoryReplySender
}

// ===== GetHistory =====

pub type GetHistoryReply
  = Result<Vec<Message>, crate::error::Error>;
pub type GetHistoryReplySender
  = tokio::sync::mpsc::UnboundedSender<GetHistoryReply>;

pub struct GetHistoryArgs
{   pub reply: GetHistoryReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== ChatCommand =====

/// Union of every backend command; one channel keeps them in send order
pub enum ChatCommand
{   SendMessage(SendMessageArgs)
  , ClearHistory(ClearHistoryArgs)
  , GetHistory(GetHistoryArgs)
  , KillProcess(KillProcessArgs)
}
