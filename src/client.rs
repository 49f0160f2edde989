use tokio::sync::mpsc;
use log::{debug, error, info};
use crate::ChatCommand;
use crate::session::ChatSession;

/// Public API for the chat backend - owns the task
pub struct ChatBackend
{   tx: mpsc::UnboundedSender<ChatCommand>
  , _task_handle: tokio::task::JoinHandle<()>
}

fn disconnected() -> crate::error::Error
{   error!("Backend channel closed");
    crate::error::Error::Other(
      "Backend disconnected".to_string()
    )
}

impl ChatBackend
{   /// Spawn a task owning `session`
    /// Returns immediately
    pub fn new(session: ChatSession) -> Self
    {   debug!("Creating ChatBackend with task ownership");
        let (cmd_tx, cmd_rx)
          = mpsc::unbounded_channel();

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(cmd_rx, session).await
        });

        ChatBackend
        {   tx: cmd_tx
          , _task_handle
        }
    }

    /// Queue a user message - returns almost immediately
    pub async fn send_message(
      &self
    , text: String
    ) -> Result<
        mpsc::UnboundedReceiver<crate::SendMessageReply>,
        crate::error::Error
      >
    {   debug!("send_message queuing {} chars", text.len());
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.tx
          .send(ChatCommand::SendMessage(crate::SendMessageArgs
          {   text
            , reply: reply_tx
          }))
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Queue a history reset - returns almost immediately
    pub async fn clear_history(
      &self
    ) -> Result<
        mpsc::UnboundedReceiver<crate::ClearHistoryReply>,
        crate::error::Error
      >
    {   debug!("clear_history queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.tx
          .send(ChatCommand::ClearHistory(
            crate::ClearHistoryArgs { reply: reply_tx }
          ))
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Queue a history snapshot - returns almost immediately
    pub async fn get_history(
      &self
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GetHistoryReply>,
        crate::error::Error
      >
    {   debug!("get_history queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.tx
          .send(ChatCommand::GetHistory(
            crate::GetHistoryArgs { reply: reply_tx }
          ))
          .map_err(|_| disconnected())?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down ChatBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        self.tx
          .send(ChatCommand::KillProcess(
            crate::KillProcessArgs { reply: reply_tx }
          ))
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(crate::error::Error::Timeout)
        }
    }
}

/// Main backend event loop
///
/// Commands arrive on one channel and run in the order sent; a
/// message is fully answered before the next command is read.
async fn run_backend_loop(
  mut cmd_rx: mpsc::UnboundedReceiver<ChatCommand>
, mut session: ChatSession
)
{   debug!("Starting ChatBackend event loop");

    loop
    { match cmd_rx.recv().await
      {   Some(ChatCommand::SendMessage(cmd)) => {
            debug!("Processing SendMessage");
            let turn = session.respond_with_status(&cmd.text).await;
            let _ = cmd.reply.send(Ok(turn));
          }
        , Some(ChatCommand::ClearHistory(cmd)) => {
            debug!("Processing ClearHistory");
            session.reset();
            let _ = cmd.reply.send(Ok(()));
          }
        , Some(ChatCommand::GetHistory(cmd)) => {
            debug!("Processing GetHistory");
            let _ = cmd.reply.send(Ok(session.history().to_vec()));
          }
        , Some(ChatCommand::KillProcess(cmd)) => {
            let _ = cmd.reply.send(Ok(()));
            info!("ChatBackend shutting down");
            break;
          }
        , None => {
            debug!("Command channel closed");
            break;
          }
      }
    }
}
