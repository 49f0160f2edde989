//! Conversation window rendering

use crate::{Message, Role};

/// First line of every prompt
pub const PREAMBLE: &str
  = "The following is a conversation with a clinical assistant.\n\n";

/// Appended after an assistant turn so the model continues as the user
pub const USER_CUE: &str = "User: ";

/// Last `window_size` turn pairs of `history`, oldest first
pub fn window(history: &[Message], window_size: usize) -> &[Message]
{   let keep = window_size.saturating_mul(2);
    &history[history.len().saturating_sub(keep)..]
}

/// Render the last `window_size` turn pairs into a prompt.
/// Empty history renders the preamble alone.
pub fn build_context(history: &[Message], window_size: usize) -> String
{   let recent = window(history, window_size);
    let mut context = String::from(PREAMBLE);

    for message in recent
    {   context.push_str(message.role().label());
        context.push_str(": ");
        context.push_str(message.content());
        context.push_str("\n\n");
    }

    if let Some(last) = recent.last()
    {   if last.role() == Role::Assistant
        {   context.push_str(USER_CUE);
        }
    }

    context
}
