use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, error};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use clinichat::utils::{
  format_markdown_response, medical_disclaimer, parse_medical_entities
};
use clinichat::{ChatBackend, ChatConfig, ChatSession, Message, TurnStatus};

#[derive(Parser, Debug)]
#[command(author, version, about = "Clinical chat assistant", long_about = None)]
struct Cli
{   /// Databricks API key
    #[arg(long)]
    api_key: Option<String>
  , /// Workspace base URL
    #[arg(long)]
    workspace_url: Option<String>
  , /// Completion endpoint path
    #[arg(long)]
    endpoint: Option<String>
  , #[arg(long)]
    model: Option<String>
  , #[arg(long)]
    max_tokens: Option<u32>
  , #[arg(long)]
    temperature: Option<f32>
  , /// Log request and response bodies
    #[arg(long)]
    debug: bool
  , #[arg(long)]
    log_level: Option<String>
  , /// .env file to load instead of searching for one
    #[arg(long)]
    env_file: Option<PathBuf>
}

impl Cli
{   fn apply(self, config: &mut ChatConfig)
    {   if let Some(v) = self.api_key { config.api_key = v; }
        if let Some(v) = self.workspace_url { config.workspace_url = v; }
        if let Some(v) = self.endpoint { config.endpoint = v; }
        if let Some(v) = self.model { config.model = v; }
        if let Some(v) = self.max_tokens { config.max_tokens = v; }
        if let Some(v) = self.temperature { config.temperature = v; }
        if let Some(v) = self.log_level { config.log_level = v; }
        if self.debug { config.debug = true; }
    }
}

const HELP: &str
  = "Commands: /reset  /history  /entities  /quit";

#[tokio::main]
async fn main() -> ExitCode
{   let cli = Cli::parse();
    ChatConfig::load_dotenv(cli.env_file.as_deref());

    let mut config = match ChatConfig::from_env()
    {   Ok(c) => c
      , Err(e) => {
          eprintln!("Error reading configuration: {}", e);
          return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);

    env_logger::Builder::new()
      .filter_level(config.log_filter())
      .parse_default_env()
      .init();

    let session = match ChatSession::from_config(&config)
    {   Ok(s) => s
      , Err(e) => {
          error!("Error initializing Databricks client: {}", e);
          eprintln!("Error initializing Databricks client: {}", e);
          eprintln!("Please check your API key and configuration.");
          return ExitCode::FAILURE;
        }
    };

    println!("Clinical Chatbot");
    println!("{}\n", medical_disclaimer());
    println!("{}", HELP);

    let backend = ChatBackend::new(session);
    let code = match run_repl(&backend).await
    {   Ok(()) => ExitCode::SUCCESS
      , Err(e) => {
          error!("Chat loop stopped: {}", e);
          ExitCode::FAILURE
        }
    };

    if let Err(e) = backend.shutdown().await
    {   debug!("Shutdown: {}", e);
    }
    code
}

async fn run_repl(backend: &ChatBackend)
  -> Result<(), clinichat::Error>
{   let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut last_reply: Option<String> = None;

    loop
    {   stdout.write_all(b"\n> ").await.map_err(io_error)?;
        stdout.flush().await.map_err(io_error)?;

        let Some(line) = lines.next_line().await.map_err(io_error)?
        else
        {   return Ok(());
        };
        let input = line.trim();

        match input
        {   "" => continue
          , "/quit" | "/exit" => return Ok(())
          , "/help" => println!("{}", HELP)
          , "/reset" => {
              let mut rx = backend.clear_history().await?;
              recv(&mut rx).await??;
              last_reply = None;
              println!("Conversation cleared.");
            }
          , "/history" => {
              let mut rx = backend.get_history().await?;
              let history = recv(&mut rx).await??;
              print_history(&history);
            }
          , "/entities" => match &last_reply
            {   Some(reply) => {
                  let entities = parse_medical_entities(reply);
                  if entities.is_empty()
                  {   println!("No terms tagged.");
                  }
                  for entity in entities
                  {   println!("{:?}: {}", entity.kind, entity.text);
                  }
                }
              , None => println!("No reply yet.")
            }
          , text => {
              println!("Thinking...");
              let mut rx = backend.send_message(text.to_string()).await?;
              let turn = recv(&mut rx).await??;
              if let TurnStatus::Failed(e) | TurnStatus::Unreadable(e)
                = &turn.status
              {   debug!("Turn not answered: {}", e);
              }
              println!("\n{}", format_markdown_response(&turn.reply));
              last_reply = Some(turn.reply);
            }
        }
    }
}

async fn recv<T>(rx: &mut tokio::sync::mpsc::UnboundedReceiver<T>)
  -> Result<T, clinichat::Error>
{   rx.recv().await.ok_or_else(|| {
      clinichat::Error::Other("Backend disconnected".to_string())
    })
}

fn print_history(history: &[Message])
{   if history.is_empty()
    {   println!("No messages yet.");
    }
    for message in history
    {   println!("{}: {}", message.role().label(), message.content());
    }
}

fn io_error(e: std::io::Error) -> clinichat::Error
{   clinichat::Error::Other(format!("terminal I/O failed: {}", e))
}
