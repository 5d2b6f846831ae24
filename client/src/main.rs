use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

use argh::FromArgs;
use log::info;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

mod client;

use client::{ClientError, DnsChatClient};

fn default_server() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 53))
}

#[derive(Debug, FromArgs)]
#[argh(description = "chat with a language model over DNS TXT queries")]
struct CliArgs {
    #[argh(option, description = "DNS server address, default: 127.0.0.1:53", default = "default_server()")]
    server: SocketAddr,

    #[argh(option, description = "10-character API key for chat")]
    api_key: Option<String>,

    #[argh(option, description = "seconds to wait for an answer, default: 10", default = "10")]
    timeout: u64,

    #[argh(subcommand)]
    command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Ping(PingArgs),
    List(ListArgs),
    Chat(ChatArgs),
    Interactive(InteractiveArgs),
}

#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "ping", description = "check that the server answers")]
struct PingArgs {}

#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "list", description = "list the models the server offers")]
struct ListArgs {}

#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "chat", description = "send one prompt")]
struct ChatArgs {
    #[argh(option, short = 'm', description = "model index, default: 0", default = "0")]
    model: u8,

    #[argh(positional, description = "prompt text")]
    prompt: Vec<String>,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "interactive", description = "pick a model and chat until 'quit'")]
struct InteractiveArgs {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = env_logger::try_init();

    let args: CliArgs = argh::from_env();

    let mut client = DnsChatClient::new(args.server, Duration::from_secs(args.timeout));
    if let Some(api_key) = &args.api_key {
        client.set_api_key(api_key)?;
    }

    match args.command {
        Command::Ping(_) => {
            client.ping().await?;
            println!("Server is responding!");
        }
        Command::List(_) => {
            for model in client.list_models().await? {
                println!("{}", model);
            }
        }
        Command::Chat(chat) => {
            let prompt = chat.prompt.join(" ");
            let reply = client.chat(chat.model, &prompt).await?;
            println!("{}", reply);
        }
        Command::Interactive(_) => interactive(&client).await?,
    }

    Ok(())
}

async fn interactive(client: &DnsChatClient) -> Result<(), Box<dyn Error>> {
    if !client.has_api_key() {
        return Err(ClientError::Usage("API key required for chat, use --api-key".to_string()).into());
    }

    info!("Testing server connectivity...");
    client.ping().await?;

    let models = client.list_models().await?;
    println!("Available models:");
    for model in &models {
        println!("  {}", model);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let model_index = loop {
        prompt_for("Select model index (0-9): ").await?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        match line.trim().parse::<u8>() {
            Ok(index) if index <= 9 => break index,
            _ => println!("Please enter a number between 0 and 9"),
        }
    };

    println!("Chatting with model {}. Type 'quit' or 'exit' to leave.", model_index);

    loop {
        prompt_for("You: ").await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let prompt = line.trim();
        if ["quit", "exit", "bye", "q"].contains(&prompt.to_lowercase().as_str()) {
            break;
        }
        if prompt.is_empty() {
            println!("Please enter a message");
            continue;
        }

        match client.chat(model_index, prompt).await {
            Ok(reply) => println!("AI: {}", reply),
            Err(e) => println!("{}", e),
        }
    }

    println!("Goodbye!");
    Ok(())
}

async fn prompt_for(text: &str) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await
}
