use clap::{Parser, Subcommand};
use colored::*;
use anyhow::Result;
use std::sync::Arc;

mod app;
mod assistant;
mod characters;
mod config;
mod conversation;
mod handler;
mod server;
mod tui;
mod ui;
mod upstream;

use app::App;
use assistant::{Assistant, HttpAskEndpoint};
use characters::CharacterClient;
use config::Config;
use conversation::Role;
use upstream::UpstreamClient;

#[derive(Parser)]
#[command(name = "citadel")]
#[command(about = "Browse the character index and consult the Truth Tortoise")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse characters in the terminal (the default)
    Tui,
    /// Run the Truth Tortoise request proxy
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8787")]
        port: u16,
    },
    /// Print one character's details
    Show {
        /// Character id
        id: i64,
    },
    /// Ask the Truth Tortoise a one-shot question through the proxy
    Ask {
        /// Your question
        question: String,
        /// Context line sent along with the question
        #[arg(short, long)]
        context: Option<String>,
        /// Proxy base URL (defaults to the configured one)
        #[arg(long)]
        proxy_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|_| Config::new());

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => run_tui(&config).await?,
        Commands::Serve { port } => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "citadel=info".into()),
                )
                .init();
            server::serve(port, UpstreamClient::from_env()).await?;
        }
        Commands::Show { id } => show_character(&config, id).await?,
        Commands::Ask {
            question,
            context,
            proxy_url,
        } => {
            ask_once(
                &config,
                &question,
                context.as_deref(),
                proxy_url.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}

async fn run_tui(config: &Config) -> Result<()> {
    let client = CharacterClient::new(config.character_api());
    let endpoint = Arc::new(HttpAskEndpoint::new(config.proxy_url()));
    let mut app = App::new(client, Assistant::new(endpoint));
    app.load_page(1).await;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;
        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event).await?;
        }
    }

    tui::restore()?;
    Ok(())
}

async fn show_character(config: &Config, id: i64) -> Result<()> {
    let client = CharacterClient::new(config.character_api());
    let character = client.get(id).await?;

    println!("\n{}", character.name.bold().green());
    println!("{} - {}", character.status, character.species);
    if !character.kind.is_empty() {
        println!("{} {}", "Type:".dimmed(), character.kind);
    }
    println!("{} {}", "Gender:".dimmed(), character.gender);
    println!("{} {}", "Origin:".dimmed(), character.origin.name);
    println!("{} {}", "Location:".dimmed(), character.location.name);
    println!("{} {}", "Episodes:".dimmed(), character.episode.len());

    Ok(())
}

async fn ask_once(
    config: &Config,
    question: &str,
    context: Option<&str>,
    proxy_url: Option<&str>,
) -> Result<()> {
    let base = proxy_url.unwrap_or_else(|| config.proxy_url());
    let endpoint = Arc::new(HttpAskEndpoint::new(base));
    let mut assistant = Assistant::new(endpoint);

    println!("🐢 Consulting the Truth Tortoise at {}...", base.cyan());

    assistant.submit(question, context);
    assistant.resolve_reply().await;

    if let Some(reply) = assistant
        .conversation()
        .messages()
        .iter()
        .rev()
        .find(|message| message.role == Role::Assistant)
    {
        println!("\n{}", "Truth Tortoise:".bold().green());
        println!("{}", reply.content);
    } else {
        println!("{}", "Nothing to ask.".yellow());
    }

    Ok(())
}
