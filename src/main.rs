use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use log::{debug, error, info, warn};
use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::Message;
use tokio::sync::Mutex;
use uuid::Uuid;

mod accounts;
mod engine;
mod helpers;
mod message_handlers;
mod mysql_store;
mod sessions;
mod sqlite_store;
mod store;
mod web;

use accounts::AccountError;
use engine::{CommandError, ItemList, ListedItem};
use helpers::*;
use message_handlers::*;
use mysql_store::MysqlStore;
use sessions::*;
use sqlite_store::SqliteStore;
use store::*;


const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:4000";
const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Deserialize, Clone)]
struct Config {
    database_url: String,
    telegram_token: Option<String>,
    listen_addr: Option<String>,
    bcrypt_cost: Option<u32>,
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web interface and, when a token is configured, the Telegram bot.
    Serve,
    /// Create the users and items tables, then exit.
    InitDb,
    /// Create a chat-only account and print its auth token.
    AddAccount {
        username: String,
        #[arg(long)]
        telegram_id: Option<String>,
    },
}

struct AppState {
    config: Config,
    store: Arc<dyn Store>,
    sessions: Sessions,
}

impl AppState {
    fn bcrypt_cost(&self) -> u32 {
        self.config.bcrypt_cost.unwrap_or(DEFAULT_BCRYPT_COST)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args.config)?;

    let store = connect_store(&config.database_url).await?;
    store.init_schema().await.context("create schema")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, store).await,
        Command::InitDb => {
            info!("schema ready at {}", config.database_url);
            Ok(())
        }
        Command::AddAccount {
            username,
            telegram_id,
        } => {
            let account = accounts::provision(store.as_ref(), &username, telegram_id.as_deref())
                .await
                .context("create account")?;
            println!("{}", account.auth_token);
            Ok(())
        }
    }
}

async fn serve(config: Config, store: Arc<dyn Store>) -> Result<()> {
    let listen_addr = config
        .listen_addr
        .clone()
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
    let telegram_token = config.telegram_token.clone();

    let state = Arc::new(AppState {
        config,
        store,
        sessions: Sessions::in_memory(),
    });

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("bind {}", listen_addr))?;
    info!("web interface listening on http://{}", listen_addr);
    let web_server = tokio::spawn(web::serve(listener, state.clone()));

    match telegram_token {
        Some(token) => {
            info!("starting telegram bot");
            let bot = Bot::new(token);
            let handler = dptree::entry().branch(Update::filter_message().endpoint(handle_message));

            Dispatcher::builder(bot, handler)
                .dependencies(dptree::deps![state])
                .enable_ctrlc_handler()
                .build()
                .dispatch()
                .await;
        }
        None => warn!("telegram_token not set, chat bot disabled"),
    }

    web_server.await.context("join web server")?
}

fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let config: Config = toml::from_str(&contents).context("parse config")?;
    Ok(config)
}
