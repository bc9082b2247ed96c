use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::metadata::{DEFAULT_API_URL, PKG_DESCRIPTION, PKG_VERSION};
use crate::sync::TaskMode;
use crate::types::EntityId;

pub const BIN_NAME: &str = "taskchat";

#[derive(Parser, Debug, Clone)]
#[command(name = BIN_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub client: ClientArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the task/chat backend
    Serve(ServeArgs),
    /// Remember a display name and start a session
    Login { name: String },
    /// Forget the current session
    Logout,
    /// Print the current display name
    Whoami,
    /// List tasks
    Tasks,
    /// Add a task
    Add { text: Vec<String> },
    /// Flip a task between done and not done
    Toggle { id: EntityId },
    /// Remove a task
    Remove { id: EntityId },
    /// Show the chat log
    Messages,
    /// Post a chat message
    #[command(name = "send")]
    Post { text: Vec<String> },
    /// Delete a chat message
    Unsend { id: EntityId },
    /// Interactive session
    Shell,
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "TASKCHAT_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: String,
}

impl ServeArgs {
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid TASKCHAT_ADDR '{}': {e}", self.addr))
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Base URL of the task/chat API
    #[arg(long, global = true, env = "TASKCHAT_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Directory holding the local store (defaults to the platform data dir)
    #[arg(long, global = true, env = "TASKCHAT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Where tasks are kept
    #[arg(long, global = true, env = "TASKCHAT_TASK_MODE", value_enum, default_value_t = TaskMode::Remote)]
    pub task_mode: TaskMode,
}

impl ClientArgs {
    pub fn default_settings() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: None,
            task_mode: TaskMode::Remote,
        }
    }

    /// Resolve the store directory, falling back to `<data dir>/taskchat`.
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("taskchat")))
    }

    /// Validate CLI/environment-derived arguments.
    pub fn validate(&self) -> Result<(), String> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!(
                "Invalid TASKCHAT_API_URL '{}': expected an http:// or https:// URL",
                self.api_url
            ));
        }
        match self.resolved_data_dir() {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(()),
            Some(_) => Err("TASKCHAT_DATA_DIR cannot be empty".to_string()),
            None => Err("No data directory available; set TASKCHAT_DATA_DIR".to_string()),
        }
    }
}
