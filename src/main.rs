use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskchat::{
    app::Client,
    cli::{BIN_NAME, Cli, ClientArgs, Command, ServeArgs},
    client::create_transport,
    error::{ServiceError, ServiceResult},
    metadata::{PKG_NAME, PKG_VERSION},
    server,
    session::SessionStore,
    shell::{self, render_messages, render_tasks},
    store::{FileStore, StoreHandle},
    sync::TaskMode,
};

#[tokio::main]
async fn main() -> ServiceResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let args = cli.client;

    match cli.command {
        Command::Version => {
            println!("{PKG_NAME} {PKG_VERSION}");
            Ok(())
        }
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Whoami => {
            match SessionStore::new(open_store(&args)?).get() {
                Some(name) => println!("{name}"),
                None => println!("Not logged in"),
            }
            Ok(())
        }
        Command::Login { name } => {
            let mut client = open_client(&args)?;
            if !client.login(&name) {
                return Err(ServiceError::FromString("Name cannot be blank".into()));
            }
            client.settle().await;
            println!("Logged in as {name}");
            Ok(())
        }
        Command::Logout => {
            open_client(&args)?.logout();
            println!("Logged out");
            Ok(())
        }
        Command::Tasks => {
            let client = session_client(&args).await?;
            println!("{}", render_tasks(client.tasks()));
            Ok(())
        }
        Command::Add { text } => {
            let mut client = session_client(&args).await?;
            let mut input = text.join(" ");
            if !client.add_task(&mut input) {
                return Err(ServiceError::FromString("Task text cannot be blank".into()));
            }
            client.settle().await;
            println!("{}", render_tasks(client.tasks()));
            Ok(())
        }
        Command::Toggle { id } => {
            let mut client = session_client(&args).await?;
            if !client.toggle_task(id) {
                return Err(ServiceError::FromString(format!("No task with id {id}")));
            }
            if client.task_mode() == TaskMode::Remote {
                tracing::warn!("The server has no update endpoint; this toggle is not saved");
            }
            println!("{}", render_tasks(client.tasks()));
            Ok(())
        }
        Command::Remove { id } => {
            let mut client = session_client(&args).await?;
            if !client.remove_task(id) {
                return Err(ServiceError::FromString(format!("No task with id {id}")));
            }
            if client.task_mode() == TaskMode::Remote {
                tracing::warn!("The server has no task delete endpoint; this removal is not saved");
            }
            println!("{}", render_tasks(client.tasks()));
            Ok(())
        }
        Command::Messages => {
            let client = session_client(&args).await?;
            println!("{}", render_messages(client.messages()));
            Ok(())
        }
        Command::Post { text } => {
            let mut client = session_client(&args).await?;
            let mut input = text.join(" ");
            if !client.send_message(&mut input) {
                return Err(ServiceError::FromString("Message cannot be blank".into()));
            }
            client.settle().await;
            println!("{}", render_messages(client.messages()));
            Ok(())
        }
        Command::Unsend { id } => {
            let mut client = session_client(&args).await?;
            client.delete_message(id);
            client.settle().await;
            println!("{}", render_messages(client.messages()));
            Ok(())
        }
        Command::Shell => {
            let mut client = open_client(&args)?;
            shell::run(&mut client)
        }
    }
}

async fn serve(args: ServeArgs) -> ServiceResult<()> {
    let addr = args.socket_addr().map_err(ServiceError::Config)?;
    let shutdown = CancellationToken::new();

    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        on_signal.cancel();
    });

    server::run(addr, shutdown).await
}

fn open_store(args: &ClientArgs) -> ServiceResult<StoreHandle> {
    args.validate().map_err(ServiceError::Config)?;
    let dir = args
        .resolved_data_dir()
        .ok_or_else(|| ServiceError::Config("No data directory available".into()))?;
    let store = FileStore::open(&dir)?;
    tracing::debug!(path = %store.path().display(), "Opened local store");
    Ok(StoreHandle::new(store))
}

fn open_client(args: &ClientArgs) -> ServiceResult<Client> {
    let store = open_store(args)?;
    let transport = Arc::new(create_transport(&args.api_url));
    Ok(Client::new(transport, store, args.task_mode))
}

/// A client with a restored session and both lists loaded.
async fn session_client(args: &ClientArgs) -> ServiceResult<Client> {
    let mut client = open_client(args)?;
    if !client.restore() {
        return Err(ServiceError::FromString(format!(
            "Not logged in; run `{BIN_NAME} login <name>` first"
        )));
    }
    client.settle().await;
    Ok(client)
}
