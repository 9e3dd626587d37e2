use std::{fs, net::SocketAddr};

use api_types::backup::Backup;
use clap::Parser;

use cli::{BackupCommand, Cli, Command, RunArgs, WalletCommand};
use device::Device;
use error::{AppError, Result};
use settings::Settings;

mod cli;
mod device;
mod error;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "savena={level},server={level},engine={level},wallet_sync={level}",
            level = settings.app.level
        ))
        .init();

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => run(settings, args).await,
        Command::Wallet(wallet) => wallet_command(settings, wallet.command).await,
        Command::Backup(backup) => backup_command(settings, backup.command).await,
    }
}

async fn run(settings: Settings, args: RunArgs) -> Result<()> {
    if settings.server.is_none() && settings.device.is_none() {
        return Err(AppError::NothingToRun);
    }
    let mut tasks = tokio::task::JoinSet::new();

    if let Some(server) = settings.server {
        tasks.spawn(async move {
            tracing::info!("Found server settings...");
            let db = match device::open_database(&server.database).await {
                Ok(db) => db,
                Err(err) => {
                    tracing::error!("failed to initialize database: {err}");
                    return;
                }
            };
            let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
            let addr: SocketAddr = match format!("{}:{}", bind, server.port).parse() {
                Ok(addr) => addr,
                Err(err) => {
                    tracing::error!("invalid server address: {err}");
                    return;
                }
            };
            server::run(db, addr).await;
        });
    }

    if let Some(device) = settings.device {
        tasks.spawn(async move {
            tracing::info!("Found device settings...");
            let result = match Device::open(&device).await {
                Ok(device) => device.run(args.password).await,
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                tracing::error!("device failed: {err}");
            }
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn open_device(settings: Settings) -> Result<Device> {
    let device = settings.device.ok_or(AppError::MissingSection("device"))?;
    Device::open(&device).await
}

async fn wallet_command(settings: Settings, command: WalletCommand) -> Result<()> {
    let device = open_device(settings).await?;
    let sync = &device.sync;

    match command {
        WalletCommand::Create(password) => {
            let wallet_id = sync.create_wallet(&password.password).await?;
            println!("created wallet {wallet_id}");
        }
        WalletCommand::Join {
            wallet_id,
            password,
        } => {
            let wallet_id = sync.join_wallet(&wallet_id, &password.password).await?;
            println!("joined wallet {wallet_id}");
        }
        WalletCommand::Unlock(password) => {
            sync.unlock(&password.password).await?;
            println!("wallet unlocked");
        }
        WalletCommand::Status => match sync.settings() {
            Some(settings) => println!("{}", serde_json::to_string_pretty(&settings)?),
            None => println!("sync is not configured"),
        },
        WalletCommand::Disconnect => {
            sync.disconnect().await?;
            println!("disconnected");
        }
        WalletCommand::Delete(password) => {
            sync.unlock(&password.password).await?;
            sync.delete_wallet().await?;
            println!("wallet deleted");
        }
    }

    sync.shutdown();
    Ok(())
}

async fn backup_command(settings: Settings, command: BackupCommand) -> Result<()> {
    let device = open_device(settings).await?;

    match command {
        BackupCommand::Export { output } => {
            let backup = device.ledger.export_backup().await?;
            let payload = serde_json::to_string_pretty(&backup)?;
            match output {
                Some(path) => fs::write(path, payload)?,
                None => println!("{payload}"),
            }
        }
        BackupCommand::Import { input, mode } => {
            let backup: Backup = serde_json::from_str(&fs::read_to_string(input)?)?;
            let records = device.ledger.import_backup(&backup, mode.into()).await?;
            println!("imported {records} records");
        }
    }

    device.sync.shutdown();
    Ok(())
}
