use std::{fmt, path::PathBuf};

use api_types::backup::ImportMode;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "savena")]
#[command(about = "Personal finance ledger with wallet sync across devices")]
pub struct Cli {
    /// Configuration file (TOML), extension optional.
    #[arg(long, default_value = "settings")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the configured wallet store and/or device daemon (default).
    Run(RunArgs),
    Wallet(Wallet),
    Backup(Backup),
}

#[derive(Args, Default)]
pub struct RunArgs {
    /// Unlock the configured wallet on startup.
    #[arg(long, env = "SAVENA_WALLET_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl fmt::Debug for RunArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunArgs")
            .field("password", &self.password.as_ref().map(|_| "**"))
            .finish()
    }
}

#[derive(Args)]
pub struct Password {
    #[arg(long, env = "SAVENA_WALLET_PASSWORD", hide_env_values = true)]
    pub password: String,
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(**)")
    }
}

#[derive(Args, Debug)]
pub struct Wallet {
    #[command(subcommand)]
    pub command: WalletCommand,
}

#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    /// Publish this device's ledger as a new wallet.
    Create(Password),
    /// Replace this device's ledger with an existing wallet.
    Join {
        wallet_id: String,
        #[command(flatten)]
        password: Password,
    },
    /// Check the password and run one sync cycle.
    Unlock(Password),
    Status,
    /// Forget the wallet on this device.
    Disconnect,
    /// Delete the wallet from the store for every device.
    Delete(Password),
}

#[derive(Args, Debug)]
pub struct Backup {
    #[command(subcommand)]
    pub command: BackupCommand,
}

#[derive(Subcommand, Debug)]
pub enum BackupCommand {
    Export {
        /// Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Import {
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Merge)]
        mode: Mode,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Replace,
    Merge,
}

impl From<Mode> for ImportMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Replace => ImportMode::Replace,
            Mode::Merge => ImportMode::Merge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["savena"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, "settings");
    }

    #[test]
    fn parses_wallet_join() {
        let cli = Cli::try_parse_from([
            "savena",
            "--config",
            "device.toml",
            "wallet",
            "join",
            "wallet_abc",
            "--password",
            "pw",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Wallet(Wallet {
                command: WalletCommand::Join {
                    wallet_id,
                    password,
                },
            })) => {
                assert_eq!(wallet_id, "wallet_abc");
                assert_eq!(password.password, "pw");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn import_defaults_to_merge() {
        let cli = Cli::try_parse_from(["savena", "backup", "import", "ledger.json"]).unwrap();
        match cli.command {
            Some(Command::Backup(Backup {
                command: BackupCommand::Import { mode, .. },
            })) => assert_eq!(ImportMode::from(mode), ImportMode::Merge),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
