//! One device: its ledger, the recurring processor and the sync service.

use std::{sync::Arc, time::Duration};

use config::ConfigError;
use engine::{ChangeReceiver, Engine, RecurringProcessor};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use wallet_sync::{HttpWalletRemote, SyncEngine};

use crate::{
    error::{AppError, Result},
    settings,
};

pub async fn open_database(config: &settings::Database) -> Result<DatabaseConnection> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

pub struct Device {
    pub ledger: Arc<Engine>,
    pub sync: Arc<SyncEngine>,
    changes: Option<ChangeReceiver>,
    recurring_interval: Duration,
}

impl Device {
    pub async fn open(settings: &settings::Device) -> Result<Self> {
        if settings.recurring_interval_secs == 0 {
            return Err(AppError::Config(ConfigError::Message(
                "device.recurring_interval_secs must be positive".to_string(),
            )));
        }

        let db = open_database(&settings.database).await?;
        let (sender, receiver) = engine::changes::channel();
        let ledger = Arc::new(
            Engine::builder()
                .database(db)
                .changes(sender)
                .build()
                .await?,
        );
        let remote = HttpWalletRemote::new(&settings.remote_url)?;
        let sync = SyncEngine::builder()
            .store(ledger.clone())
            .remote(Arc::new(remote))
            .settings_path(&settings.settings_path)
            .interval(Duration::from_secs(settings.sync_interval_secs))
            .build()?;
        sync.initialize().await?;

        Ok(Self {
            ledger,
            sync,
            changes: Some(receiver),
            recurring_interval: Duration::from_secs(settings.recurring_interval_secs),
        })
    }

    /// Process recurring rules and keep the wallet in sync until ctrl-c.
    pub async fn run(mut self, password: Option<String>) -> Result<()> {
        let processor = RecurringProcessor::new(self.ledger.clone());
        processor.start(self.recurring_interval);
        let listener = self
            .changes
            .take()
            .map(|changes| self.sync.spawn_change_listener(changes));

        if let Some(password) = password {
            if let Err(err) = self.sync.unlock(&password).await {
                tracing::error!("could not unlock the wallet: {err}");
            }
        } else if self.sync.settings().is_some() {
            tracing::warn!("wallet configured but no password given, sync stays paused");
        }

        tokio::signal::ctrl_c().await?;
        tracing::info!("shutting down device");
        processor.stop();
        self.sync.shutdown();
        if let Some(listener) = listener {
            listener.abort();
        }
        Ok(())
    }
}
