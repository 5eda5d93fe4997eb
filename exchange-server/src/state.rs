//! Application state

use std::sync::Arc;

use exchange_client::ClientConfig;

use crate::config::{Config, ConfigError, LedgerMode, StorageBackend};
use crate::error::StartupError;
use crate::services::{OrderService, WalletService};
use crate::settlement::SettlementSaga;
use crate::store::{
    LedgerStore, MemoryStore, OrderRepository, PgStore, RemoteLedger, WalletRepository,
};

type Stores = (
    Arc<dyn LedgerStore>,
    Arc<dyn WalletRepository>,
    Arc<dyn OrderRepository>,
);

/// One backend serving all three repositories
fn shared_stores<S>(store: Arc<S>) -> Stores
where
    S: LedgerStore + WalletRepository + OrderRepository + 'static,
{
    (store.clone(), store.clone(), store)
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub wallets: Arc<WalletService>,
    pub orders: Arc<OrderService>,
}

impl AppState {
    /// Build storage backends and services from configuration
    pub async fn new(config: &Config) -> Result<Self, StartupError> {
        let (ledger, wallets, orders) = match config.storage {
            StorageBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?;
                let store = PgStore::connect(url, config.database_max_connections).await?;
                tracing::info!("Connected to PostgreSQL, migrations applied");
                shared_stores(Arc::new(store))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; all data is lost on restart");
                shared_stores(Arc::new(MemoryStore::new()))
            }
        };

        let (ledger, wallets) = match config.ledger_mode {
            LedgerMode::Local => (ledger, wallets),
            LedgerMode::Remote => {
                let base_url = config
                    .ledger_url
                    .as_deref()
                    .ok_or(ConfigError::Missing("LEDGER_URL"))?;
                let client = ClientConfig::new(base_url)
                    .with_timeout(config.ledger_timeout_secs)
                    .build()?;
                let remote = Arc::new(RemoteLedger::new(client));
                let ledger: Arc<dyn LedgerStore> = remote.clone();
                let wallets: Arc<dyn WalletRepository> = remote;
                (ledger, wallets)
            }
        };

        Ok(Self::from_stores(ledger, wallets, orders, config))
    }

    /// Wire services over already-built stores
    pub fn from_stores(
        ledger: Arc<dyn LedgerStore>,
        wallets: Arc<dyn WalletRepository>,
        orders: Arc<dyn OrderRepository>,
        config: &Config,
    ) -> Self {
        let saga = SettlementSaga::new(
            ledger.clone(),
            wallets.clone(),
            orders.clone(),
            config.storage_timeout,
        );
        Self {
            wallets: Arc::new(WalletService::new(
                ledger,
                wallets.clone(),
                config.base_currency.clone(),
            )),
            orders: Arc::new(OrderService::new(orders, wallets, saga)),
        }
    }
}
