//! # vendo-service: Cart and Sale Workflows
//!
//! Drives the vendo-core aggregates through narrow storage ports.
//!
//! ## Module Organization
//! ```text
//! vendo_service/
//! ├── lib.rs           ◄─── You are here (wiring)
//! ├── ports.rs         ◄─── Port traits + StoreError
//! ├── store.rs         ◄─── SQLite adapters for every store port
//! ├── cart_service.rs  ◄─── Add / re-price / cancel cart lines
//! ├── sale_service.rs  ◄─── Cart → Sale conversion, sale cancellation
//! ├── events.rs        ◄─── Channel, outbox and fanout announcers
//! ├── number.rs        ◄─── Receipt-style sale numbers
//! ├── locks.rs         ◄─── Per-user async locks
//! ├── config.rs        ◄─── TOML + environment configuration
//! ├── telemetry.rs     ◄─── tracing-subscriber setup
//! └── error.rs         ◄─── ServiceError and caller-facing error codes
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use vendo_service::{ServiceConfig, Vendo};
//!
//! let config = ServiceConfig::load(None)?;
//! let (vendo, mut events) = Vendo::open(&config).await?;
//!
//! let cart = vendo.carts.add_item(user_id, product_id, 5).await?;
//! let outcome = vendo.sales.convert_cart(cart.id, branch_id).await?;
//! ```

pub mod cart_service;
pub mod config;
pub mod error;
pub mod events;
pub mod locks;
pub mod number;
pub mod ports;
pub mod sale_service;
pub mod store;
pub mod telemetry;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use vendo_core::SaleEvent;
use vendo_db::Database;

pub use cart_service::CartService;
pub use config::{ConfigError, ServiceConfig};
pub use error::{ErrorCode, ErrorResponse, ServiceError, ServiceResult};
pub use events::{ChannelAnnouncer, FanoutAnnouncer, OutboxAnnouncer, OutboxRelay, RelayReport};
pub use locks::UserLocks;
pub use number::ReceiptNumberGenerator;
pub use ports::{StoreError, StoreResult};
pub use sale_service::{SaleOutcome, SaleService};
pub use store::SqliteStore;

/// Fully wired services over one database.
pub struct Vendo {
    pub db: Database,
    pub carts: CartService,
    pub sales: SaleService,
}

impl Vendo {
    /// Wires both services over `db`.
    ///
    /// Events go to a bounded channel whose receiver is returned, and to the
    /// outbox table when `[events] outbox_enabled` is set.
    pub fn new(
        db: Database,
        config: &ServiceConfig,
    ) -> ServiceResult<(Self, mpsc::Receiver<SaleEvent>)> {
        let store = Arc::new(SqliteStore::new(db.clone()));
        let locks = Arc::new(UserLocks::new());
        let numbers = Arc::new(ReceiptNumberGenerator::new(
            config.sales.number_prefix.clone(),
        )?);

        let (channel, rx) = ChannelAnnouncer::new(config.events.channel_capacity);
        let mut announcer = FanoutAnnouncer::new().with(Arc::new(channel));
        if config.events.outbox_enabled {
            announcer = announcer.with(Arc::new(OutboxAnnouncer::new(db.outbox())));
        }

        let carts = CartService::new(store.clone(), store.clone(), store.clone(), locks.clone());
        let sales = SaleService::new(
            store.clone(),
            store.clone(),
            store,
            numbers,
            Arc::new(announcer),
            locks,
        );

        Ok((Vendo { db, carts, sales }, rx))
    }

    /// Connects to the configured database, then wires the services.
    pub async fn open(config: &ServiceConfig) -> ServiceResult<(Self, mpsc::Receiver<SaleEvent>)> {
        let db = Database::new(config.db_config())
            .await
            .map_err(StoreError::from)?;
        info!(path = %config.database.path.display(), "Vendo services ready");
        Self::new(db, config)
    }
}

// =============================================================================
// Test Support
// =============================================================================
