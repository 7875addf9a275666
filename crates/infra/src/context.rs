//! Application context - dependency injection container
//!
//! Opens the database described by [`Config`], ensures the schema and wires
//! the SQLite repositories into the core services.

use std::sync::Arc;

use minetally_common::storage::HealthStatus;
use minetally_core::{FactorService, ReconciliationService, ValidationService};
use minetally_domain::{Config, Result};
use tracing::info;

use crate::database::{
    DbManager, SqliteFactorRepository, SqliteReconciliationRepository, SqliteShiftRepository,
};

/// Holds the configuration, the database and every service.
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub validation: Arc<ValidationService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub factors: Arc<FactorService>,
}

impl AppContext {
    /// Validate `config`, open its database and build the services.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;

        Ok(Self::with_db(config, db))
    }

    /// Build the services over an already-migrated database.
    pub fn with_db(config: Config, db: Arc<DbManager>) -> Self {
        let validation = ValidationService::new(Arc::new(SqliteShiftRepository::new(db.clone())));
        let reconciliation = ReconciliationService::with_config(
            Arc::new(SqliteReconciliationRepository::new(db.clone())),
            config.reconciliation.clone(),
        );
        let factors = FactorService::with_config(
            Arc::new(SqliteFactorRepository::new(db.clone())),
            config.solver.clone(),
        );

        info!(db_path = %db.path().display(), "application context ready");

        Self {
            config,
            db,
            validation: Arc::new(validation),
            reconciliation: Arc::new(reconciliation),
            factors: Arc::new(factors),
        }
    }

    pub fn health_check(&self) -> Result<HealthStatus> {
        self.db.health_check()
    }
}
