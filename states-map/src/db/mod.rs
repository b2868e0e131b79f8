//! Accès PostGIS : tables des états et des favoris

pub mod bookmarks;
pub mod loader;
pub mod pool;
pub mod states;

use deadpool_postgres::Pool;

use crate::config::{BOOKMARKS_TABLE, STATES_TABLE};
pub use pool::{create_pool, DatabaseConfig, SslMode};

/// Base de données de l'application (pool + schéma)
#[derive(Clone)]
pub struct Database {
    pool: Pool,
    schema: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("schema", &self.schema)
            .field("pool", &self.pool.status())
            .finish()
    }
}

impl Database {
    /// Le schéma doit être un identifiant SQL simple (voir `AppConfig::validate`)
    pub fn new(pool: Pool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Nom qualifié de la table des états
    pub fn states_table(&self) -> String {
        format!("{}.{}", self.schema, STATES_TABLE)
    }

    /// Nom qualifié de la table des favoris
    pub fn bookmarks_table(&self) -> String {
        format!("{}.{}", self.schema, BOOKMARKS_TABLE)
    }
}
