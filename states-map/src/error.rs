//! Erreurs de l'application, classées par nature

use shpkit::ShpError;
use thiserror::Error;

/// Nature d'une erreur, pour décider de la réaction de l'appelant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Réseau (téléchargement)
    Network,
    /// Données invalides (archive, shapefile, point hors des états)
    Validation,
    /// Outil externe (shp2pgsql, navigateur, encodeur d'image)
    ExternalTool,
    /// Base de données ou fichiers locaux
    Persistence,
    /// Saisie utilisateur mal formée
    Input,
}

/// Erreur de l'application
#[derive(Debug, Error)]
pub enum AppError {
    #[error("network error: {0}")]
    Network(#[source] ShpError),

    #[error("{0}")]
    Shapefile(#[source] ShpError),

    #[error("{0}")]
    Validation(String),

    #[error("{tool}: {reason}")]
    ExternalTool { tool: String, reason: String },

    #[error("database error: {}", pg_message(.0))]
    Database(#[from] tokio_postgres::Error),

    #[error("database pool error: {}", pool_message(.0))]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Input(String),
}

impl AppError {
    /// Nature de l'erreur
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Shapefile(_) | Self::Validation(_) => ErrorKind::Validation,
            Self::ExternalTool { .. } => ErrorKind::ExternalTool,
            Self::Database(_) | Self::Pool(_) | Self::Io(_) => ErrorKind::Persistence,
            Self::Input(_) => ErrorKind::Input,
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn input(reason: impl Into<String>) -> Self {
        Self::Input(reason.into())
    }

    pub fn external(tool: impl Into<String>, reason: impl ToString) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<ShpError> for AppError {
    fn from(err: ShpError) -> Self {
        match err {
            ShpError::Io(io) => Self::Io(io),
            e if e.is_network() => Self::Network(e),
            e => Self::Shapefile(e),
        }
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// Message du serveur PostgreSQL s'il y en a un, sinon la chaîne des causes
///
/// L'affichage de `tokio_postgres::Error` se limite à « db error ».
fn pg_message(error: &tokio_postgres::Error) -> String {
    match error.as_db_error() {
        Some(db) => db.message().to_string(),
        None => error_chain(error),
    }
}

fn pool_message(error: &deadpool_postgres::PoolError) -> String {
    match error {
        deadpool_postgres::PoolError::Backend(e) => pg_message(e),
        other => error_chain(other),
    }
}

/// Message d'une erreur suivi de ses causes (sans répétition)
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
