//! Types d'erreurs pour le crate shpkit

use std::path::PathBuf;

use thiserror::Error;

/// Erreurs pouvant survenir lors du téléchargement, de la validation
/// ou de la reprojection d'un shapefile
#[derive(Debug, Error)]
pub enum ShpError {
    /// Erreur d'I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur réseau pendant le téléchargement
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    /// URL sans nom de fichier exploitable
    #[error("cannot derive a file name from url '{0}'")]
    InvalidUrl(String),

    /// Archive zip corrompue ou illisible
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Entrée de l'archive avec un chemin dangereux (../, absolu)
    #[error("unsafe path in zip archive: {0}")]
    UnsafeEntry(String),

    /// Fichiers obligatoires absents
    #[error("A shapefile should contain {{shp, shx, dbf}}, missing: {}", .0.join(", "))]
    MissingFiles(Vec<String>),

    /// Plus d'un .shp dans le dossier
    #[error("zip file should contain only 1 shapefile, found {0}")]
    MultipleShapefiles(usize),

    /// Aucun .shp dans le dossier
    #[error("no shapefile found in {0}")]
    NoShapefile(PathBuf),

    /// Le .shp ne contient aucun enregistrement
    #[error("shapefile {0} contains no shape")]
    EmptyShapefile(PathBuf),

    /// Type de géométrie non polygonal
    #[error("shapefile should be polygon (shape type {0})")]
    NotPolygon(i32),

    /// Fichier .prj absent
    #[error("no spatial reference (.prj) next to {0}")]
    MissingProjection(PathBuf),

    /// Référence cible non fournie
    #[error("please, specify the output EPSG code")]
    MissingTargetSrs,

    /// Erreur PROJ (création ou transformation)
    #[error("reprojection failed: {0}")]
    Projection(String),

    /// Erreur de lecture/écriture du shapefile
    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),
}

impl ShpError {
    /// Indique si l'erreur vient du réseau
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    /// Crée une erreur de projection
    pub fn projection(reason: impl Into<String>) -> Self {
        Self::Projection(reason.into())
    }
}
