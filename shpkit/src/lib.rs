//! # shpkit
//!
//! Téléchargement, validation et reprojection d'archives de shapefiles ESRI.
//!
//! ## Features
//!
//! - Téléchargement HTTP en streaming (`reqwest`) avec checksum blake3
//! - Extraction zip
//! - Validation : fichiers .shp/.shx/.dbf, un seul shapefile, type polygone
//! - Détection de l'EPSG depuis le .prj
//! - Reprojection PROJ (feature `reproject`) et réécriture du shapefile
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shpkit::{archive, validate, reproject_vector, save_vector};
//!
//! let downloaded = archive::download_zip(url, &work_dir).await?;
//! let folder = archive::unzip(&downloaded.path())?;
//! let name = validate::check_shapefile(&folder)?;
//! let shp = folder.join(&name);
//!
//! if shpkit::detect_epsg(&shp)? != Some(4326) {
//!     let dataset = reproject_vector(&shp, None, Some(4326))?;
//!     save_vector(&dataset, &shp)?;
//! }
//! ```

pub mod archive;
pub mod dataset;
pub mod error;
pub mod prj;
pub mod reproject;
pub mod validate;

pub use archive::DownloadedArchive;
pub use dataset::{save_vector, PolygonShape, VectorDataset, VectorFeature};
pub use error::ShpError;
pub use prj::detect_epsg;
pub use reproject::{reproject_vector, Reprojector, SourceSrs};
pub use validate::check_shapefile;

/// Référence géographique cible (WGS84 lon/lat)
pub const WGS84: u32 = 4326;

/// Vérifie si la reprojection est disponible
pub fn reprojection_available() -> bool {
    cfg!(feature = "reproject")
}
