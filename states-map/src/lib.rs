//! # states-map
//!
//! Chargement des états des U.S.A. dans PostGIS et carte des favoris.
//!
//! ## Features
//!
//! - Téléchargement, extraction et validation du shapefile des états
//! - Reprojection en WGS84 et chargement avec `shp2pgsql`
//! - Favoris validés (troncature à 4 décimales, point dans un état)
//! - Carte web Leaflet capturée par WebDriver, ou carte statique Lambert
//! - Dialogue interactif en mode texte (`q` pour quitter)
//!
//! ## Usage CLI
//!
//! ```bash
//! # Carte web (navigateur piloté par chromedriver sur :4444)
//! states-map --work-dir ./data
//!
//! # Carte statique
//! states-map --renderer plot --work-dir ./data
//! ```

pub mod bookmark;
pub mod config;
pub mod console;
pub mod db;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod render;

pub use bookmark::{normalize_coordinate, normalize_point, Bookmark, NewBookmark, SizeClass};
pub use config::{AppConfig, Browser, RendererKind, Settings};
pub use db::{create_pool, Database, DatabaseConfig};
pub use driver::Driver;
pub use error::{AppError, ErrorKind, Result};
pub use pipeline::Pipeline;
pub use render::{MapRenderer, MarkerLayer, PlotRenderer, WebMapRenderer};
