//! Configuration de l'application
//!
//! - `AppConfig` : dossier de travail, URL source, schéma, outils externes
//! - `Settings` : style de la carte (preset JSON embarqué ou fichier)

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// URL par défaut de l'archive des états (Census 2016, 1:20 000 000)
pub const DEFAULT_SOURCE_URL: &str =
    "http://www2.census.gov/geo/tiger/GENZ2016/shp/cb_2016_us_state_20m.zip";

/// Schéma PostgreSQL par défaut
pub const DEFAULT_SCHEMA: &str = "exercise";

/// Table des états
pub const STATES_TABLE: &str = "states";

/// Table des favoris
pub const BOOKMARKS_TABLE: &str = "bookmarks";

/// Navigateur piloté par WebDriver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
    Edge,
}

impl Browser {
    /// Nom WebDriver (`browserName`)
    pub fn webdriver_name(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Edge => "MicrosoftEdge",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chrome" => Ok(Browser::Chrome),
            "firefox" => Ok(Browser::Firefox),
            "edge" => Ok(Browser::Edge),
            _ => Err(format!("driver {} is not supported. Use: chrome, firefox, edge", s)),
        }
    }
}

/// Rendu de la carte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RendererKind {
    /// Carte web Leaflet capturée par un navigateur
    #[default]
    Web,
    /// Image statique en projection conique conforme de Lambert
    Plot,
}

impl std::str::FromStr for RendererKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "web" => Ok(RendererKind::Web),
            "plot" | "static" => Ok(RendererKind::Plot),
            _ => Err(format!("Invalid renderer: {}. Use: web, plot", s)),
        }
    }
}

/// Configuration de l'application
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Dossier de téléchargement et des images produites
    pub work_dir: PathBuf,

    /// URL de l'archive zip des états
    pub source_url: String,

    /// Schéma PostgreSQL des tables `states` et `bookmarks`
    pub schema: String,

    /// Dossier `bin` de PostgreSQL (sinon `shp2pgsql` est cherché dans le PATH)
    pub pg_bin: Option<PathBuf>,

    pub browser: Browser,

    /// Point d'accès WebDriver (chromedriver, geckodriver, msedgedriver)
    pub webdriver_url: String,

    pub renderer: RendererKind,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            source_url: DEFAULT_SOURCE_URL.into(),
            schema: DEFAULT_SCHEMA.into(),
            pg_bin: None,
            browser: Browser::default(),
            webdriver_url: "http://localhost:4444".into(),
            renderer: RendererKind::default(),
        }
    }
}

impl AppConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("STATES_MAP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            source_url: std::env::var("STATES_MAP_URL").unwrap_or(defaults.source_url),
            schema: std::env::var("STATES_MAP_SCHEMA").unwrap_or(defaults.schema),
            pg_bin: std::env::var("STATES_MAP_PG_BIN").ok().map(PathBuf::from),
            browser: std::env::var("STATES_MAP_BROWSER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.browser),
            webdriver_url: std::env::var("STATES_MAP_WEBDRIVER")
                .unwrap_or(defaults.webdriver_url),
            renderer: std::env::var("STATES_MAP_RENDERER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.renderer),
        }
    }

    /// Vérifie la configuration (nom de schéma utilisable tel quel en SQL)
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.schema) {
            anyhow::bail!("Invalid schema name: {}", self.schema);
        }
        Ok(())
    }

    /// Chemin de l'exécutable `shp2pgsql`
    pub fn shp2pgsql(&self) -> PathBuf {
        let exe = if cfg!(windows) { "shp2pgsql.exe" } else { "shp2pgsql" };
        match &self.pg_bin {
            Some(bin) => bin.join(exe),
            None => PathBuf::from(exe),
        }
    }
}

/// Identifiant SQL simple (pas de guillemets nécessaires)
pub fn is_identifier(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid regex"))
        .is_match(name)
}

/// Style des marqueurs (icône Font Awesome)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarkerStyle {
    pub icon: String,
    pub color: String,
}

/// Style de la couche des états
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LayerStyle {
    pub fill_color: String,
    pub fill_opacity: f64,
    pub color: String,
    pub opacity: f64,
}

/// Réglages de la carte
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub marker: MarkerStyle,

    /// Fond de carte : nom de fournisseur ou gabarit d'URL `{z}/{x}/{y}`
    pub tiles: String,

    /// Centre de la vue [lat, lon]
    pub center: [f64; 2],

    pub zoom: u8,

    pub states_style: LayerStyle,
}

/// Fond de carte résolu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub url: String,
    pub attribution: String,
}

const CARTO_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>";
const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";
const STAMEN_ATTRIBUTION: &str = "&copy; <a href=\"https://stadiamaps.com/\">Stadia Maps</a> &copy; <a href=\"https://stamen.com/\">Stamen Design</a> &copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

impl Settings {
    /// Charge des réglages depuis un fichier JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read settings file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse settings JSON")
    }

    /// Réglages embarqués par défaut
    pub fn embedded() -> Result<Self> {
        serde_json::from_str(include_str!("presets/default.json"))
            .context("Failed to parse embedded settings")
    }

    /// Résout le fond de carte
    pub fn tile_layer(&self) -> Result<TileLayer> {
        let (url, attribution) = match self.tiles.to_lowercase().as_str() {
            "openstreetmap" => (
                "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
                OSM_ATTRIBUTION,
            ),
            "cartodb positron" => (
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
                CARTO_ATTRIBUTION,
            ),
            "cartodb dark_matter" => (
                "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png",
                CARTO_ATTRIBUTION,
            ),
            "stamen terrain" => (
                "https://tiles.stadiamaps.com/tiles/stamen_terrain/{z}/{x}/{y}.png",
                STAMEN_ATTRIBUTION,
            ),
            "stamen toner" => (
                "https://tiles.stadiamaps.com/tiles/stamen_toner/{z}/{x}/{y}.png",
                STAMEN_ATTRIBUTION,
            ),
            "stamen watercolor" => (
                "https://tiles.stadiamaps.com/tiles/stamen_watercolor/{z}/{x}/{y}.jpg",
                STAMEN_ATTRIBUTION,
            ),
            _ if self.tiles.contains("{z}") => (self.tiles.as_str(), ""),
            _ => anyhow::bail!(
                "Unknown tiles: {}. Use: OpenStreetMap, CartoDB positron, CartoDB dark_matter, \
                 Stamen Terrain, Stamen Toner, Stamen Watercolor or a {{z}}/{{x}}/{{y}} URL",
                self.tiles
            ),
        };

        Ok(TileLayer {
            url: url.to_string(),
            attribution: attribution.to_string(),
        })
    }
}
