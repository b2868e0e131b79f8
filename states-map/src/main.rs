//! Point d'entrée CLI pour states-map

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use states_map::config::{AppConfig, Browser, RendererKind, Settings};
use states_map::db::{create_pool, Database, DatabaseConfig};
use states_map::render::browser::BrowserSession;
use states_map::{console, Driver, MapRenderer, Pipeline, PlotRenderer, WebMapRenderer};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Charger les états des U.S.A. dans PostGIS et cartographier des favoris
#[derive(Parser)]
#[command(name = "states-map")]
#[command(author, version)]
#[command(about = "Charger les états des U.S.A. dans PostGIS et cartographier des favoris")]
#[command(long_about = "Programme interactif : télécharge le shapefile des états, le charge dans PostGIS puis affiche les favoris saisis sur une carte web (Leaflet) ou statique.\n\nTapez q à n'importe quelle question pour quitter.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long)]
    quiet: bool,

    /// Rendu de la carte : web, plot
    #[arg(long)]
    renderer: Option<RendererKind>,

    /// Dossier de téléchargement et des images
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// URL de l'archive zip des états
    #[arg(long)]
    url: Option<String>,

    /// Navigateur : chrome, firefox, edge
    #[arg(long)]
    browser: Option<Browser>,

    /// Point d'accès WebDriver
    #[arg(long)]
    webdriver: Option<String>,

    /// Ne pas afficher la carte statique à l'écran (rendu plot)
    #[arg(long)]
    no_display: bool,

    /// Fichier JSON de style de la carte (défaut: preset embarqué)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Schéma PostgreSQL
    #[arg(long)]
    schema: Option<String>,

    /// Dossier bin de PostgreSQL contenant shp2pgsql
    #[arg(long)]
    pg_bin: Option<PathBuf>,

    /// PostgreSQL host
    #[arg(long)]
    host: Option<String>,

    /// PostgreSQL port
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL database
    #[arg(long)]
    database: Option<String>,

    /// PostgreSQL user
    #[arg(long)]
    user: Option<String>,

    /// PostgreSQL password
    #[arg(long)]
    password: Option<String>,

    /// SSL mode: disable, prefer, require
    #[arg(long)]
    ssl: Option<String>,
}

impl Cli {
    fn app_config(&self) -> AppConfig {
        let mut config = AppConfig::from_env();
        if let Some(renderer) = self.renderer {
            config.renderer = renderer;
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(url) = &self.url {
            config.source_url = url.clone();
        }
        if let Some(browser) = self.browser {
            config.browser = browser;
        }
        if let Some(webdriver) = &self.webdriver {
            config.webdriver_url = webdriver.clone();
        }
        if let Some(schema) = &self.schema {
            config.schema = schema.clone();
        }
        if let Some(pg_bin) = &self.pg_bin {
            config.pg_bin = Some(pg_bin.clone());
        }
        config
    }

    fn database_config(&self) -> DatabaseConfig {
        let mut config = DatabaseConfig::from_env();
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = &self.database {
            config.dbname = database.clone();
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(mode) = self.ssl.as_deref().and_then(|s| s.parse().ok()) {
            config.ssl_mode = mode;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let config = cli.app_config();
    config.validate()?;

    let db_config = cli.database_config();
    info!(
        user = %db_config.user,
        host = %db_config.host,
        port = db_config.port,
        dbname = %db_config.dbname,
        ssl = ?db_config.ssl_mode,
        "Database"
    );
    let pool = create_pool(&db_config)?;
    let db = Database::new(pool, config.schema.clone());

    info!(
        work_dir = %config.work_dir.display(),
        renderer = ?config.renderer,
        "Starting"
    );

    let pipeline = Pipeline::new(config.clone(), db.clone());
    match config.renderer {
        RendererKind::Web => {
            let settings = match &cli.settings {
                Some(path) => Settings::load(path)?,
                None => Settings::embedded()?,
            };
            let browser = BrowserSession::new(config.webdriver_url.clone(), config.browser);
            let renderer = WebMapRenderer::new(db, settings, &config.work_dir, browser)?;
            run(pipeline, renderer).await
        }
        RendererKind::Plot => {
            let renderer = PlotRenderer::new(db, &config.work_dir).with_display(!cli.no_display);
            run(pipeline, renderer).await
        }
    }
}

async fn run<R: MapRenderer>(pipeline: Pipeline, renderer: R) -> Result<()> {
    let mut driver = Driver::new(pipeline, renderer, console::stdio());
    driver.run().await.context("Interactive session stopped")?;
    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Les logs vont sur stderr, le dialogue sur stdout
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
