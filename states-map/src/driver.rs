//! Boucle interactive
//!
//! Étapes : vérification de la table → téléchargement → extraction et
//! validation → reprojection et chargement → carte des états → favoris.
//! Chaque étape affiche son erreur et repose sa question. `q` arrête tout,
//! immédiatement, sans écrire d'autre fichier.

use std::path::{Path, PathBuf};

use tokio::io::AsyncBufRead;
use tracing::{debug, warn};

use crate::bookmark::{normalize_coordinate, NewBookmark};
use crate::console::{is_show_all, Console};
use crate::error::{AppError, Result};
use crate::pipeline::Pipeline;
use crate::render::{MapRenderer, MarkerLayer};
use shpkit::{DownloadedArchive, WGS84};

/// Saisie dans la boucle des favoris
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Nouveau favori, coordonnées validées
    Point(NewBookmark),
    /// Afficher tous les favoris
    ShowAll,
    /// Coordonnées refusées
    Invalid(String),
}

/// Résultat d'une étape
enum Step<T> {
    Done(T),
    Failed(AppError),
    Quit,
}

/// Pilote du programme interactif
pub struct Driver<R, I, O> {
    pipeline: Pipeline,
    renderer: R,
    console: Console<I, O>,
}

impl<R, I, O> Driver<R, I, O>
where
    R: MapRenderer,
    I: AsyncBufRead + Unpin,
    O: std::io::Write,
{
    pub fn new(pipeline: Pipeline, renderer: R, console: Console<I, O>) -> Self {
        Self {
            pipeline,
            renderer,
            console,
        }
    }

    pub fn console(&self) -> &Console<I, O> {
        &self.console
    }

    /// Exécute le programme jusqu'à l'arrêt demandé par l'utilisateur
    ///
    /// Seule l'indisponibilité de la base au démarrage est fatale.
    pub async fn run(&mut self) -> Result<()> {
        self.console.say("Welcome. To quit the program type q")?;
        self.console.say(format!(
            "This program will use the folder {} to download data and images",
            self.pipeline.config().work_dir.display()
        ))?;

        self.pipeline.prepare_database().await?;
        let exists = self.pipeline.states_table_exists().await?;

        if exists {
            self.console.say(format!(
                "The table '{}' already exists and will be used. Drop it if a new table is required",
                self.pipeline.database().states_table()
            ))?;
        } else {
            let Some(archive) = self.download_stage().await? else {
                return self.quit().await;
            };
            let Some(shp) = self.unzip_stage(&archive).await? else {
                return self.quit().await;
            };
            if !self.upload_stage(&shp).await? {
                return self.quit().await;
            }
            self.renderer.states_changed();
        }

        if !self.states_stage().await? {
            return self.quit().await;
        }

        self.console
            .say("Insert a bookmark, use showall to view all bookmarks")?;
        loop {
            let Some(entry) = self.read_entry().await? else {
                return self.quit().await;
            };

            let step = match entry {
                Entry::Invalid(message) => {
                    self.console.say(message)?;
                    continue;
                }
                Entry::Point(point) => self.add_point(point).await?,
                Entry::ShowAll => self.show_all().await?,
            };

            match step {
                Step::Done(_) => {}
                Step::Failed(e) => self.report(&e)?,
                Step::Quit => return self.quit().await,
            }
        }
    }

    async fn quit(&mut self) -> Result<()> {
        debug!("Quit requested");
        if let Err(e) = self.renderer.close().await {
            warn!(error = %e, "Renderer did not close cleanly");
        }
        Ok(())
    }

    fn report(&mut self, error: &AppError) -> Result<()> {
        debug!(kind = ?error.kind(), error = %error, "Step failed");
        self.console.say(error)?;
        Ok(())
    }

    async fn download_stage(&mut self) -> Result<Option<DownloadedArchive>> {
        loop {
            self.console.say(format!(
                "First I will download a zip file from '{}'",
                self.pipeline.config().source_url
            ))?;
            if self.console.ask("Press enter to begin download").await?.is_none() {
                return Ok(None);
            }

            self.console.say("Downloading...")?;
            match self.pipeline.download().await {
                Ok(archive) => {
                    self.console.say("Download succeeded")?;
                    return Ok(Some(archive));
                }
                Err(e) => self.report(&e)?,
            }
        }
    }

    async fn unzip_stage(&mut self, archive: &DownloadedArchive) -> Result<Option<PathBuf>> {
        loop {
            if self.console.ask("Press enter to unzip the file").await?.is_none() {
                return Ok(None);
            }

            match self.try_unzip(archive).await {
                Ok(shp) => return Ok(Some(shp)),
                Err(e) => self.report(&e)?,
            }
        }
    }

    async fn try_unzip(&mut self, archive: &DownloadedArchive) -> Result<PathBuf> {
        self.console.say("Unzipping...")?;
        let folder = self.pipeline.unzip(archive).await?;
        self.console.say("Unzipping succeeded")?;

        self.console.say("Checking the folder content")?;
        let shp = self.pipeline.check(&folder).await?;
        let name = shp
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.console.say(format!(
            "folder contains 1 shapefile of type polygon/multipolygon called {}",
            name
        ))?;
        self.console.say(".shp, .dbf, .shx mandatory files are there")?;
        Ok(shp)
    }

    async fn upload_stage(&mut self, shp: &Path) -> Result<bool> {
        loop {
            if self
                .console
                .ask("Press enter to upload shapefile to the database")
                .await?
                .is_none()
            {
                return Ok(false);
            }

            match self.try_upload(shp).await {
                Ok(()) => return Ok(true),
                Err(e) => self.report(&e)?,
            }
        }
    }

    async fn try_upload(&mut self, shp: &Path) -> Result<()> {
        self.console
            .say("The database will store geometry in WGS84 lat/lon")?;
        self.console.say("Checking coordinate system...")?;

        let epsg = self.pipeline.detect_epsg(shp).await?;
        if epsg != Some(WGS84) {
            let current = epsg.map_or_else(|| "unknown".to_string(), |c| format!("epsg:{}", c));
            self.console
                .say(format!("Coordinate system is {}", current))?;
            self.console
                .say(format!("Coordinate system will be converted to epsg:{}", WGS84))?;
            self.console.say("reprojecting....")?;
            self.pipeline.reproject_to_wgs84(shp, epsg).await?;
            self.console.say("shapefile overwritten")?;
        }

        self.console.say("uploading states")?;
        self.pipeline.upload(shp).await?;
        self.console.say("Upload succeeded")?;
        Ok(())
    }

    async fn states_stage(&mut self) -> Result<bool> {
        loop {
            if self.console.ask("Press enter to plot the states").await?.is_none() {
                return Ok(false);
            }

            match self.show_map(MarkerLayer::StatesOnly).await? {
                Step::Done(_) => return Ok(true),
                Step::Failed(e) => self.report(&e)?,
                Step::Quit => return Ok(false),
            }
        }
    }

    /// Rend la carte, attend la confirmation puis enregistre l'image
    async fn show_map(&mut self, layer: MarkerLayer) -> Result<Step<PathBuf>> {
        self.console.say("plotting...")?;
        if let Err(e) = self.renderer.render(&layer).await {
            return Ok(Step::Failed(e));
        }

        let prompt = self.renderer.capture_prompt();
        if self.console.ask(prompt).await?.is_none() {
            return Ok(Step::Quit);
        }

        let name = self.renderer.image_name(&layer);
        match self.renderer.capture(&name).await {
            Ok(path) => {
                self.console.say(format!("image {} saved on disk", name))?;
                Ok(Step::Done(path))
            }
            Err(e) => Ok(Step::Failed(e)),
        }
    }

    /// Lit un favori (longitude, latitude, libellé) ou `showall`
    ///
    /// `None` si l'utilisateur demande l'arrêt.
    pub async fn read_entry(&mut self) -> Result<Option<Entry>> {
        self.console.say("---insert showall to view all bookmarks---")?;

        let Some(x) = self
            .console
            .ask("Insert WGS84 longitude(x) and press enter, for USA this value should be negative")
            .await?
        else {
            return Ok(None);
        };
        if is_show_all(&x) {
            return Ok(Some(Entry::ShowAll));
        }

        let Some(y) = self
            .console
            .ask("Insert WGS84 latitude(y) and press enter")
            .await?
        else {
            return Ok(None);
        };
        if is_show_all(&y) {
            return Ok(Some(Entry::ShowAll));
        }

        let (lon, lat) = match (normalize_coordinate(&x), normalize_coordinate(&y)) {
            (Ok(lon), Ok(lat)) => (lon, lat),
            (Err(e), _) | (_, Err(e)) => return Ok(Some(Entry::Invalid(e.to_string()))),
        };

        let Some(label) = self.console.ask("Insert a text label").await? else {
            return Ok(None);
        };
        if is_show_all(&label) {
            return Ok(Some(Entry::ShowAll));
        }

        Ok(Some(Entry::Point(NewBookmark::new(lon, lat, label))))
    }

    async fn add_point(&mut self, point: NewBookmark) -> Result<Step<PathBuf>> {
        let saved = match self.pipeline.add_bookmark(&point).await {
            Ok(saved) => saved,
            Err(e) => return Ok(Step::Failed(e)),
        };

        self.console.say(format!(
            "long(x)= {} lat(y)={} label= {} size= {}",
            point.lon, point.lat, point.label, point.size
        ))?;
        self.show_map(MarkerLayer::Single(saved)).await
    }

    async fn show_all(&mut self) -> Result<Step<PathBuf>> {
        match self.pipeline.bookmarks().await {
            Ok(all) => self.show_map(MarkerLayer::All(all)).await,
            Err(e) => Ok(Step::Failed(e)),
        }
    }
}
