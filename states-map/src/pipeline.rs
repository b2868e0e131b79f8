//! Étapes du traitement, communes aux deux rendus
//!
//! téléchargement → extraction → validation → reprojection → chargement,
//! puis enregistrement et lecture des favoris.

use std::path::{Path, PathBuf};

use shpkit::{archive, validate, DownloadedArchive, WGS84};
use tracing::info;

use crate::bookmark::{Bookmark, NewBookmark};
use crate::config::AppConfig;
use crate::db::{loader, Database};
use crate::error::{AppError, Result};

/// Exécute un traitement bloquant hors du runtime
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Io(std::io::Error::other(e)))?
}

/// Étapes du traitement
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AppConfig,
    db: Database,
}

impl Pipeline {
    pub fn new(config: AppConfig, db: Database) -> Self {
        Self { config, db }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Prépare le schéma et la table des favoris
    pub async fn prepare_database(&self) -> Result<()> {
        self.db.ensure_schema().await
    }

    pub async fn states_table_exists(&self) -> Result<bool> {
        self.db.states_table_exists().await
    }

    /// Télécharge l'archive des états dans le dossier de travail
    pub async fn download(&self) -> Result<DownloadedArchive> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;

        let downloaded = archive::download_zip(&self.config.source_url, &self.config.work_dir).await?;
        info!(
            path = %downloaded.path().display(),
            bytes = downloaded.bytes,
            checksum = %downloaded.checksum,
            "Archive downloaded"
        );
        Ok(downloaded)
    }

    /// Extrait l'archive, retourne le dossier d'extraction
    pub async fn unzip(&self, downloaded: &DownloadedArchive) -> Result<PathBuf> {
        let path = downloaded.path();
        blocking(move || archive::unzip(&path).map_err(AppError::from)).await
    }

    /// Valide le dossier extrait, retourne le chemin du .shp
    pub async fn check(&self, folder: &Path) -> Result<PathBuf> {
        let folder = folder.to_path_buf();
        blocking(move || {
            let name = validate::check_shapefile(&folder)?;
            Ok(folder.join(name))
        })
        .await
    }

    /// Code EPSG du shapefile (`None` si la référence n'est pas identifiée)
    pub async fn detect_epsg(&self, shp: &Path) -> Result<Option<u32>> {
        let shp = shp.to_path_buf();
        blocking(move || shpkit::detect_epsg(&shp).map_err(AppError::from)).await
    }

    /// Reprojette le shapefile en WGS84 et le réécrit en place
    pub async fn reproject_to_wgs84(&self, shp: &Path, epsg_from: Option<u32>) -> Result<()> {
        let shp = shp.to_path_buf();
        blocking(move || {
            let dataset = shpkit::reproject_vector(&shp, epsg_from, Some(WGS84))?;
            shpkit::save_vector(&dataset, &shp)?;
            Ok(())
        })
        .await
    }

    /// Charge le shapefile dans la table des états
    pub async fn upload(&self, shp: &Path) -> Result<()> {
        let sql = loader::shp2pgsql(&self.config.shp2pgsql(), shp, &self.db.states_table()).await?;
        self.db.upload_states_sql(&sql).await
    }

    /// Enregistre un favori validé s'il est dans un des états
    pub async fn add_bookmark(&self, point: &NewBookmark) -> Result<Bookmark> {
        self.db.insert_bookmark(point).await
    }

    pub async fn bookmarks(&self) -> Result<Vec<Bookmark>> {
        self.db.list_bookmarks().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, DatabaseConfig};
    use crate::ErrorKind;
    use std::io::Write;

    fn pipeline(work_dir: &Path) -> Pipeline {
        let pool = create_pool(&DatabaseConfig::default()).unwrap();
        let config = AppConfig {
            work_dir: work_dir.to_path_buf(),
            ..Default::default()
        };
        Pipeline::new(config, Database::new(pool, "exercise"))
    }

    #[tokio::test]
    async fn test_check_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("states.shp"), b"").unwrap();

        let err = pipeline(dir.path()).check(dir.path()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("shx"), "{}", err);
    }

    #[tokio::test]
    async fn test_unzip_corrupted_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("broken.zip")).unwrap();
        file.write_all(b"not a zip").unwrap();

        let downloaded = DownloadedArchive {
            folder: dir.path().to_path_buf(),
            file_name: "broken.zip".into(),
            bytes: 9,
            checksum: String::new(),
        };
        let err = pipeline(dir.path()).unzip(&downloaded).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_detect_epsg_without_prj() {
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline(dir.path())
            .detect_epsg(&dir.path().join("states.shp"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_download_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = pipeline(dir.path());
        pipeline.config.source_url = "http://127.0.0.1:1/cb_2016_us_state_20m.zip".into();

        let err = pipeline.download().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
