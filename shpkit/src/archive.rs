//! Téléchargement et extraction des archives zip de shapefiles

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::ShpError;

/// Archive téléchargée sur disque
#[derive(Debug, Clone)]
pub struct DownloadedArchive {
    /// Dossier contenant l'archive
    pub folder: PathBuf,

    /// Nom du fichier (dernier segment de l'URL)
    pub file_name: String,

    /// Taille en octets
    pub bytes: u64,

    /// Checksum blake3 (hex)
    pub checksum: String,
}

impl DownloadedArchive {
    /// Chemin complet de l'archive
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.file_name)
    }
}

/// Extrait le nom de fichier d'une URL (dernier segment, sans query string)
pub fn file_name_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let name = without_query.trim_end_matches('/').rsplit('/').next()?;

    if name.is_empty() || name.contains(':') {
        return None;
    }

    Some(name.to_string())
}

/// Télécharge un fichier zip sur disque
///
/// Le fichier est écrit dans `folder` sous le nom du dernier segment de l'URL.
/// Aucun timeout n'est appliqué.
pub async fn download_zip(url: &str, folder: &Path) -> Result<DownloadedArchive, ShpError> {
    let file_name =
        file_name_from_url(url).ok_or_else(|| ShpError::InvalidUrl(url.to_string()))?;
    let target = folder.join(&file_name);

    info!(url = %url, target = %target.display(), "Downloading archive");

    let response = reqwest::get(url).await?.error_for_status()?;

    tokio::fs::create_dir_all(folder).await?;
    let mut out = tokio::fs::File::create(&target).await?;
    let mut hasher = blake3::Hasher::new();
    let mut bytes: u64 = 0;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        out.write_all(&chunk).await?;
        bytes += chunk.len() as u64;
    }
    out.flush().await?;

    let checksum = hasher.finalize().to_hex().to_string();
    info!(bytes = bytes, checksum = %checksum, "Download complete");

    Ok(DownloadedArchive {
        folder: folder.to_path_buf(),
        file_name,
        bytes,
        checksum,
    })
}

/// Extrait une archive zip dans `<dossier>/<nom sans extension>/`
///
/// Les entrées sont aplaties dans ce dossier, les répertoires ignorés.
/// Retourne le chemin du dossier d'extraction.
pub fn unzip(archive: &Path) -> Result<PathBuf, ShpError> {
    let folder = archive.parent().unwrap_or_else(|| Path::new("."));
    let base = archive
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ShpError::UnsafeEntry(archive.display().to_string()))?;

    let target = folder.join(base);
    if !target.exists() {
        std::fs::create_dir(&target)?;
    }

    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_owned()))
            .ok_or_else(|| ShpError::UnsafeEntry(entry.name().to_string()))?;

        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut content)?;
        std::fs::write(target.join(&name), &content)?;

        debug!(entry = %name.to_string_lossy(), bytes = content.len(), "Extracted");
    }

    info!(folder = %target.display(), entries = zip.len(), "Archive extracted");
    Ok(target)
}
