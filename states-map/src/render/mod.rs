//! Rendu des cartes
//!
//! Deux rendus derrière le trait `MapRenderer` :
//! - `WebMapRenderer` : page Leaflet affichée par un navigateur WebDriver
//! - `PlotRenderer` : image statique en projection de Lambert

pub mod browser;
pub mod jpeg;
pub mod lcc;
pub mod plot;
pub mod webmap;

use std::future::Future;
use std::path::PathBuf;

use geojson::FeatureCollection;

use crate::bookmark::Bookmark;
use crate::error::{AppError, Result};

pub use plot::PlotRenderer;
pub use webmap::WebMapRenderer;

/// Marqueurs à afficher sur la carte des états
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerLayer {
    /// Les états seuls
    StatesOnly,
    /// Le favori qui vient d'être ajouté
    Single(Bookmark),
    /// Tous les favoris enregistrés
    All(Vec<Bookmark>),
}

impl MarkerLayer {
    pub fn markers(&self) -> &[Bookmark] {
        match self {
            MarkerLayer::StatesOnly => &[],
            MarkerLayer::Single(b) => std::slice::from_ref(b),
            MarkerLayer::All(all) => all,
        }
    }
}

/// Rendu d'une carte des états avec des favoris
#[allow(async_fn_in_trait)]
pub trait MapRenderer {
    /// Prépare et affiche la carte
    async fn render(&mut self, layer: &MarkerLayer) -> Result<()>;

    /// Message affiché avant l'enregistrement de l'image
    fn capture_prompt(&self) -> &'static str;

    /// Nom du fichier image pour ces marqueurs
    fn image_name(&self, layer: &MarkerLayer) -> String;

    /// Enregistre la dernière carte rendue en JPEG dans le dossier de travail
    async fn capture(&mut self, file_name: &str) -> Result<PathBuf>;

    /// La table des états a été (re)chargée
    fn states_changed(&mut self) {}

    /// Libère les ressources (session navigateur)
    async fn close(&mut self) -> Result<()>;
}

/// Nom de fichier sûr dérivé d'un libellé
///
/// Les séparateurs de chemin et caractères réservés sont remplacés par `_`.
pub fn label_file_stem(label: &str, id: i32) -> String {
    let stem: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches(|c| c == '.' || c == ' ');

    if stem.is_empty() {
        format!("bookmark_{}", id)
    } else {
        stem.to_string()
    }
}

/// GeoJSON des états, lu une fois puis réutilisé
#[derive(Debug, Default)]
pub struct GeoJsonCache {
    states: Option<String>,
}

impl GeoJsonCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retourne le GeoJSON en cache, ou le lit avec `fetch`
    pub async fn get_or_fetch<F, Fut>(&mut self, fetch: F) -> Result<&str>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FeatureCollection>>,
    {
        let states = match self.states.take() {
            Some(states) => states,
            None => {
                let collection = fetch().await?;
                serde_json::to_string(&collection)
                    .map_err(|e| AppError::validation(format!("invalid states GeoJSON: {}", e)))?
            }
        };
        Ok(self.states.insert(states).as_str())
    }

    pub fn is_cached(&self) -> bool {
        self.states.is_some()
    }

    /// Oublie le GeoJSON (après un rechargement de la table des états)
    pub fn invalidate(&mut self) {
        self.states = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmark::SizeClass;
    use std::cell::Cell;

    fn bookmark(id: i32, label: &str) -> Bookmark {
        Bookmark {
            id,
            lon: -100.0,
            lat: 40.0,
            label: label.to_string(),
            size: SizeClass::MAX,
        }
    }

    #[test]
    fn test_markers() {
        assert!(MarkerLayer::StatesOnly.markers().is_empty());
        assert_eq!(MarkerLayer::Single(bookmark(1, "a")).markers().len(), 1);
        let all = MarkerLayer::All(vec![bookmark(1, "a"), bookmark(2, "b")]);
        assert_eq!(all.markers()[1].label, "b");
    }

    #[test]
    fn test_label_file_stem() {
        assert_eq!(label_file_stem("Denver", 1), "Denver");
        assert_eq!(label_file_stem("a/b\\c:d", 1), "a_b_c_d");
        assert_eq!(label_file_stem("../etc", 1), "_etc");
        assert_eq!(label_file_stem("  ", 7), "bookmark_7");
        assert_eq!(label_file_stem("Lac Léman", 1), "Lac Léman");
    }

    #[tokio::test]
    async fn test_geojson_cache_fetches_once() {
        let calls = Cell::new(0);
        let mut cache = GeoJsonCache::new();
        assert!(!cache.is_cached());

        let fetch = || async {
            calls.set(calls.get() + 1);
            Ok(FeatureCollection {
                bbox: None,
                features: vec![],
                foreign_members: None,
            })
        };

        let first = cache.get_or_fetch(fetch).await.unwrap().to_string();
        let second = cache.get_or_fetch(fetch).await.unwrap().to_string();
        assert_eq!(first, second);
        assert!(first.contains("FeatureCollection"));
        assert_eq!(calls.get(), 1);

        cache.invalidate();
        assert!(!cache.is_cached());
        cache.get_or_fetch(fetch).await.unwrap();
        assert_eq!(calls.get(), 2);
    }
}
