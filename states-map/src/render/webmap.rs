//! Carte web Leaflet capturée par un navigateur

use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;

use super::browser::BrowserSession;
use super::{jpeg, label_file_stem, GeoJsonCache, MapRenderer, MarkerLayer};
use crate::bookmark::Bookmark;
use crate::config::{Settings, TileLayer};
use crate::db::Database;
use crate::error::Result;

/// Nom de la page générée dans le dossier de travail
pub const PAGE_NAME: &str = "index.html";

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const FONT_AWESOME_CSS: &str =
    "https://maxcdn.bootstrapcdn.com/font-awesome/4.7.0/css/font-awesome.min.css";

/// Échappe un texte pour HTML (contenu ou attribut)
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON insérable dans un bloc `<script>`
fn script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

/// HTML de l'icône d'un marqueur
pub fn marker_icon_html(settings: &Settings, bookmark: &Bookmark) -> String {
    format!(
        r#"<i class="fa {} {}" style="color:{}" aria-hidden="true"></i>"#,
        escape_html(&settings.marker.icon),
        bookmark.size.fa_class(),
        escape_html(&settings.marker.color)
    )
}

/// Génère la page Leaflet : fond de carte, couche des états, marqueurs
pub fn build_page(
    settings: &Settings,
    tiles: &TileLayer,
    states_geojson: &str,
    markers: &[Bookmark],
) -> String {
    let style = json!({
        "fillColor": settings.states_style.fill_color,
        "fillOpacity": settings.states_style.fill_opacity,
        "color": settings.states_style.color,
        "opacity": settings.states_style.opacity,
    });

    let markers: Vec<_> = markers
        .iter()
        .map(|b| {
            json!({
                "lat": b.lat,
                "lon": b.lon,
                "popup": escape_html(&b.label),
                "html": marker_icon_html(settings, b),
            })
        })
        .collect();

    let view = json!({
        "center": settings.center,
        "zoom": settings.zoom,
        "tiles": tiles.url,
        "attribution": tiles.attribution,
    });

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>U.S. states</title>
<link rel="stylesheet" href="{leaflet_css}">
<link rel="stylesheet" href="{fa_css}">
<script src="{leaflet_js}"></script>
<style>html, body, #map {{ width: 100%; height: 100%; margin: 0; padding: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
var view = {view};
var map = L.map('map').setView(view.center, view.zoom);
L.tileLayer(view.tiles, {{ attribution: view.attribution }}).addTo(map);

var statesStyle = {style};
L.geoJSON({states}, {{ style: function () {{ return statesStyle; }} }}).addTo(map);

var markers = {markers};
markers.forEach(function (m) {{
  var icon = L.divIcon({{ className: '', iconAnchor: [0, 0], html: m.html }});
  L.marker([m.lat, m.lon], {{ icon: icon }}).bindPopup(m.popup).addTo(map);
}});
</script>
</body>
</html>
"#,
        leaflet_css = LEAFLET_CSS,
        fa_css = FONT_AWESOME_CSS,
        leaflet_js = LEAFLET_JS,
        view = script_json(&view.to_string()),
        style = script_json(&style.to_string()),
        states = script_json(states_geojson),
        markers = script_json(&serde_json::Value::from(markers).to_string()),
    )
}

/// Rendu Leaflet + capture WebDriver
pub struct WebMapRenderer {
    db: Database,
    settings: Settings,
    tiles: TileLayer,
    cache: GeoJsonCache,
    work_dir: PathBuf,
    browser: BrowserSession,
}

impl WebMapRenderer {
    pub fn new(
        db: Database,
        settings: Settings,
        work_dir: &Path,
        browser: BrowserSession,
    ) -> anyhow::Result<Self> {
        let tiles = settings.tile_layer()?;
        Ok(Self {
            db,
            settings,
            tiles,
            cache: GeoJsonCache::new(),
            work_dir: work_dir.to_path_buf(),
            browser,
        })
    }

    /// Chemin de la page générée
    pub fn page_path(&self) -> PathBuf {
        self.work_dir.join(PAGE_NAME)
    }
}

impl MapRenderer for WebMapRenderer {
    async fn render(&mut self, layer: &MarkerLayer) -> Result<()> {
        let db = &self.db;
        let states = self
            .cache
            .get_or_fetch(|| db.fetch_states_geojson())
            .await?;

        let page = build_page(&self.settings, &self.tiles, states, layer.markers());
        let path = self.page_path();
        tokio::fs::write(&path, page).await?;

        info!(path = %path.display(), markers = layer.markers().len(), "Web map written");
        self.browser.show(&path).await
    }

    fn capture_prompt(&self) -> &'static str {
        "Press enter to take a screenshot"
    }

    fn image_name(&self, layer: &MarkerLayer) -> String {
        match layer {
            MarkerLayer::StatesOnly => "states.jpeg".to_string(),
            MarkerLayer::Single(b) => format!("{}.jpeg", label_file_stem(&b.label, b.id)),
            MarkerLayer::All(_) => "allpoints.jpeg".to_string(),
        }
    }

    async fn capture(&mut self, file_name: &str) -> Result<PathBuf> {
        let png = self.browser.screenshot().await?;
        let path = self.work_dir.join(file_name);
        jpeg::png_to_jpeg(&png, &path)?;

        info!(path = %path.display(), "Screenshot saved");
        Ok(path)
    }

    fn states_changed(&mut self) {
        self.cache.invalidate();
    }

    async fn close(&mut self) -> Result<()> {
        self.browser.close().await
    }
}
