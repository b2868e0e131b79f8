//! Carte statique : états en projection conique conforme de Lambert
//!
//! Figure de 11,3 × 7 pouces à 200 DPI. Les états sont des aplats jaunes
//! semi-transparents sur des terres grises et un fond bleu, les favoris des
//! étoiles rouges. Chaque carte est affichée dans la visionneuse du système.

use std::ops::Range;
use std::path::{Path, PathBuf};

use geo::Polygon;
use image::RgbImage;
use plotters::element::Polygon as Patch;
use plotters::prelude::{
    BitMapBackend, ChartBuilder, Color, EmptyElement, FontStyle, IntoDrawingArea, IntoFont,
    PathElement, RGBColor, Text, BLACK, RED,
};
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tempfile::TempPath;
use tracing::{info, warn};

use super::lcc::LambertConformalConic;
use super::{jpeg, MapRenderer, MarkerLayer};
use crate::bookmark::Bookmark;
use crate::db::Database;
use crate::error::{AppError, Result};

/// Résolution de la figure
pub const DPI: f64 = 200.0;
/// Largeur de la figure (pixels)
pub const WIDTH: u32 = 2260;
/// Hauteur de la figure (pixels)
pub const HEIGHT: u32 = 1400;

/// Coin inférieur gauche de l'emprise (lon, lat)
pub const LOWER_LEFT: (f64, f64) = (-120.0, 23.08);
/// Coin supérieur droit de l'emprise (lon, lat)
pub const UPPER_RIGHT: (f64, f64) = (-62.5, 47.7);

const SEA: RGBColor = RGBColor(114, 159, 207);
/// Terres (gris 0.7), sous les états
const CONTINENT: RGBColor = RGBColor(179, 179, 179);
const LAND: RGBColor = RGBColor(191, 191, 0);
const PATCH_ALPHA: f64 = 0.2;
/// Taille des libellés (points typographiques)
const LABEL_POINTS: f64 = 8.0;

/// Multiplicateur de taille des étoiles pour un favori seul
pub const SINGLE_MULTIPLIER: f64 = 2.0;
/// Multiplicateur de taille des étoiles pour tous les favoris
pub const ALL_MULTIPLIER: f64 = 3.0;

fn plot_error(e: impl std::fmt::Display) -> AppError {
    AppError::external("plotters", e)
}

/// Points typographiques → pixels
fn points_to_pixels(points: f64) -> f64 {
    points * DPI / 72.0
}

/// Emprise projetée de la carte
#[derive(Debug, Clone, PartialEq)]
pub struct MapFrame {
    pub x: Range<f64>,
    pub y: Range<f64>,
}

impl MapFrame {
    /// Emprise des coins donnés, élargie au rapport largeur/hauteur de l'image
    pub fn fit(projection: &LambertConformalConic, width: u32, height: u32) -> Self {
        let (x0, y0) = projection.project(LOWER_LEFT.0, LOWER_LEFT.1);
        let (x1, y1) = projection.project(UPPER_RIGHT.0, UPPER_RIGHT.1);

        let (mut dx, mut dy) = (x1 - x0, y1 - y0);
        let (cx, cy) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        let target = width as f64 / height as f64;

        if dx / dy < target {
            dx = dy * target;
        } else {
            dy = dx / target;
        }

        Self {
            x: cx - dx / 2.0..cx + dx / 2.0,
            y: cy - dy / 2.0..cy + dy / 2.0,
        }
    }

    /// Position approximative en pixels d'un point projeté
    pub fn to_pixel(&self, (x, y): (f64, f64), width: u32, height: u32) -> (i32, i32) {
        let px = (x - self.x.start) / (self.x.end - self.x.start) * width as f64;
        let py = (self.y.end - y) / (self.y.end - self.y.start) * height as f64;
        (px.round() as i32, py.round() as i32)
    }
}

/// Sommets d'une étoile à 5 branches, pointe vers le haut (pixels relatifs)
fn star_vertices(radius: f64) -> Vec<(i32, i32)> {
    let inner = radius * 0.382;
    (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { radius } else { inner };
            let angle = -std::f64::consts::FRAC_PI_2 + i as f64 * std::f64::consts::PI / 5.0;
            ((r * angle.cos()).round() as i32, (r * angle.sin()).round() as i32)
        })
        .collect()
}

/// Dessine la carte dans une image RGB
pub fn draw_map(
    polygons: &[Polygon<f64>],
    layer: &MarkerLayer,
    projection: &LambertConformalConic,
) -> Result<RgbImage> {
    let frame = MapFrame::fit(projection, WIDTH, HEIGHT);
    let multiplier = match layer {
        MarkerLayer::All(_) => ALL_MULTIPLIER,
        _ => SINGLE_MULTIPLIER,
    };

    let mut buffer = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&SEA).map_err(plot_error)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(0)
            .build_cartesian_2d(frame.x.clone(), frame.y.clone())
            .map_err(plot_error)?;

        let rings: Vec<Vec<(f64, f64)>> = polygons
            .iter()
            .map(|polygon| {
                polygon
                    .exterior()
                    .coords()
                    .map(|c| projection.project(c.x, c.y))
                    .collect()
            })
            .collect();

        chart
            .draw_series(
                rings
                    .iter()
                    .map(|ring| Patch::new(ring.clone(), CONTINENT.filled())),
            )
            .map_err(plot_error)?;

        for ring in rings {
            chart
                .draw_series(std::iter::once(Patch::new(
                    ring.clone(),
                    LAND.mix(PATCH_ALPHA).filled(),
                )))
                .map_err(plot_error)?;
            chart
                .draw_series(std::iter::once(PathElement::new(
                    ring,
                    BLACK.mix(PATCH_ALPHA).stroke_width(1),
                )))
                .map_err(plot_error)?;
        }

        for bookmark in layer.markers() {
            draw_marker(&mut chart, projection, bookmark, multiplier)?;
        }

        root.present().map_err(plot_error)?;
    }

    RgbImage::from_raw(WIDTH, HEIGHT, buffer)
        .ok_or_else(|| plot_error("bitmap buffer has an unexpected size"))
}

type Chart<'a, 'b> = plotters::chart::ChartContext<
    'a,
    BitMapBackend<'b>,
    plotters::coord::cartesian::Cartesian2d<
        plotters::coord::types::RangedCoordf64,
        plotters::coord::types::RangedCoordf64,
    >,
>;

fn draw_marker(
    chart: &mut Chart<'_, '_>,
    projection: &LambertConformalConic,
    bookmark: &Bookmark,
    multiplier: f64,
) -> Result<()> {
    let position = projection.project(bookmark.lon, bookmark.lat);
    let radius = points_to_pixels(f64::from(bookmark.size.get()) * multiplier) / 2.0;

    chart
        .draw_series(std::iter::once(
            EmptyElement::at(position) + Patch::new(star_vertices(radius), RED.filled()),
        ))
        .map_err(plot_error)?;

    if !bookmark.label.is_empty() {
        let style = ("sans-serif", points_to_pixels(LABEL_POINTS))
            .into_font()
            .style(FontStyle::Bold)
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Bottom));

        chart
            .draw_series(std::iter::once(
                EmptyElement::at(position)
                    + Text::new(bookmark.label.clone(), (0, -(radius.round() as i32)), style),
            ))
            .map_err(plot_error)?;
    }
    Ok(())
}

/// Rendu statique (image JPEG)
pub struct PlotRenderer {
    db: Database,
    work_dir: PathBuf,
    projection: LambertConformalConic,
    last: Option<RgbImage>,
    display: bool,
    /// Aperçu affiché, supprimé au rendu suivant
    preview: Option<TempPath>,
}

impl PlotRenderer {
    pub fn new(db: Database, work_dir: &Path) -> Self {
        Self {
            db,
            work_dir: work_dir.to_path_buf(),
            projection: LambertConformalConic::conus(),
            last: None,
            display: true,
            preview: None,
        }
    }

    /// Active ou non l'affichage des cartes à l'écran
    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    /// Écrit l'aperçu JPEG dans un fichier temporaire
    fn write_preview(&mut self, image: &RgbImage) -> Result<&Path> {
        let preview = tempfile::Builder::new()
            .prefix("states-map-")
            .suffix(".jpg")
            .tempfile()?
            .into_temp_path();
        jpeg::write_jpeg(image, &preview)?;
        let preview: &Path = self.preview.insert(preview);
        Ok(preview)
    }

    /// Ouvre la carte dans la visionneuse d'images du système
    fn show(&mut self, image: &RgbImage) -> Result<()> {
        let preview = self.write_preview(image)?;
        if let Err(e) = open::that_detached(preview.as_os_str()) {
            warn!(error = %e, "Cannot open the image viewer");
        }
        Ok(())
    }
}

impl MapRenderer for PlotRenderer {
    async fn render(&mut self, layer: &MarkerLayer) -> Result<()> {
        let polygons = self.db.state_polygons().await?;
        let image = draw_map(&polygons, layer, &self.projection)?;

        info!(
            polygons = polygons.len(),
            markers = layer.markers().len(),
            "Static map drawn"
        );
        if self.display {
            self.show(&image)?;
        }
        self.last = Some(image);
        Ok(())
    }

    fn capture_prompt(&self) -> &'static str {
        "Press enter to save the image"
    }

    fn image_name(&self, layer: &MarkerLayer) -> String {
        match layer {
            MarkerLayer::StatesOnly => "states.jpg",
            MarkerLayer::Single(_) => "singlemarkers.jpg",
            MarkerLayer::All(_) => "allmarkers.jpg",
        }
        .to_string()
    }

    async fn capture(&mut self, file_name: &str) -> Result<PathBuf> {
        let image = self
            .last
            .as_ref()
            .ok_or_else(|| plot_error("nothing has been drawn yet"))?;

        let path = self.work_dir.join(file_name);
        jpeg::write_jpeg(image, &path)?;

        info!(path = %path.display(), "Image saved");
        Ok(path)
    }

    async fn close(&mut self) -> Result<()> {
        self.last = None;
        self.preview = None;
        Ok(())
    }
}
