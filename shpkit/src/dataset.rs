//! Jeu de données vectoriel en mémoire (polygones + attributs DBF)

use std::path::Path;

use shapefile::dbase::{Record, TableInfo};
use shapefile::{Point, PointM, PointZ, Polygon, PolygonM, PolygonZ, Shape};
use tracing::{info, warn};

use crate::{prj, ShpError};

/// Extensions supprimées avant réécriture d'un shapefile
const SIDECAR_EXTENSIONS: [&str; 5] = ["shp", "shx", "dbf", "prj", "cpg"];

/// Page de code écrite dans le .cpg (le DBF est réécrit en UTF-8)
pub const CODE_PAGE: &str = "UTF-8";

/// Géométrie polygonale, quelle que soit sa dimension
#[derive(Debug, Clone)]
pub enum PolygonShape {
    Polygon(Polygon),
    PolygonZ(PolygonZ),
    PolygonM(PolygonM),
}

impl PolygonShape {
    /// Convertit une forme lue ; `None` pour une géométrie nulle
    fn from_shape(shape: Shape) -> Result<Option<Self>, ShpError> {
        match shape {
            Shape::Polygon(p) => Ok(Some(Self::Polygon(p))),
            Shape::PolygonZ(p) => Ok(Some(Self::PolygonZ(p))),
            Shape::PolygonM(p) => Ok(Some(Self::PolygonM(p))),
            Shape::NullShape => Ok(None),
            other => Err(ShpError::NotPolygon(other.shapetype() as i32)),
        }
    }

    /// Parcourt les coordonnées planes de tous les anneaux
    pub fn for_each_xy(&self, mut f: impl FnMut(f64, f64)) {
        match self {
            Self::Polygon(p) => p.rings().iter().flat_map(|r| r.points()).for_each(|pt| f(pt.x, pt.y)),
            Self::PolygonZ(p) => p.rings().iter().flat_map(|r| r.points()).for_each(|pt| f(pt.x, pt.y)),
            Self::PolygonM(p) => p.rings().iter().flat_map(|r| r.points()).for_each(|pt| f(pt.x, pt.y)),
        }
    }
}

/// Point exposant des coordonnées planes (x, y)
///
/// Les ordonnées Z et M sont conservées lors d'une transformation.
pub trait Planar: Copy {
    fn xy(&self) -> (f64, f64);
    fn with_xy(&self, x: f64, y: f64) -> Self;
}

impl Planar for Point {
    fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    fn with_xy(&self, x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

impl Planar for PointZ {
    fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    fn with_xy(&self, x: f64, y: f64) -> Self {
        PointZ { x, y, ..*self }
    }
}

impl Planar for PointM {
    fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    fn with_xy(&self, x: f64, y: f64) -> Self {
        PointM { x, y, ..*self }
    }
}

/// Une entité : géométrie + enregistrement DBF
#[derive(Debug)]
pub struct VectorFeature {
    pub shape: PolygonShape,
    pub record: Record,
}

/// Couche unique d'un shapefile chargée en mémoire
pub struct VectorDataset {
    /// Nom de la couche (nom du fichier sans extension)
    pub layer_name: String,

    /// Référence spatiale des géométries (si connue)
    pub epsg: Option<u32>,

    /// Schéma DBF (ordre des champs conservé)
    pub table_info: TableInfo,

    /// Entités
    pub features: Vec<VectorFeature>,

    /// La source avait un .cpg (page de code du DBF)
    pub has_code_page: bool,
}

impl std::fmt::Debug for VectorDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorDataset")
            .field("layer_name", &self.layer_name)
            .field("epsg", &self.epsg)
            .field("features", &self.features.len())
            .field("has_code_page", &self.has_code_page)
            .finish()
    }
}

impl VectorDataset {
    /// Nombre d'entités
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Charge toutes les entités polygonales d'un shapefile
///
/// Les géométries nulles sont ignorées.
pub fn read_polygons(path: &Path) -> Result<VectorDataset, ShpError> {
    let mut reader = shapefile::Reader::from_path(path)?;

    let mut features = Vec::new();
    let mut skipped = 0usize;

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;
        match PolygonShape::from_shape(shape)? {
            Some(shape) => features.push(VectorFeature { shape, record }),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(path = %path.display(), skipped = skipped, "Null shapes skipped");
    }

    let table_info = reader.into_table_info();
    let layer_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let epsg = prj::detect_epsg(path).ok().flatten();
    let has_code_page = path.with_extension("cpg").exists();

    Ok(VectorDataset {
        layer_name,
        epsg,
        table_info,
        features,
        has_code_page,
    })
}

/// Supprime un shapefile existant et ses fichiers associés
pub fn delete_shapefile(path: &Path) -> Result<(), ShpError> {
    for ext in SIDECAR_EXTENSIONS {
        let sidecar = path.with_extension(ext);
        if sidecar.exists() {
            std::fs::remove_file(&sidecar)?;
        }
    }
    Ok(())
}

/// Enregistre un jeu de données sur disque
///
/// Tout shapefile préexistant au même chemin est supprimé avant écriture.
/// Un .prj est écrit si le WKT de la référence est connu, un .cpg si la
/// source en avait un.
pub fn save_vector(dataset: &VectorDataset, path: &Path) -> Result<(), ShpError> {
    if path.exists() {
        delete_shapefile(path)?;
    }

    {
        let mut writer = shapefile::Writer::from_path_with_info(path, dataset.table_info.clone())?;
        for feature in &dataset.features {
            match &feature.shape {
                PolygonShape::Polygon(p) => writer.write_shape_and_record(p, &feature.record)?,
                PolygonShape::PolygonZ(p) => writer.write_shape_and_record(p, &feature.record)?,
                PolygonShape::PolygonM(p) => writer.write_shape_and_record(p, &feature.record)?,
            }
        }
    }

    match dataset.epsg.and_then(prj::esri_wkt) {
        Some(wkt) => std::fs::write(prj::prj_path(path), wkt)?,
        None => warn!(epsg = ?dataset.epsg, "No WKT known for target reference, .prj not written"),
    }

    if dataset.has_code_page {
        std::fs::write(path.with_extension("cpg"), CODE_PAGE)?;
    }

    info!(
        path = %path.display(),
        features = dataset.len(),
        "Shapefile written"
    );
    Ok(())
}
