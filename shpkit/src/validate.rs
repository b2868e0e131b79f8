//! Validation du contenu d'un dossier de shapefile
//!
//! Codes de type de géométrie ESRI (en-tête des enregistrements .shp) :
//!
//! | Code | Type        | Code | Type        |
//! |------|-------------|------|-------------|
//! | 0    | Null Shape  | 15   | PolygonZ    |
//! | 1    | Point       | 18   | MultiPointZ |
//! | 3    | PolyLine    | 21   | PointM      |
//! | 5    | Polygon     | 23   | PolyLineM   |
//! | 8    | MultiPoint  | 25   | PolygonM    |
//! | 11   | PointZ      | 28   | MultiPointM |
//! | 13   | PolyLineZ   | 31   | MultiPatch  |

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use shapefile::ShapeReader;
use tracing::debug;

use crate::ShpError;

/// Extensions obligatoires d'un shapefile
pub const MANDATORY_EXTENSIONS: [&str; 3] = ["shp", "shx", "dbf"];

/// Codes des types polygone / multipolygone (2D, Z, M)
pub const POLYGON_SHAPE_TYPES: [i32; 3] = [5, 15, 25];

/// Vérifie qu'un code de type correspond à un polygone
pub fn is_polygon_type(code: i32) -> bool {
    POLYGON_SHAPE_TYPES.contains(&code)
}

/// Vérifie le contenu d'un dossier extrait
///
/// Le dossier doit contenir les fichiers .shp, .shx et .dbf, un seul .shp,
/// et la première géométrie doit être de type polygone.
/// Retourne le nom du fichier .shp.
pub fn check_shapefile(folder: &Path) -> Result<String, ShpError> {
    let mut extensions = BTreeSet::new();
    let mut shapefiles = Vec::new();

    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let extension = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();

        if extension == "shp" {
            shapefiles.push(name.clone());
        }
        extensions.insert(extension);
    }

    let missing: Vec<String> = MANDATORY_EXTENSIONS
        .iter()
        .filter(|ext| !extensions.contains(**ext))
        .map(|ext| ext.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ShpError::MissingFiles(missing));
    }

    if shapefiles.len() > 1 {
        return Err(ShpError::MultipleShapefiles(shapefiles.len()));
    }
    let shapefile = shapefiles
        .pop()
        .ok_or_else(|| ShpError::NoShapefile(folder.to_path_buf()))?;

    let code = first_shape_type(&folder.join(&shapefile))?;
    debug!(shapefile = %shapefile, shape_type = code, "First shape type");

    if !is_polygon_type(code) {
        return Err(ShpError::NotPolygon(code));
    }

    Ok(shapefile)
}

/// Lit le code de type du premier enregistrement d'un .shp
///
/// Seul le .shp est lu : l'index .shx n'est pas nécessaire ici.
pub fn first_shape_type(path: &Path) -> Result<i32, ShpError> {
    let mut reader = ShapeReader::new(BufReader::new(File::open(path)?))?;

    let shape = reader
        .iter_shapes()
        .next()
        .ok_or_else(|| ShpError::EmptyShapefile(path.to_path_buf()))??;

    Ok(shape.shapetype() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    use shapefile::{
        Multipatch, Multipoint, Patch, Point, PointM, PointZ, Polygon, PolygonM, PolygonRing,
        PolygonZ, Polyline, ShapeWriter,
    };
    use std::io::BufWriter;

    /// Écrit un .shp (sans .shx) dont l'unique enregistrement est du type donné ;
    /// code 0 : en-tête seul
    fn write_shp(path: &Path, shape_type: i32) {
        let mut writer = ShapeWriter::new(BufWriter::new(File::create(path).unwrap()));
        let xy = [(-109.0, 37.0), (-109.0, 41.0), (-102.0, 41.0), (-102.0, 37.0), (-109.0, 37.0)];

        match shape_type {
            0 => Ok(()),
            1 => writer.write_shape(&Point::new(-105.0, 39.0)),
            3 => writer.write_shape(&Polyline::new(vec![
                Point::new(-109.0, 37.0),
                Point::new(-102.0, 41.0),
            ])),
            5 => writer.write_shape(&Polygon::new(PolygonRing::Outer(
                xy.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            ))),
            8 => writer.write_shape(&Multipoint::new(vec![
                Point::new(-105.0, 39.0),
                Point::new(-104.0, 40.0),
            ])),
            15 => writer.write_shape(&PolygonZ::new(PolygonRing::Outer(
                xy.iter().map(|&(x, y)| PointZ::new(x, y, 0.0, 0.0)).collect(),
            ))),
            25 => writer.write_shape(&PolygonM::new(PolygonRing::Outer(
                xy.iter().map(|&(x, y)| PointM::new(x, y, 0.0)).collect(),
            ))),
            31 => writer.write_shape(&Multipatch::new(Patch::TriangleStrip(
                xy[..3].iter().map(|&(x, y)| PointZ::new(x, y, 0.0, 0.0)).collect(),
            ))),
            other => panic!("no fixture for shape type {}", other),
        }
        .unwrap();
    }

    fn shapefile_dir(record_type: i32, extensions: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for ext in extensions {
            let path = dir.path().join(format!("states.{}", ext));
            if *ext == "shp" {
                write_shp(&path, record_type);
            } else {
                std::fs::write(path, b"").unwrap();
            }
        }
        dir
    }

    #[test]
    fn test_polygon_types() {
        for code in [5, 15, 25] {
            assert!(is_polygon_type(code));
        }
        for code in [0, 1, 3, 8, 11, 13, 18, 21, 23, 28, 31] {
            assert!(!is_polygon_type(code), "code {}", code);
        }
    }

    #[test]
    fn test_check_valid_shapefile() {
        let dir = shapefile_dir(5, &["shp", "shx", "dbf", "prj"]);
        assert_eq!(check_shapefile(dir.path()).unwrap(), "states.shp");
    }

    #[test]
    fn test_check_polygon_z_and_m() {
        for code in [15, 25] {
            let dir = shapefile_dir(code, &["shp", "shx", "dbf"]);
            assert!(check_shapefile(dir.path()).is_ok());
        }
    }

    #[test]
    fn test_check_missing_mandatory_file() {
        for missing in MANDATORY_EXTENSIONS {
            let extensions: Vec<&str> = MANDATORY_EXTENSIONS
                .iter()
                .copied()
                .filter(|e| *e != missing)
                .collect();
            let dir = shapefile_dir(5, &extensions);

            match check_shapefile(dir.path()) {
                Err(ShpError::MissingFiles(files)) => assert_eq!(files, vec![missing.to_string()]),
                other => panic!("expected MissingFiles, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_check_not_polygon() {
        for code in [1, 3, 8, 31] {
            let dir = shapefile_dir(code, &["shp", "shx", "dbf"]);
            assert!(matches!(
                check_shapefile(dir.path()),
                Err(ShpError::NotPolygon(c)) if c == code
            ));
        }
    }

    #[test]
    fn test_check_multiple_shapefiles() {
        let dir = shapefile_dir(5, &["shp", "shx", "dbf"]);
        write_shp(&dir.path().join("other.shp"), 5);

        assert!(matches!(
            check_shapefile(dir.path()),
            Err(ShpError::MultipleShapefiles(2))
        ));
    }

    #[test]
    fn test_check_empty_shapefile() {
        let dir = shapefile_dir(0, &["shp", "shx", "dbf"]);

        assert!(matches!(
            check_shapefile(dir.path()),
            Err(ShpError::EmptyShapefile(_))
        ));
    }

    #[test]
    fn test_uppercase_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write_shp(&dir.path().join("STATES.SHP"), 5);
        std::fs::write(dir.path().join("STATES.SHX"), b"").unwrap();
        std::fs::write(dir.path().join("STATES.DBF"), b"").unwrap();

        assert_eq!(check_shapefile(dir.path()).unwrap(), "STATES.SHP");
    }
}
