//! Reprojection de shapefiles avec PROJ
//!
//! Ce module n'effectue de vraies transformations qu'avec le feature `reproject`.

use std::path::Path;

use shapefile::{Polygon, PolygonM, PolygonRing, PolygonZ};
use tracing::info;

use crate::dataset::{self, Planar, PolygonShape, VectorDataset, VectorFeature};
use crate::{prj, ShpError};

/// Référence spatiale source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSrs {
    /// Code EPSG
    Epsg(u32),
    /// WKT lu dans le .prj
    Wkt(String),
}

impl SourceSrs {
    fn definition(&self) -> String {
        match self {
            Self::Epsg(code) => format!("EPSG:{}", code),
            Self::Wkt(wkt) => wkt.clone(),
        }
    }

    fn is_same_as(&self, target_epsg: u32) -> bool {
        matches!(self, Self::Epsg(code) if *code == target_epsg)
    }
}

/// Reprojection entre une référence source et un EPSG cible
pub struct Reprojector {
    #[cfg(feature = "reproject")]
    proj: Option<proj::Proj>,
    source: SourceSrs,
    target_epsg: u32,
}

impl Reprojector {
    /// Crée un nouveau reprojector
    #[cfg(feature = "reproject")]
    pub fn new(source: SourceSrs, target_epsg: u32) -> Result<Self, ShpError> {
        if source.is_same_as(target_epsg) {
            // Pas besoin de reprojection
            return Ok(Self {
                proj: None,
                source,
                target_epsg,
            });
        }

        let from = source.definition();
        let to = format!("EPSG:{}", target_epsg);
        let proj = proj::Proj::new_known_crs(&from, &to, None).map_err(|e| {
            ShpError::projection(format!("cannot build transform to {}: {}", to, e))
        })?;

        Ok(Self {
            proj: Some(proj),
            source,
            target_epsg,
        })
    }

    /// Tente de créer un reprojector - seule l'identité est possible sans le feature
    #[cfg(not(feature = "reproject"))]
    pub fn new(source: SourceSrs, target_epsg: u32) -> Result<Self, ShpError> {
        if source.is_same_as(target_epsg) {
            Ok(Self {
                source,
                target_epsg,
            })
        } else {
            Err(ShpError::projection(format!(
                "reprojection to EPSG:{} requires the 'reproject' feature",
                target_epsg
            )))
        }
    }

    /// Retourne la référence source
    pub fn source(&self) -> &SourceSrs {
        &self.source
    }

    /// Retourne le SRID cible
    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    /// Transforme une suite de points (transformation batch)
    pub fn transform_points<P: Planar>(&self, points: &[P]) -> Result<Vec<P>, ShpError> {
        let mut coords: Vec<(f64, f64)> = points.iter().map(Planar::xy).collect();
        self.convert(&mut coords)?;

        Ok(points
            .iter()
            .zip(coords)
            .map(|(p, (x, y))| p.with_xy(x, y))
            .collect())
    }

    #[cfg(feature = "reproject")]
    fn convert(&self, coords: &mut [(f64, f64)]) -> Result<(), ShpError> {
        if let Some(proj) = &self.proj {
            proj.convert_array(coords)
                .map_err(|e| ShpError::projection(format!("batch transformation failed: {}", e)))?;
        }
        Ok(())
    }

    #[cfg(not(feature = "reproject"))]
    fn convert(&self, _coords: &mut [(f64, f64)]) -> Result<(), ShpError> {
        Ok(())
    }

    fn transform_rings<P: Planar>(
        &self,
        rings: &[PolygonRing<P>],
    ) -> Result<Vec<PolygonRing<P>>, ShpError> {
        rings
            .iter()
            .map(|ring| {
                let points = self.transform_points(ring.points())?;
                Ok(match ring {
                    PolygonRing::Outer(_) => PolygonRing::Outer(points),
                    PolygonRing::Inner(_) => PolygonRing::Inner(points),
                })
            })
            .collect()
    }

    /// Transforme une géométrie polygonale
    pub fn transform_shape(&self, shape: &PolygonShape) -> Result<PolygonShape, ShpError> {
        Ok(match shape {
            PolygonShape::Polygon(p) => {
                PolygonShape::Polygon(Polygon::with_rings(self.transform_rings(p.rings())?))
            }
            PolygonShape::PolygonZ(p) => {
                PolygonShape::PolygonZ(PolygonZ::with_rings(self.transform_rings(p.rings())?))
            }
            PolygonShape::PolygonM(p) => {
                PolygonShape::PolygonM(PolygonM::with_rings(self.transform_rings(p.rings())?))
            }
        })
    }
}

/// Reprojette un shapefile (première et unique couche) en mémoire
///
/// Sans `epsg_from`, la référence source est lue dans le .prj du fichier.
/// Le jeu de données n'est pas enregistré sur disque (voir `save_vector`).
pub fn reproject_vector(
    path: &Path,
    epsg_from: Option<u32>,
    epsg_to: Option<u32>,
) -> Result<VectorDataset, ShpError> {
    let target = epsg_to.ok_or(ShpError::MissingTargetSrs)?;

    let source = match epsg_from {
        Some(code) => SourceSrs::Epsg(code),
        None => SourceSrs::Wkt(prj::read_wkt(path)?),
    };
    let reprojector = Reprojector::new(source, target)?;

    let input = dataset::read_polygons(path)?;
    let features = input
        .features
        .into_iter()
        .map(|f| {
            Ok(VectorFeature {
                shape: reprojector.transform_shape(&f.shape)?,
                record: f.record,
            })
        })
        .collect::<Result<Vec<_>, ShpError>>()?;

    info!(
        layer = %input.layer_name,
        features = features.len(),
        source = ?reprojector.source(),
        target = target,
        "Layer reprojected"
    );

    Ok(VectorDataset {
        layer_name: input.layer_name,
        epsg: Some(target),
        table_info: input.table_info,
        features,
        has_code_page: input.has_code_page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::{Point, PointZ};

    #[test]
    fn test_identity_transform() {
        let reprojector = Reprojector::new(SourceSrs::Epsg(4326), 4326).unwrap();
        let points = vec![Point::new(-100.1234, 40.0), Point::new(-75.5, 39.25)];

        let result = reprojector.transform_points(&points).unwrap();
        assert_eq!(result, points);
    }

    #[test]
    fn test_keeps_z_and_m() {
        let reprojector = Reprojector::new(SourceSrs::Epsg(4269), 4269).unwrap();
        let points = vec![PointZ::new(-90.0, 35.0, 12.0, 3.0)];

        let result = reprojector.transform_points(&points).unwrap();
        assert_eq!(result[0].z, 12.0);
        assert_eq!(result[0].m, 3.0);
    }

    #[test]
    fn test_missing_target() {
        let result = reproject_vector(Path::new("states.shp"), Some(4269), None);
        assert!(matches!(result, Err(ShpError::MissingTargetSrs)));
    }

    #[cfg(feature = "reproject")]
    #[test]
    fn test_nad83_to_wgs84() {
        // Denver, NAD83 : le décalage avec WGS84 est de l'ordre du mètre
        let reprojector = Reprojector::new(SourceSrs::Epsg(4269), 4326).unwrap();
        let result = reprojector
            .transform_points(&[Point::new(-104.9903, 39.7392)])
            .unwrap();

        assert!((result[0].x - (-104.9903)).abs() < 0.001, "x={}", result[0].x);
        assert!((result[0].y - 39.7392).abs() < 0.001, "y={}", result[0].y);
    }

    #[cfg(feature = "reproject")]
    #[test]
    fn test_web_mercator_to_wgs84() {
        let reprojector = Reprojector::new(SourceSrs::Epsg(3857), 4326).unwrap();
        let result = reprojector
            .transform_points(&[Point::new(-11131949.08, 4865942.28)])
            .unwrap();

        assert!((result[0].x - (-100.0)).abs() < 0.0001, "x={}", result[0].x);
        assert!((result[0].y - 40.0).abs() < 0.0001, "y={}", result[0].y);
    }

    #[cfg(feature = "reproject")]
    #[test]
    fn test_invalid_epsg() {
        assert!(Reprojector::new(SourceSrs::Epsg(99999), 4326).is_err());
    }
}
