//! Lecture de la référence spatiale (.prj) d'un shapefile

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::ShpError;

/// Noms ESRI courants sans autorité EPSG explicite
const ESRI_NAMES: &[(&str, u32)] = &[
    ("GCS_WGS_1984", 4326),
    ("GCS_North_American_1983", 4269),
    ("GCS_North_American_1927", 4267),
    ("WGS_1984_Web_Mercator_Auxiliary_Sphere", 3857),
];

/// WKT ESRI des références que l'on sait écrire dans un .prj
const KNOWN_WKT: &[(u32, &str)] = &[
    (
        4326,
        r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#,
    ),
    (
        4269,
        r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#,
    ),
    (
        3857,
        r#"PROJCS["WGS_1984_Web_Mercator_Auxiliary_Sphere",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Mercator_Auxiliary_Sphere"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",0.0],PARAMETER["Standard_Parallel_1",0.0],PARAMETER["Auxiliary_Sphere_Type",0.0],UNIT["Meter",1.0]]"#,
    ),
];

fn authority_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"AUTHORITY\s*\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]"#).expect("valid regex")
    })
}

/// Chemin du .prj associé à un .shp
pub fn prj_path(shp: &Path) -> PathBuf {
    shp.with_extension("prj")
}

/// Lit le WKT du .prj associé
pub fn read_wkt(shp: &Path) -> Result<String, ShpError> {
    let path = prj_path(shp);
    if !path.exists() {
        return Err(ShpError::MissingProjection(shp.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?.trim().to_string())
}

/// Identifie le code EPSG d'un WKT
///
/// L'autorité la plus externe est la dernière du texte (WKT1).
pub fn identify_epsg(wkt: &str) -> Option<u32> {
    if let Some(code) = authority_regex()
        .captures_iter(wkt)
        .last()
        .and_then(|c| c[1].parse().ok())
    {
        return Some(code);
    }

    let name = wkt
        .split('"')
        .nth(1)
        .unwrap_or_default();

    ESRI_NAMES
        .iter()
        .find(|(esri, _)| esri.eq_ignore_ascii_case(name))
        .map(|(_, code)| *code)
}

/// Retourne le code EPSG d'un shapefile, `None` si non identifiable
pub fn detect_epsg(shp: &Path) -> Result<Option<u32>, ShpError> {
    let wkt = read_wkt(shp)?;
    Ok(identify_epsg(&wkt))
}

/// WKT ESRI d'un code EPSG connu
pub fn esri_wkt(epsg: u32) -> Option<&'static str> {
    KNOWN_WKT
        .iter()
        .find(|(code, _)| *code == epsg)
        .map(|(_, wkt)| *wkt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_census_nad83() {
        // .prj des fichiers cartographiques du Census (TIGER/GENZ)
        let wkt = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137,298.257222101]],PRIMEM["Greenwich",0],UNIT["Degree",0.017453292519943295]]"#;
        assert_eq!(identify_epsg(wkt), Some(4269));
    }

    #[test]
    fn test_identify_outer_authority() {
        let wkt = r#"PROJCS["NAD83 / Conus Albers",GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6269"]],AUTHORITY["EPSG","4269"]],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AUTHORITY["EPSG","5070"]]"#;
        assert_eq!(identify_epsg(wkt), Some(5070));
    }

    #[test]
    fn test_identify_wgs84() {
        assert_eq!(identify_epsg(esri_wkt(4326).unwrap()), Some(4326));
        assert_eq!(identify_epsg(esri_wkt(3857).unwrap()), Some(3857));
    }

    #[test]
    fn test_identify_unknown() {
        assert_eq!(identify_epsg(r#"PROJCS["Custom",GEOGCS["Foo"]]"#), None);
        assert_eq!(identify_epsg(""), None);
    }

    #[test]
    fn test_missing_prj() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("states.shp");
        assert!(matches!(detect_epsg(&shp), Err(ShpError::MissingProjection(_))));
    }

    #[test]
    fn test_detect_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("states.shp");
        std::fs::write(prj_path(&shp), esri_wkt(4269).unwrap()).unwrap();
        assert_eq!(detect_epsg(&shp).unwrap(), Some(4269));
    }
}
