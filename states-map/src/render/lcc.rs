//! Projection conique conforme de Lambert (2 parallèles standards)
//!
//! Projection directe sur l'ellipsoïde WGS84, sans false easting/northing :
//! l'origine (lon0, lat0) est projetée en (0, 0).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Demi grand axe WGS84
const A: f64 = 6378137.0;
/// Aplatissement WGS84
const F: f64 = 1.0 / 298.257223563;

/// Calcule la latitude isométrique
fn isometric_latitude(lat: f64, e: f64) -> f64 {
    let sin_lat = lat.sin();
    let term = ((1.0 - e * sin_lat) / (1.0 + e * sin_lat)).powf(e / 2.0);
    ((FRAC_PI_4 + lat / 2.0).tan() * term).ln()
}

/// Calcule la grande normale (rayon de courbure dans le plan vertical)
fn grande_normale(lat: f64, a: f64, e2: f64) -> f64 {
    a / (1.0 - e2 * lat.sin().powi(2)).sqrt()
}

/// Paramètres pré-calculés d'une projection LCC
#[derive(Debug, Clone, Copy)]
pub struct LambertConformalConic {
    /// Longitude origine (radians)
    lon0: f64,
    /// Exposant de la projection
    n: f64,
    /// Constante C
    c: f64,
    /// Rayon à l'origine
    r0: f64,
}

impl LambertConformalConic {
    /// Crée une projection (angles en degrés)
    pub fn new(lon0: f64, lat0: f64, lat1: f64, lat2: f64) -> Self {
        let e2 = 2.0 * F - F * F;
        let e = e2.sqrt();

        let (lat0, lat1, lat2) = (lat0.to_radians(), lat1.to_radians(), lat2.to_radians());

        let n1 = grande_normale(lat1, A, e2);
        let n2 = grande_normale(lat2, A, e2);
        let iso_lat1 = isometric_latitude(lat1, e);
        let iso_lat2 = isometric_latitude(lat2, e);

        let n = if (lat1 - lat2).abs() < 1e-10 {
            lat1.sin()
        } else {
            ((n1 * lat1.cos()).ln() - (n2 * lat2.cos()).ln()) / (iso_lat2 - iso_lat1)
        };
        let c = (n1 * lat1.cos() / n) * (n * iso_lat1).exp();
        let r0 = c * (-n * isometric_latitude(lat0, e)).exp();

        Self {
            lon0: lon0.to_radians(),
            n,
            c,
            r0,
        }
    }

    /// Projection des États-Unis contigus utilisée pour la carte statique
    pub fn conus() -> Self {
        Self::new(-98.7, 39.0, 33.0, 45.0)
    }

    /// Projette (lon, lat) en degrés vers (x, y) en mètres
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let e = (2.0 * F - F * F).sqrt();
        // Les pôles sont ramenés juste à l'intérieur du domaine
        let lat = lat.to_radians().clamp(-FRAC_PI_2 + 1e-9, FRAC_PI_2 - 1e-9);

        let r = self.c * (-self.n * isometric_latitude(lat, e)).exp();
        let gamma = self.n * (lon.to_radians() - self.lon0);

        (r * gamma.sin(), self.r0 - r * gamma.cos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_zero() {
        let lcc = LambertConformalConic::conus();
        let (x, y) = lcc.project(-98.7, 39.0);
        assert!(x.abs() < 1e-6, "x={}", x);
        assert!(y.abs() < 1e-6, "y={}", y);
    }

    #[test]
    fn test_symmetric_about_central_meridian() {
        let lcc = LambertConformalConic::conus();
        let (xw, yw) = lcc.project(-108.7, 40.0);
        let (xe, ye) = lcc.project(-88.7, 40.0);
        assert!((xw + xe).abs() < 1e-6);
        assert!((yw - ye).abs() < 1e-6);
        assert!(xw < 0.0 && xe > 0.0);
    }

    #[test]
    fn test_true_scale_on_standard_parallel() {
        // Sur un parallèle standard, un petit arc de longitude garde sa longueur
        let lcc = LambertConformalConic::conus();
        let lat = 33.0_f64;
        let dlon = 0.001_f64;

        let (x1, y1) = lcc.project(-98.7, lat);
        let (x2, y2) = lcc.project(-98.7 + dlon, lat);
        let projected = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();

        let e2 = 2.0 * F - F * F;
        let expected = grande_normale(lat.to_radians(), A, e2) * lat.to_radians().cos()
            * dlon.to_radians();

        assert!((projected / expected - 1.0).abs() < 1e-6, "ratio={}", projected / expected);
    }

    #[test]
    fn test_north_is_up() {
        let lcc = LambertConformalConic::conus();
        let (_, south) = lcc.project(-98.7, 25.0);
        let (_, north) = lcc.project(-98.7, 48.0);
        assert!(north > south);
    }
}
