//! Table des états : création du schéma, chargement, lecture

use geo::{Geometry, Polygon};
use geojson::FeatureCollection;
use geozero::wkb::Wkb;
use geozero::ToGeo;
use tracing::{info, warn};

use super::Database;
use crate::error::{AppError, Result};

impl Database {
    /// Crée le schéma, l'extension PostGIS et la table des favoris
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;

        client
            .execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema), &[])
            .await?;

        // CREATE EXTENSION peut demander des droits superuser : on accepte
        // une extension déjà installée
        if let Err(e) = client
            .execute("CREATE EXTENSION IF NOT EXISTS postgis", &[])
            .await
        {
            warn!("CREATE EXTENSION postgis failed (will check if already installed): {e}");
            let exists = client
                .query_opt("SELECT 1 FROM pg_extension WHERE extname = 'postgis'", &[])
                .await?
                .is_some();
            if !exists {
                return Err(AppError::validation(format!(
                    "PostGIS extension is not installed and could not be created: {e}"
                )));
            }
        }

        client
            .execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        id SERIAL PRIMARY KEY,
                        lon DOUBLE PRECISION NOT NULL,
                        lat DOUBLE PRECISION NOT NULL,
                        label TEXT NOT NULL DEFAULT '',
                        size INTEGER NOT NULL CHECK (size BETWEEN 1 AND 5),
                        geom geometry(Point, 4326)
                    )",
                    self.bookmarks_table()
                ),
                &[],
            )
            .await?;

        info!(schema = %self.schema, "Schema ready");
        Ok(())
    }

    /// Indique si la table des états existe
    pub async fn states_table_exists(&self) -> Result<bool> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT to_regclass($1::text) IS NOT NULL",
                &[&self.states_table()],
            )
            .await?;
        Ok(row.get(0))
    }

    /// Exécute le script SQL produit par `shp2pgsql`
    ///
    /// Le script ouvre sa propre transaction. En cas d'échec, elle est annulée
    /// avant que la connexion ne retourne dans le pool.
    pub async fn upload_states_sql(&self, sql: &str) -> Result<()> {
        let client = self.pool.get().await?;
        if let Err(e) = client.batch_execute(sql).await {
            if let Err(rollback) = client.batch_execute("ROLLBACK").await {
                warn!(error = %rollback, "ROLLBACK after failed upload failed");
            }
            return Err(e.into());
        }

        info!(table = %self.states_table(), bytes = sql.len(), "States uploaded");
        Ok(())
    }

    /// Lit les états en GeoJSON (géométrie + `gid`, `name`)
    pub async fn fetch_states_geojson(&self) -> Result<FeatureCollection> {
        let client = self.pool.get().await?;
        let sql = format!(
            "SELECT row_to_json(fc)::text FROM (
                SELECT 'FeatureCollection' AS type,
                       COALESCE(array_to_json(array_agg(f)), '[]'::json) AS features
                FROM (
                    SELECT 'Feature' AS type,
                           ST_AsGeoJSON(s.geom)::json AS geometry,
                           json_build_object('gid', s.gid, 'name', s.name) AS properties
                    FROM {} AS s
                ) AS f
            ) AS fc",
            self.states_table()
        );

        let row = client.query_one(&sql, &[]).await?;
        let json: String = row.get(0);

        let collection: FeatureCollection = json
            .parse()
            .map_err(|e| AppError::validation(format!("invalid states GeoJSON: {}", e)))?;

        info!(features = collection.features.len(), "States GeoJSON fetched");
        Ok(collection)
    }

    /// Lit les polygones des états (WKB décodé)
    pub async fn state_polygons(&self) -> Result<Vec<Polygon<f64>>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT ST_AsBinary(geom) FROM {} WHERE geom IS NOT NULL",
                    self.states_table()
                ),
                &[],
            )
            .await?;

        let mut polygons = Vec::new();
        for row in rows {
            let wkb: Vec<u8> = row.get(0);
            polygons.extend(polygons_from_wkb(wkb)?);
        }
        Ok(polygons)
    }
}

/// Décode une géométrie WKB en polygones (multi-polygones éclatés)
pub fn polygons_from_wkb(wkb: Vec<u8>) -> Result<Vec<Polygon<f64>>> {
    let geometry = Wkb(wkb)
        .to_geo()
        .map_err(|e| AppError::validation(format!("invalid WKB geometry: {}", e)))?;

    Ok(match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0,
        _ => {
            warn!("Non polygonal state geometry skipped");
            Vec::new()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// WKB little-endian d'un polygone carré
    fn square_wkb(x0: f64, y0: f64, side: f64) -> Vec<u8> {
        let ring = [
            (x0, y0),
            (x0 + side, y0),
            (x0 + side, y0 + side),
            (x0, y0 + side),
            (x0, y0),
        ];
        let mut wkb = vec![1u8];
        wkb.extend(3u32.to_le_bytes());
        wkb.extend(1u32.to_le_bytes());
        wkb.extend((ring.len() as u32).to_le_bytes());
        for (x, y) in ring {
            wkb.extend(x.to_le_bytes());
            wkb.extend(y.to_le_bytes());
        }
        wkb
    }

    #[test]
    fn test_polygon_from_wkb() {
        let polygons = polygons_from_wkb(square_wkb(-105.0, 37.0, 4.0)).unwrap();
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].exterior().0.len(), 5);
        assert_eq!(polygons[0].exterior().0[2].x, -101.0);
    }

    #[test]
    fn test_multipolygon_from_wkb() {
        let mut wkb = vec![1u8];
        wkb.extend(6u32.to_le_bytes());
        wkb.extend(2u32.to_le_bytes());
        wkb.extend(square_wkb(-105.0, 37.0, 4.0));
        wkb.extend(square_wkb(-90.0, 30.0, 1.0));

        let polygons = polygons_from_wkb(wkb).unwrap();
        assert_eq!(polygons.len(), 2);
    }

    #[test]
    fn test_invalid_wkb() {
        assert!(polygons_from_wkb(vec![1, 2, 3]).is_err());
    }
}
