//! Table des favoris

use tracing::info;

use super::Database;
use crate::bookmark::{Bookmark, NewBookmark, SizeClass};
use crate::error::{AppError, Result};

impl Database {
    /// Enregistre un favori s'il se trouve dans un des états
    ///
    /// Le test d'inclusion, l'insertion et le calcul de la géométrie sont
    /// faits dans une même transaction, sur les coordonnées tronquées.
    pub async fn insert_bookmark(&self, point: &NewBookmark) -> Result<Bookmark> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let lon = point.lon.value;
        let lat = point.lat.value;

        let inside: bool = tx
            .query_one(
                &format!(
                    "SELECT EXISTS (
                        SELECT 1 FROM {} AS s
                        WHERE ST_Contains(s.geom, ST_SetSRID(ST_MakePoint($1, $2), 4326))
                    )",
                    self.states_table()
                ),
                &[&lon, &lat],
            )
            .await?
            .get(0);

        if !inside {
            // La transaction est annulée à sa destruction
            return Err(AppError::validation("the point is not inside USA"));
        }

        let size = i32::from(point.size.get());
        let id: i32 = tx
            .query_one(
                &format!(
                    "INSERT INTO {} (lon, lat, label, size) VALUES ($1, $2, $3, $4) RETURNING id",
                    self.bookmarks_table()
                ),
                &[&lon, &lat, &point.label, &size],
            )
            .await?
            .get(0);

        tx.execute(
            &format!(
                "UPDATE {} SET geom = ST_SetSRID(ST_MakePoint(lon, lat), 4326) WHERE id = $1",
                self.bookmarks_table()
            ),
            &[&id],
        )
        .await?;

        tx.commit().await?;

        info!(id = id, lon = lon, lat = lat, size = size, "Bookmark saved");

        Ok(Bookmark {
            id,
            lon,
            lat,
            label: point.label.clone(),
            size: point.size,
        })
    }

    /// Liste tous les favoris
    pub async fn list_bookmarks(&self) -> Result<Vec<Bookmark>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT id, lon, lat, label, size FROM {} ORDER BY id",
                    self.bookmarks_table()
                ),
                &[],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| Bookmark {
                id: row.get(0),
                lon: row.get(1),
                lat: row.get(2),
                label: row.get(3),
                size: SizeClass::from_stored(row.get(4)),
            })
            .collect())
    }
}
