//! Tests d'intégration PostgreSQL
//!
//! Ces tests nécessitent une base PostgreSQL/PostGIS disponible.
//! Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE
//!
//! Exécution:
//! ```bash
//! docker run -d --name postgres-test -e POSTGRES_PASSWORD=test -p 5432:5432 postgis/postgis
//! PGPASSWORD=test PGDATABASE=postgres cargo test --test postgres_integration -- --ignored --test-threads=1
//! ```

use anyhow::Result;
use states_map::db::{create_pool, Database, DatabaseConfig};
use states_map::{normalize_point, ErrorKind, SizeClass};

const SCHEMA: &str = "states_map_test";

/// Base de test : schéma recréé, un « état » carré sur le Colorado
async fn setup() -> Result<Database> {
    let pool = create_pool(&DatabaseConfig::from_env())?;
    let db = Database::new(pool.clone(), SCHEMA);

    let client = pool.get().await?;
    client
        .batch_execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", SCHEMA))
        .await?;
    drop(client);

    db.ensure_schema().await?;
    assert!(!db.states_table_exists().await?);

    let client = pool.get().await?;
    client
        .batch_execute(&format!(
            r#"
            CREATE TABLE {table} (
                gid SERIAL PRIMARY KEY,
                name VARCHAR(100),
                geom geometry(MultiPolygon, 4326)
            );
            INSERT INTO {table} (name, geom) VALUES (
                'Colorado',
                ST_GeomFromText('MULTIPOLYGON(((-109.05 37, -102.05 37, -102.05 41, -109.05 41, -109.05 37)))', 4326)
            );
            "#,
            table = db.states_table()
        ))
        .await?;

    Ok(db)
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_ensure_schema_is_idempotent() -> Result<()> {
    let db = setup().await?;
    db.ensure_schema().await?;
    assert!(db.states_table_exists().await?);
    assert!(db.list_bookmarks().await?.is_empty());
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_insert_bookmark_inside() -> Result<()> {
    let db = setup().await?;

    let point = normalize_point("-104.991234567", "39.7", "Denver")?;
    let saved = db.insert_bookmark(&point).await?;
    assert_eq!(saved.lon, -104.9912);
    assert_eq!(saved.size, SizeClass::MIN);

    let pool = create_pool(&DatabaseConfig::from_env())?;
    let client = pool.get().await?;
    let row = client
        .query_one(
            &format!(
                "SELECT ST_X(geom), ST_Y(geom), ST_SRID(geom) FROM {} WHERE id = $1",
                db.bookmarks_table()
            ),
            &[&saved.id],
        )
        .await?;
    assert_eq!(row.get::<_, f64>(0), -104.9912);
    assert_eq!(row.get::<_, f64>(1), 39.7);
    assert_eq!(row.get::<_, i32>(2), 4326);
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_insert_bookmark_outside_is_rejected() -> Result<()> {
    let db = setup().await?;

    let point = normalize_point("2.35", "48.85", "Paris")?;
    let err = db.insert_bookmark(&point).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "the point is not inside USA");

    // Rien n'est enregistré
    assert!(db.list_bookmarks().await?.is_empty());
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_list_bookmarks_in_insertion_order() -> Result<()> {
    let db = setup().await?;

    db.insert_bookmark(&normalize_point("-105", "39", "a")?).await?;
    db.insert_bookmark(&normalize_point("-103.5", "38.25", "b")?)
        .await?;

    let all = db.list_bookmarks().await?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].label, "a");
    assert_eq!(all[0].size, SizeClass::MAX);
    assert_eq!(all[1].label, "b");
    assert_eq!(all[1].size.get(), 3);
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_fetch_states() -> Result<()> {
    let db = setup().await?;

    let collection = db.fetch_states_geojson().await?;
    assert_eq!(collection.features.len(), 1);
    let name = collection.features[0]
        .property("name")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    assert_eq!(name.as_deref(), Some("Colorado"));

    let polygons = db.state_polygons().await?;
    assert_eq!(polygons.len(), 1);
    assert_eq!(polygons[0].exterior().0.len(), 5);
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_failed_upload_leaves_connection_usable() -> Result<()> {
    setup().await?;

    // Une seule connexion : la reprise doit réutiliser celle de l'échec
    let pool = create_pool(&DatabaseConfig {
        pool_size: 1,
        ..DatabaseConfig::from_env()
    })?;
    let db = Database::new(pool, SCHEMA);

    let failing = format!(
        "SET CLIENT_ENCODING TO UTF8;\nBEGIN;\nCREATE TABLE {schema}.upload_t (a int);\nINSERT INTO {schema}.upload_t VALUES ('oops');\nCOMMIT;",
        schema = SCHEMA
    );
    let err = db.upload_states_sql(&failing).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(
        err.to_string().contains("invalid input syntax for type integer"),
        "{}",
        err
    );

    // La connexion accepte les requêtes suivantes
    let retry = format!(
        "BEGIN;\nCREATE TABLE {schema}.upload_ok (a int);\nCOMMIT;",
        schema = SCHEMA
    );
    db.upload_states_sql(&retry).await?;
    assert!(db.states_table_exists().await?);

    let saved = db
        .insert_bookmark(&normalize_point("-105", "39", "after")?)
        .await?;
    assert_eq!(db.list_bookmarks().await?[0].id, saved.id);
    Ok(())
}
