//! The fingerprint source: two ordered row sets read from the service
//! configuration database.
//!
//! The services query must yield `service_id, group_id`; the products query
//! must yield `service_id`. Both must be ordered by `service_id` so that
//! unchanged data fingerprints identically across polls.

use std::future::Future;

use serde::Serialize;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::fingerprint::{fingerprint, Fingerprint, HashAlgorithm, RowHasher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ServiceRow {
    pub service_id: i64,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub service_id: i64,
}

/// One poll of the data source.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub services: Vec<ServiceRow>,
    pub products: Vec<ProductRow>,
    pub fingerprint: Fingerprint,
}

impl Snapshot {
    #[cfg(test)]
    pub(crate) fn bare(fingerprint: impl Into<Fingerprint>) -> Self {
        Self {
            services: Vec::new(),
            products: Vec::new(),
            fingerprint: fingerprint.into(),
        }
    }
}

pub trait FingerprintSource {
    fn fetch(&self) -> impl Future<Output = Result<Snapshot>> + Send;
}

pub struct SqlSource {
    pool: AnyPool,
    services_query: String,
    products_query: String,
    hasher: Box<dyn RowHasher>,
}

impl SqlSource {
    /// Build a source without connecting. Connection failures surface on
    /// `fetch`, so an unreachable database at startup is an ordinary fetch
    /// failure rather than a fatal one.
    pub fn connect_lazy(url: &str, cfg: &DatabaseConfig, hash: HashAlgorithm) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(cfg.connect_timeout())
            .connect_lazy(url)?;
        Ok(Self::from_pool(pool, cfg, hash.hasher()))
    }

    pub fn from_pool(pool: AnyPool, cfg: &DatabaseConfig, hasher: Box<dyn RowHasher>) -> Self {
        Self {
            pool,
            services_query: cfg.services_query.clone(),
            products_query: cfg.products_query.clone(),
            hasher,
        }
    }
}

impl FingerprintSource for SqlSource {
    async fn fetch(&self) -> Result<Snapshot> {
        let services: Vec<ServiceRow> = sqlx::query_as(&self.services_query)
            .fetch_all(&self.pool)
            .await?;
        let products: Vec<ProductRow> = sqlx::query_as(&self.products_query)
            .fetch_all(&self.pool)
            .await?;

        let fingerprint = fingerprint(self.hasher.as_ref(), &services, &products)?;
        debug!(
            services = services.len(),
            products = products.len(),
            fingerprint = %fingerprint,
            "fetched snapshot"
        );
        Ok(Snapshot {
            services,
            products,
            fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seeded(dir: &TempDir) -> (String, AnyPool) {
        sqlx::any::install_default_drivers();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("recopick.db").display());
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap();
        for stmt in [
            "CREATE TABLE SERVICE (service_id INTEGER PRIMARY KEY, group_id INTEGER, ignore_logs INTEGER NOT NULL)",
            "CREATE TABLE SERVICE_PRODUCT (service_id INTEGER NOT NULL, type TEXT NOT NULL, enabled INTEGER NOT NULL)",
        ] {
            sqlx::query(stmt).execute(&pool).await.unwrap();
        }
        (url, pool)
    }

    async fn exec(pool: &AnyPool, sql: &str) {
        sqlx::query(sql).execute(pool).await.unwrap();
    }

    fn source(pool: &AnyPool) -> SqlSource {
        SqlSource::from_pool(
            pool.clone(),
            &DatabaseConfig::default(),
            HashAlgorithm::Sip.hasher(),
        )
    }

    #[tokio::test]
    async fn empty_tables_yield_sentinel() {
        let dir = TempDir::new().unwrap();
        let (_url, pool) = seeded(&dir).await;
        let snap = source(&pool).fetch().await.unwrap();
        assert!(snap.fingerprint.is_sentinel());
        assert!(snap.services.is_empty());
    }

    #[tokio::test]
    async fn filters_and_orders_rows() {
        let dir = TempDir::new().unwrap();
        let (_url, pool) = seeded(&dir).await;
        exec(&pool, "INSERT INTO SERVICE VALUES (30, 3, 0), (10, 1, 0), (20, 2, 1)").await;
        exec(
            &pool,
            "INSERT INTO SERVICE_PRODUCT VALUES (30, 'user', 1), (10, 'user', 1), (10, 'item', 1), (20, 'user', 0)",
        )
        .await;

        let snap = source(&pool).fetch().await.unwrap();
        assert_eq!(
            snap.services,
            vec![
                ServiceRow { service_id: 10, group_id: Some(1) },
                ServiceRow { service_id: 30, group_id: Some(3) },
            ]
        );
        assert_eq!(
            snap.products,
            vec![ProductRow { service_id: 10 }, ProductRow { service_id: 30 }]
        );
        assert!(!snap.fingerprint.is_sentinel());
    }

    #[tokio::test]
    async fn unchanged_data_is_idempotent_and_changes_are_seen() {
        let dir = TempDir::new().unwrap();
        let (_url, pool) = seeded(&dir).await;
        exec(&pool, "INSERT INTO SERVICE VALUES (1, 7, 0)").await;
        exec(&pool, "INSERT INTO SERVICE_PRODUCT VALUES (1, 'user', 1)").await;
        let src = source(&pool);

        let first = src.fetch().await.unwrap().fingerprint;
        let second = src.fetch().await.unwrap().fingerprint;
        assert_eq!(first, second);

        exec(&pool, "UPDATE SERVICE SET group_id = 8 WHERE service_id = 1").await;
        let third = src.fetch().await.unwrap().fingerprint;
        assert_ne!(first, third);
    }

    #[tokio::test]
    async fn lazy_source_connects_on_fetch() {
        let dir = TempDir::new().unwrap();
        let (url, pool) = seeded(&dir).await;
        exec(&pool, "INSERT INTO SERVICE VALUES (1, NULL, 0)").await;
        pool.close().await;

        let src = SqlSource::connect_lazy(&url, &DatabaseConfig::default(), HashAlgorithm::Sha256)
            .unwrap();
        let snap = src.fetch().await.unwrap();
        assert_eq!(snap.services, vec![ServiceRow { service_id: 1, group_id: None }]);
        assert!(snap.fingerprint.as_str().ends_with(",0"));
    }

    #[tokio::test]
    async fn missing_table_is_a_data_source_error() {
        let dir = TempDir::new().unwrap();
        sqlx::any::install_default_drivers();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("empty.db").display());
        let src =
            SqlSource::connect_lazy(&url, &DatabaseConfig::default(), HashAlgorithm::Sip).unwrap();
        let err = src.fetch().await.unwrap_err();
        assert!(matches!(err, crate::error::WatchError::DataSource(_)));
    }
}
