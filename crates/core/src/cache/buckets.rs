//! Bucket lifecycle: open, enumerate, delete.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Create a bucket if it doesn't exist yet. Idempotent.
    pub async fn open_bucket(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM buckets WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every stored bucket, across all generations, oldest first.
    pub async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket and all of its entries.
    ///
    /// Returns false if the bucket did not exist.
    pub async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE bucket = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::super::connection::CacheDb;

    #[tokio::test]
    async fn test_open_bucket_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket("weather-api-v10.0.0").await.unwrap();
        db.open_bucket("weather-api-v10.0.0").await.unwrap();
        assert_eq!(db.bucket_names().await.unwrap(), vec!["weather-api-v10.0.0"]);
    }

    #[tokio::test]
    async fn test_bucket_names_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["b", "a", "c"] {
            db.open_bucket(name).await.unwrap();
        }
        assert_eq!(db.bucket_names().await.unwrap(), vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_delete_bucket() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_bucket("old").await.unwrap();
        assert!(db.has_bucket("old").await.unwrap());

        assert!(db.delete_bucket("old").await.unwrap());
        assert!(!db.has_bucket("old").await.unwrap());
        assert!(!db.delete_bucket("old").await.unwrap());
    }
}
