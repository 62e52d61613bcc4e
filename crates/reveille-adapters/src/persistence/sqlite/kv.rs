//! Key-value access shaped like the device storage the event list
//! originally lived in: one JSON document per key.

use serde::de::DeserializeOwned;
use serde::Serialize;

use reveille_ports::error::PortError;

use super::SqliteDb;

impl SqliteDb {
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PortError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        match row {
            Some((value,)) => {
                let parsed =
                    serde_json::from_str(&value).map_err(|e| PortError::Persistence(e.to_string()))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), PortError> {
        let data =
            serde_json::to_string(value).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO kv_store (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }
}
