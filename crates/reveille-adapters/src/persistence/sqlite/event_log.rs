use async_trait::async_trait;

use reveille_core::events::DomainEvent;
use reveille_ports::error::PortError;
use reveille_ports::outbound::EventPublisher;

use super::SqliteDb;

#[async_trait]
impl EventPublisher for SqliteDb {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        for event in &events {
            let event_type = event.event_type();
            let data =
                serde_json::to_string(event).map_err(|e| PortError::Persistence(e.to_string()))?;
            let occurred_at = event.occurred_at().to_rfc3339();

            sqlx::query("INSERT INTO event_log (event_type, data, occurred_at) VALUES (?, ?, ?)")
                .bind(event_type)
                .bind(&data)
                .bind(&occurred_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))
    }
}
