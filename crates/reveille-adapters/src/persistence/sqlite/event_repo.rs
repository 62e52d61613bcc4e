use async_trait::async_trait;

use reveille_core::event::Event;
use reveille_ports::error::PortError;
use reveille_ports::outbound::EventRepository;

use super::SqliteDb;

/// Key the whole event list is stored under.
pub const EVENTS_KEY: &str = "eventAlarms";

#[async_trait]
impl EventRepository for SqliteDb {
    async fn load(&self) -> Result<Vec<Event>, PortError> {
        let events = self.get_json::<Vec<Event>>(EVENTS_KEY).await?;
        Ok(events.unwrap_or_default())
    }

    async fn save(&self, events: &[Event]) -> Result<(), PortError> {
        self.set_json(EVENTS_KEY, events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use reveille_core::alarm::{AlarmDraft, AlarmTime, Day};

    async fn db() -> SqliteDb {
        SqliteDb::new("sqlite::memory:").await.unwrap()
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn gym() -> Event {
        Event::create(
            "GYM",
            Some("training".into()),
            "Bell Hammer.mp3",
            vec![
                AlarmDraft::new(Day::Monday, AlarmTime::new(6, 0).unwrap()),
                AlarmDraft::new(Day::Thursday, AlarmTime::new(18, 30).unwrap())
                    .with_description("legs"),
            ],
            ts("2025-01-13T06:00:00Z"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn empty_database_loads_no_events() {
        let db = db().await;
        assert!(db.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_returns_same_events() {
        let db = db().await;
        let events = vec![gym()];
        db.save(&events).await.unwrap();
        assert_eq!(db.load().await.unwrap(), events);

        db.save(&[]).await.unwrap();
        assert!(db.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_list_written_by_earlier_app_versions() {
        let db = db().await;
        let legacy = r#"[{
            "id": "event_1705125600000_k3j9x",
            "eventName": "WORK",
            "description": "",
            "ringtone": "Office Phone.mp3",
            "isEnabled": false,
            "createdAt": "2024-01-13T06:00:00.000Z",
            "alarms": [
                {"id": "alarm_1", "day": "Monday", "time": "07:30", "description": "standup"},
                {"id": "alarm_2", "day": "Friday", "time": "07:30", "description": "", "enabled": false}
            ]
        }]"#;
        sqlx::query("INSERT INTO kv_store (key, value) VALUES (?, ?)")
            .bind(EVENTS_KEY)
            .bind(legacy)
            .execute(db.pool())
            .await
            .unwrap();

        let events = db.load().await.unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.name(), "WORK");
        assert_eq!(event.description(), None);
        assert!(!event.is_enabled());
        assert_eq!(event.alarms().len(), 2);
        assert!(event.alarms()[0].is_enabled());
        assert_eq!(event.alarms()[0].description(), Some("standup"));
        assert!(!event.alarms()[1].is_enabled());
    }
}
