use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

use super::backend::{insert_as, select_as, Backend, Query};
use crate::models::events::{Event, EventRsvp, NewEventRsvp};

#[derive(Clone)]
pub struct EventRepository {
    backend: Arc<dyn Backend>,
}

impl EventRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Events dated at or after `since`, soonest first.
    pub async fn upcoming(&self, since: DateTime<Utc>) -> Result<Vec<Event>, anyhow::Error> {
        select_as(
            self.backend.as_ref(),
            "events",
            &Query::new()
                .gte("event_date", since.to_rfc3339_opts(SecondsFormat::Millis, true))
                .order("event_date", true),
        )
        .await
    }

    pub async fn rsvps(&self, student_id: &str) -> Result<Vec<EventRsvp>, anyhow::Error> {
        select_as(
            self.backend.as_ref(),
            "event_rsvps",
            &Query::new().eq("student_id", student_id),
        )
        .await
    }

    pub async fn rsvp(&self, rsvp: &NewEventRsvp) -> Result<EventRsvp, anyhow::Error> {
        insert_as(self.backend.as_ref(), "event_rsvps", rsvp).await
    }
}
