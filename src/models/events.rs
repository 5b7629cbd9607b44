use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, row_id};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Event {
    #[serde(with = "row_id")]
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub description: String,
    pub event_date: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct EventRsvp {
    #[serde(with = "row_id")]
    pub id: String,
    #[serde(with = "row_id")]
    pub event_id: String,
    pub student_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewEventRsvp {
    pub event_id: String,
    pub student_id: String,
}
