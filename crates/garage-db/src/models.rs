//! Database row types — these map directly to SQLite rows.
//! Distinct from garage-types models to keep the DB layer independent.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use garage_types::models::CarRecord;
use uuid::Uuid;

pub struct CarRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: String,
    pub images: String,
    pub created_at: String,
    pub updated_at: String,
}

impl CarRow {
    pub fn from_record(car: &CarRecord) -> Result<Self> {
        Ok(Self {
            id: car.id.to_string(),
            owner_id: car.owner_id.clone(),
            title: car.title.clone(),
            description: car.description.clone(),
            tags: serde_json::to_string(&car.tags)?,
            images: serde_json::to_string(&car.images)?,
            created_at: format_timestamp(&car.created_at),
            updated_at: format_timestamp(&car.updated_at),
        })
    }

    pub fn into_record(self) -> Result<CarRecord> {
        Ok(CarRecord {
            id: self
                .id
                .parse::<Uuid>()
                .with_context(|| format!("corrupt car id '{}'", self.id))?,
            tags: serde_json::from_str::<Vec<String>>(&self.tags)
                .with_context(|| format!("corrupt tags on car '{}'", self.id))?,
            images: serde_json::from_str::<Vec<String>>(&self.images)
                .with_context(|| format!("corrupt images on car '{}'", self.id))?,
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("corrupt created_at on car '{}'", self.id))?,
            updated_at: parse_timestamp(&self.updated_at)
                .with_context(|| format!("corrupt updated_at on car '{}'", self.id))?,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
        })
    }
}

// Fixed-width so ORDER BY on the text column matches chronological order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
