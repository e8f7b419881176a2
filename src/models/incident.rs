use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{FromRow, Row};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An incident row as read from `unified_incidents`.
#[derive(Debug, Clone)]
pub struct Incident {
    pub id: i64,
    pub source: String,
    pub source_id: String,
    pub event_type: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub details: Value,
    pub notification_id: Option<String>,
}

impl Incident {
    /// Latitude and longitude, only when both are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

impl<'r> FromRow<'r, PgRow> for Incident {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let details: Option<Json<Value>> = row.try_get("details")?;
        Ok(Self {
            id: row.try_get("id")?,
            source: row.try_get("source")?,
            source_id: row.try_get::<Option<String>, _>("source_id")?.unwrap_or_default(),
            event_type: row.try_get::<Option<String>, _>("event_type")?.unwrap_or_default(),
            address: row.try_get::<Option<String>, _>("address")?.unwrap_or_default(),
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            timestamp: utc_timestamp(row.try_get("timestamp"), || row.try_get("timestamp"))?,
            details: details.map(|d| d.0).unwrap_or(Value::Null),
            notification_id: row.try_get("notification_id")?,
        })
    }
}

/// Accepts `timestamptz`, or a plain `timestamp` taken to be UTC.
fn utc_timestamp(
    zoned: Result<DateTime<Utc>, sqlx::Error>,
    naive: impl FnOnce() -> Result<NaiveDateTime, sqlx::Error>,
) -> Result<DateTime<Utc>, sqlx::Error> {
    zoned.or_else(|_| naive().map(|n| n.and_utc()))
}

/// A cleared incident that still has a live notification.
#[derive(Debug, Clone, FromRow)]
pub struct ClearedIncident {
    pub id: i64,
    pub source: String,
    pub address: Option<String>,
    pub notification_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown incident source: {0}")]
pub struct UnknownSource(pub String);

/// Origin feed of an incident, taken from the `source` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentSource {
    Ncdot,
    Rwecc,
    ArcgisPolice,
}

impl IncidentSource {
    pub fn as_str(self) -> &'static str {
        match self {
            IncidentSource::Ncdot => "NCDOT",
            IncidentSource::Rwecc => "RWECC",
            IncidentSource::ArcgisPolice => "ArcGIS_Police",
        }
    }

    /// Police incidents are never enriched with camera imagery.
    pub fn uses_cameras(self) -> bool {
        !matches!(self, IncidentSource::ArcgisPolice)
    }
}

impl FromStr for IncidentSource {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NCDOT" => Ok(IncidentSource::Ncdot),
            "RWECC" => Ok(IncidentSource::Rwecc),
            "ArcGIS_Police" => Ok(IncidentSource::ArcgisPolice),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

impl fmt::Display for IncidentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_tags_parse() {
        assert_eq!("NCDOT".parse::<IncidentSource>(), Ok(IncidentSource::Ncdot));
        assert_eq!("RWECC".parse::<IncidentSource>(), Ok(IncidentSource::Rwecc));
        assert_eq!(
            "ArcGIS_Police".parse::<IncidentSource>(),
            Ok(IncidentSource::ArcgisPolice)
        );
        assert_eq!(
            "WAZE".parse::<IncidentSource>(),
            Err(UnknownSource("WAZE".to_string()))
        );
    }

    #[test]
    fn naive_timestamp_is_read_as_utc() {
        let naive = NaiveDateTime::parse_from_str("2024-05-01 12:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let mismatch = Err(sqlx::Error::ColumnNotFound("timestamp".to_string()));

        let at = utc_timestamp(mismatch, || Ok(naive)).unwrap();
        assert_eq!(at.to_rfc3339(), "2024-05-01T12:30:00+00:00");
    }

    #[test]
    fn unreadable_timestamp_is_an_error() {
        let result = utc_timestamp(Err(sqlx::Error::RowNotFound), || Err(sqlx::Error::RowNotFound));
        assert!(result.is_err());
    }

    #[test]
    fn police_skips_cameras() {
        assert!(IncidentSource::Ncdot.uses_cameras());
        assert!(IncidentSource::Rwecc.uses_cameras());
        assert!(!IncidentSource::ArcgisPolice.uses_cameras());
    }
}
