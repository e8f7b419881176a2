//! Decoding of the per-source `details` document.
//!
//! Two shapes exist in the store. The current one wraps the feed record:
//!
//! ```json
//! {"raw_incident": {...}, "weather": {...} | null}
//! ```
//!
//! Older rows hold the feed record at the top level. A document with a
//! `raw_incident` key is the wrapped shape, any other object the flat one, and
//! anything else falls back to defaults. A field with the wrong type is dropped
//! on its own; the rest of the record survives.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailsShape {
    Wrapped,
    Legacy,
    Unreadable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Details<T> {
    pub incident: T,
    pub weather: Option<Weather>,
    pub shape: DetailsShape,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Weather {
    #[serde(deserialize_with = "lenient_i64")]
    pub temperature: i64,
    #[serde(rename = "windSpeed")]
    pub wind_speed: String,
    #[serde(rename = "shortForecast")]
    pub short_forecast: String,
    pub icon: String,
}

impl Weather {
    pub fn summary(&self) -> String {
        format!(
            "{}\nTemp: {}°F\nWind: {}",
            self.short_forecast, self.temperature, self.wind_speed
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NcdotIncident {
    pub reason: String,
    pub road: String,
    pub location: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub severity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RweccIncident {
    pub problem: String,
    pub jurisdiction: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PoliceIncident {
    pub case_number: String,
    pub crime_description: String,
    pub agency: String,
}

pub fn decode<T>(details: &Value) -> Details<T>
where
    T: DeserializeOwned + Default,
{
    let Some(document) = details.as_object() else {
        return Details {
            incident: T::default(),
            weather: None,
            shape: DetailsShape::Unreadable,
        };
    };

    match document.get("raw_incident") {
        Some(raw) => Details {
            incident: raw.as_object().map(decode_fields).unwrap_or_default(),
            weather: document
                .get("weather")
                .and_then(|w| Option::<Weather>::deserialize(w).ok().flatten()),
            shape: DetailsShape::Wrapped,
        },
        None => Details {
            incident: decode_fields(document),
            weather: None,
            shape: DetailsShape::Legacy,
        },
    }
}

/// Decodes a record, dropping any field that fails to decode by itself.
fn decode_fields<T>(fields: &Map<String, Value>) -> T
where
    T: DeserializeOwned + Default,
{
    if let Ok(record) = T::deserialize(&Value::Object(fields.clone())) {
        return record;
    }

    let readable: Map<String, Value> = fields
        .iter()
        .filter(|(key, value)| {
            let single = Map::from_iter([((*key).clone(), (*value).clone())]);
            T::deserialize(&Value::Object(single)).is_ok()
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    T::deserialize(&Value::Object(readable)).unwrap_or_default()
}

/// Accepts a JSON number or a numeric string; anything else reads as zero.
fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Int(i64),
        Float(f64),
        String(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Int(i) => i,
        StringOrNumber::Float(f) => f.round() as i64,
        StringOrNumber::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
                .unwrap_or_default()
        }
        StringOrNumber::Other(_) => 0,
    })
}
