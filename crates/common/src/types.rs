//! Domain types shared across the data layer.
//!
//! Payloads keep every field the API sends: known fields are typed, the rest
//! land in a flattened `extra` map so responses pass through unmodified.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

// ── Daily image (APOD) ────────────────────────────────────────────────

/// One Astronomy Picture of the Day record from `/planetary/apod`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApodImage {
    pub date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub hdurl: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Near-Earth objects ────────────────────────────────────────────────

/// A near-Earth object as it appears in the feed and details endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asteroid {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_potentially_hazardous_asteroid: bool,
    /// Feed date this object was listed under. Never sent by the API; filled
    /// in when the feed is flattened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approach_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response from `/neo/rest/v1/feed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeoFeed {
    #[serde(default)]
    pub element_count: u64,
    #[serde(default)]
    pub near_earth_objects: DailyApproaches,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Asteroids grouped by ISO date, in the order the API listed the dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyApproaches(Vec<(String, Vec<Asteroid>)>);

impl DailyApproaches {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a date bucket, replacing an existing bucket with the same date.
    pub fn insert(&mut self, date: impl Into<String>, asteroids: Vec<Asteroid>) {
        let date = date.into();
        match self.0.iter_mut().find(|(d, _)| *d == date) {
            Some((_, existing)) => *existing = asteroids,
            None => self.0.push((date, asteroids)),
        }
    }

    pub fn get(&self, date: &str) -> Option<&[Asteroid]> {
        self.0
            .iter()
            .find(|(d, _)| d == date)
            .map(|(_, a)| a.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Asteroid])> {
        self.0.iter().map(|(d, a)| (d.as_str(), a.as_slice()))
    }

    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(d, _)| d.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<Asteroid>)> for DailyApproaches {
    fn from_iter<I: IntoIterator<Item = (S, Vec<Asteroid>)>>(iter: I) -> Self {
        let mut approaches = DailyApproaches::new();
        for (date, asteroids) in iter {
            approaches.insert(date, asteroids);
        }
        approaches
    }
}

impl Serialize for DailyApproaches {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (date, asteroids) in &self.0 {
            map.serialize_entry(date, asteroids)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DailyApproaches {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ApproachesVisitor;

        impl<'de> Visitor<'de> for ApproachesVisitor {
            type Value = DailyApproaches;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of ISO dates to asteroid lists")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut approaches = DailyApproaches::new();
                while let Some((date, asteroids)) = access.next_entry::<String, Vec<Asteroid>>()? {
                    approaches.insert(date, asteroids);
                }
                Ok(approaches)
            }
        }

        deserializer.deserialize_map(ApproachesVisitor)
    }
}

// ── Favorites ─────────────────────────────────────────────────────────

/// A saved daily image. Unique by `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub date: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "addedAt")]
    pub added_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_feed() -> &'static str {
        r#"{
            "links": {"self": "https://api.nasa.gov/neo/rest/v1/feed"},
            "element_count": 3,
            "near_earth_objects": {
                "2024-03-02": [
                    {"id": "3542519", "name": "(2010 PK9)", "is_potentially_hazardous_asteroid": true,
                     "absolute_magnitude_h": 21.8}
                ],
                "2024-03-01": [
                    {"id": "2465633", "name": "465633 (2009 JR5)", "is_potentially_hazardous_asteroid": false},
                    {"id": "3426410", "name": "(2008 QV11)", "is_potentially_hazardous_asteroid": false}
                ]
            }
        }"#
    }

    #[test]
    fn test_feed_keeps_date_order() {
        let feed: NeoFeed = serde_json::from_str(sample_feed()).expect("feed should deserialize");

        assert_eq!(feed.element_count, 3);
        let dates: Vec<&str> = feed.near_earth_objects.dates().collect();
        assert_eq!(dates, vec!["2024-03-02", "2024-03-01"]);
        assert_eq!(feed.near_earth_objects.get("2024-03-01").map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let feed: NeoFeed = serde_json::from_str(sample_feed()).expect("feed should deserialize");
        assert!(feed.extra.contains_key("links"));

        let first = &feed.near_earth_objects.get("2024-03-02").expect("bucket")[0];
        assert_eq!(first.extra.get("absolute_magnitude_h"), Some(&serde_json::json!(21.8)));
        assert!(first.approach_date.is_none());

        let back = serde_json::to_value(first).expect("serialize");
        assert!(back.get("approach_date").is_none());
        assert_eq!(back["absolute_magnitude_h"], serde_json::json!(21.8));
    }

    #[test]
    fn test_apod_minimal_record() {
        let image: ApodImage = serde_json::from_str(
            r#"{"date": "2024-01-05", "title": "Orion", "url": "https://apod.nasa.gov/x.jpg",
                "media_type": "image", "service_version": "v1"}"#,
        )
        .expect("apod should deserialize");

        assert_eq!(image.title, "Orion");
        assert_eq!(image.media_type.as_deref(), Some("image"));
        assert!(image.hdurl.is_none());
        assert_eq!(image.extra.get("service_version"), Some(&serde_json::json!("v1")));
    }
}
