//! Aggregates over a near-Earth-object feed.
//!
//! Pure functions of the payload. Nothing here is stored; callers recompute
//! on every access so the result always matches the payload they pass in.

use common::dates::format_short_date;
use common::{Asteroid, NeoFeed};

pub const NO_DATA_LABEL: &str = "No data";

/// `element_count` as reported by the API, 0 without a payload.
pub fn total_count(payload: Option<&NeoFeed>) -> u64 {
    payload.map_or(0, |feed| feed.element_count)
}

/// Potentially hazardous objects across every date.
pub fn hazardous_count(payload: Option<&NeoFeed>) -> usize {
    let Some(feed) = payload else {
        return 0;
    };
    feed.near_earth_objects
        .iter()
        .flat_map(|(_, asteroids)| asteroids)
        .filter(|a| a.is_potentially_hazardous_asteroid)
        .count()
}

/// `Mar 1, 2024` for a single date, `Mar 1, 2024 - Mar 2, 2024` for several
/// (ascending, whatever order the API listed them in), `No data` otherwise.
pub fn date_range_label(payload: Option<&NeoFeed>) -> String {
    let mut dates: Vec<&str> = payload
        .map(|feed| feed.near_earth_objects.dates().collect())
        .unwrap_or_default();
    dates.sort_unstable();

    match dates.as_slice() {
        [] => NO_DATA_LABEL.to_string(),
        [only] => format_short_date(only),
        [first, .., last] => format!(
            "{} - {}",
            format_short_date(first),
            format_short_date(last)
        ),
    }
}

/// Every asteroid in feed order, each tagged with the date it was listed under.
pub fn all_asteroids(payload: Option<&NeoFeed>) -> Vec<Asteroid> {
    let Some(feed) = payload else {
        return Vec::new();
    };
    feed.near_earth_objects
        .iter()
        .flat_map(|(date, asteroids)| {
            asteroids.iter().map(move |a| Asteroid {
                approach_date: Some(date.to_string()),
                ..a.clone()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{asteroid, feed};

    #[test]
    fn test_empty_payload() {
        assert_eq!(total_count(None), 0);
        assert_eq!(hazardous_count(None), 0);
        assert_eq!(date_range_label(None), "No data");
        assert!(all_asteroids(None).is_empty());

        let empty = NeoFeed::default();
        assert_eq!(hazardous_count(Some(&empty)), 0);
        assert_eq!(date_range_label(Some(&empty)), "No data");
    }

    #[test]
    fn test_hazardous_count_spans_dates() {
        let payload = feed(vec![
            ("2024-03-01", vec![asteroid("1", true), asteroid("2", false)]),
            ("2024-03-02", vec![asteroid("3", true)]),
            ("2024-03-03", vec![]),
        ]);

        assert_eq!(total_count(Some(&payload)), 3);
        assert_eq!(hazardous_count(Some(&payload)), 2);
    }

    #[test]
    fn test_label_sorts_dates() {
        let payload = feed(vec![
            ("2024-03-02", vec![asteroid("1", false)]),
            ("2024-03-01", vec![asteroid("2", false)]),
        ]);
        assert_eq!(date_range_label(Some(&payload)), "Mar 1, 2024 - Mar 2, 2024");
    }

    #[test]
    fn test_label_single_date() {
        let payload = feed(vec![("2024-01-05", vec![])]);
        assert_eq!(date_range_label(Some(&payload)), "Jan 5, 2024");
    }

    #[test]
    fn test_all_asteroids_keeps_feed_order_and_tags_dates() {
        let payload = feed(vec![
            ("2024-03-02", vec![asteroid("b1", false), asteroid("b2", true)]),
            ("2024-03-01", vec![asteroid("a1", false)]),
        ]);

        let flat = all_asteroids(Some(&payload));
        let ids: Vec<&str> = flat.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2", "a1"]);

        let expected_len: usize = payload.near_earth_objects.iter().map(|(_, a)| a.len()).sum();
        assert_eq!(flat.len(), expected_len);

        for a in &flat {
            let date = a.approach_date.as_deref().expect("approach date set");
            let bucket = payload.near_earth_objects.get(date).expect("bucket exists");
            assert!(bucket.iter().any(|b| b.id == a.id));
        }
        // The payload itself is untouched.
        assert!(payload
            .near_earth_objects
            .iter()
            .all(|(_, list)| list.iter().all(|a| a.approach_date.is_none())));
    }
}
