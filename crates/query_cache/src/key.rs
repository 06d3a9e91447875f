//! Query keys: a dataset kind plus the ordered parameters that scope it.

use common::Error;
use std::fmt;

use crate::policy::CachePolicy;

/// The datasets the layer knows how to cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    /// Today's daily image.
    DailyImage,
    DailyImageByDate,
    DailyImageRange,
    NeoFeed,
    NeoDetails,
}

/// Groups of kinds that are invalidated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetFamily {
    Apod,
    Neo,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::DailyImage => "daily-image",
            DatasetKind::DailyImageByDate => "daily-image-by-date",
            DatasetKind::DailyImageRange => "daily-image-range",
            DatasetKind::NeoFeed => "neo-feed",
            DatasetKind::NeoDetails => "neo-details",
        }
    }

    pub fn family(&self) -> DatasetFamily {
        match self {
            DatasetKind::DailyImage
            | DatasetKind::DailyImageByDate
            | DatasetKind::DailyImageRange => DatasetFamily::Apod,
            DatasetKind::NeoFeed | DatasetKind::NeoDetails => DatasetFamily::Neo,
        }
    }

    /// Names of the parameters a key of this kind carries, in order.
    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            DatasetKind::DailyImage => &[],
            DatasetKind::DailyImageByDate => &["date"],
            DatasetKind::DailyImageRange | DatasetKind::NeoFeed => &["start_date", "end_date"],
            DatasetKind::NeoDetails => &["neo_id"],
        }
    }

    pub fn policy(&self) -> CachePolicy {
        CachePolicy::for_kind(*self)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one cached query. Equal iff kind and every parameter match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    kind: DatasetKind,
    params: Vec<Option<String>>,
}

fn param(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

impl QueryKey {
    pub fn daily_image() -> Self {
        Self {
            kind: DatasetKind::DailyImage,
            params: Vec::new(),
        }
    }

    pub fn daily_image_by_date(date: Option<&str>) -> Self {
        Self {
            kind: DatasetKind::DailyImageByDate,
            params: vec![param(date)],
        }
    }

    pub fn daily_image_range(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            kind: DatasetKind::DailyImageRange,
            params: vec![param(start), param(end)],
        }
    }

    pub fn neo_feed(start: Option<&str>, end: Option<&str>) -> Self {
        Self {
            kind: DatasetKind::NeoFeed,
            params: vec![param(start), param(end)],
        }
    }

    pub fn neo_details(neo_id: Option<&str>) -> Self {
        Self {
            kind: DatasetKind::NeoDetails,
            params: vec![param(neo_id)],
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn family(&self) -> DatasetFamily {
        self.kind.family()
    }

    pub fn policy(&self) -> CachePolicy {
        self.kind.policy()
    }

    /// Parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).and_then(|p| p.as_deref())
    }

    /// A key is enabled only when every parameter is present and non-blank.
    /// Reads of disabled keys never reach the network.
    pub fn is_enabled(&self) -> bool {
        self.missing_param().is_none()
    }

    /// The validation error a disabled key stands for.
    pub fn validate(&self) -> Result<(), Error> {
        match self.missing_param() {
            None => Ok(()),
            Some(name) => Err(Error::Validation(format!(
                "{} requires {}",
                self.kind, name
            ))),
        }
    }

    fn missing_param(&self) -> Option<&'static str> {
        self.params
            .iter()
            .zip(self.kind.param_names())
            .find(|(value, _)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        for p in &self.params {
            write!(f, "/{}", p.as_deref().unwrap_or("-"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_order_and_value_sensitive() {
        let a = QueryKey::neo_feed(Some("2024-01-01"), Some("2024-01-08"));
        let b = QueryKey::neo_feed(Some("2024-01-01"), Some("2024-01-08"));
        let swapped = QueryKey::neo_feed(Some("2024-01-08"), Some("2024-01-01"));
        let other_kind = QueryKey::daily_image_range(Some("2024-01-01"), Some("2024-01-08"));

        assert_eq!(a, b);
        assert_ne!(a, swapped);
        assert_ne!(a, other_kind);
    }

    #[test]
    fn test_enabled_requires_every_param() {
        assert!(QueryKey::daily_image().is_enabled());
        assert!(QueryKey::daily_image_by_date(Some("2024-01-05")).is_enabled());
        assert!(!QueryKey::daily_image_by_date(None).is_enabled());
        assert!(!QueryKey::daily_image_by_date(Some("  ")).is_enabled());
        assert!(!QueryKey::neo_feed(Some("2024-01-01"), None).is_enabled());
        assert!(!QueryKey::neo_details(Some("")).is_enabled());
    }

    #[test]
    fn test_validate_names_missing_param() {
        let err = QueryKey::neo_feed(Some("2024-01-01"), None)
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            Error::Validation("neo-feed requires end_date".into())
        );
        assert!(QueryKey::neo_details(Some("3542519")).validate().is_ok());
    }

    #[test]
    fn test_display_and_family() {
        let key = QueryKey::daily_image_by_date(Some("2024-01-05"));
        assert_eq!(key.to_string(), "daily-image-by-date/2024-01-05");
        assert_eq!(key.family(), DatasetFamily::Apod);
        assert_eq!(QueryKey::daily_image().to_string(), "daily-image");
        assert_eq!(QueryKey::neo_details(None).to_string(), "neo-details/-");
        assert_eq!(QueryKey::neo_details(None).family(), DatasetFamily::Neo);
    }
}
