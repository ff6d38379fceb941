//! Core entity for one tracked GeoKret item
//!
//! All three parsers (detail page, list page, XML export) populate this one
//! record through the same named setters. Setters apply only the minimal
//! normalizations the site requires: description truncation, image-URL
//! prefixing. Everything else is stored verbatim.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{GK_DESCRIPTION_MAX, geokrety_org};

/// A type label or code outside the closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownTypeError {
    #[error("unknown geokret type label: {0:?}")]
    Label(String),
    #[error("unknown geokret type code: {0}")]
    Code(u8),
}

/// Closed vocabulary of GeoKret item types.
///
/// Codes are the site's wire representation; labels are the display form
/// used on detail pages. Lookup in either direction is exact-match only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeokretType {
    Traditional,
    BookCdDvd,
    Human,
    Coin,
    Stamp,
}

impl GeokretType {
    /// Resolve a display label. Exact match only; no case folding.
    pub fn from_label(label: &str) -> Result<Self, UnknownTypeError> {
        match label {
            "Traditional" => Ok(Self::Traditional),
            "Book/CD/DVD" => Ok(Self::BookCdDvd),
            "Human" => Ok(Self::Human),
            "Coin" => Ok(Self::Coin),
            "Stamp" => Ok(Self::Stamp),
            other => Err(UnknownTypeError::Label(other.to_string())),
        }
    }

    /// Resolve a numeric wire code.
    pub const fn from_code(code: u8) -> Result<Self, UnknownTypeError> {
        match code {
            0 => Ok(Self::Traditional),
            1 => Ok(Self::BookCdDvd),
            2 => Ok(Self::Human),
            3 => Ok(Self::Coin),
            4 => Ok(Self::Stamp),
            other => Err(UnknownTypeError::Code(other)),
        }
    }

    /// Numeric wire code of this type.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Traditional => 0,
            Self::BookCdDvd => 1,
            Self::Human => 2,
            Self::Coin => 3,
            Self::Stamp => 4,
        }
    }

    /// Display label of this type.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Traditional => "Traditional",
            Self::BookCdDvd => "Book/CD/DVD",
            Self::Human => "Human",
            Self::Coin => "Coin",
            Self::Stamp => "Stamp",
        }
    }
}

/// Aggregate cache rating: vote count and average score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheRating {
    pub votes: u32,
    pub score: f32,
}

/// One tracked GeoKret item and its travel metadata.
///
/// Created empty by a parser and populated field-by-field as matching
/// source fragments are discovered. Fields the source document does not
/// mention stay at their defaults: `None` for optional values, 0 for the
/// numeric identifiers and counters, empty for the sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geokret {
    gk_id: u32,
    tracking_number: Option<String>,
    name: Option<String>,
    description: Option<String>,
    featured_image: Option<String>,
    images: Vec<String>,
    owner: Option<String>,
    owner_id: u32,
    date_created: Option<String>,
    distance: Option<String>,
    kret_type: Option<GeokretType>,
    spotted_cache_name: Option<String>,
    spotted_type: Option<String>,
    spotted_country: Option<String>,
    country_track: Vec<(String, u32)>,
    cache_count: u32,
    cache_rating: Option<CacheRating>,
}

impl Geokret {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical textual form of the numeric ID: `GK` + zero-padded
    /// uppercase hex (`GK0012` for 18).
    #[must_use]
    pub fn gkid(&self) -> String {
        format!("{}{:04X}", geokrety_org::ID_PREFIX, self.gk_id)
    }

    pub fn set_id(&mut self, gk_id: u32) {
        self.gk_id = gk_id;
    }

    pub fn set_tracking_number(&mut self, tracking_number: impl Into<String>) {
        self.tracking_number = Some(tracking_number.into());
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Store a description, silently truncated to [`GK_DESCRIPTION_MAX`]
    /// characters.
    pub fn set_description(&mut self, description: impl Into<String>) {
        let description = description.into();
        self.description = Some(if description.chars().count() > GK_DESCRIPTION_MAX {
            description.chars().take(GK_DESCRIPTION_MAX).collect()
        } else {
            description
        });
    }

    pub fn set_owner(&mut self, owner: impl Into<String>) {
        self.owner = Some(owner.into());
    }

    pub fn set_owner_id(&mut self, owner_id: u32) {
        self.owner_id = owner_id;
    }

    pub fn set_date_created(&mut self, date_created: impl Into<String>) {
        self.date_created = Some(date_created.into());
    }

    /// Distance travelled in kilometers, stored verbatim as text. Callers
    /// normalize; the parsers only strip the unit suffix.
    pub fn set_distance(&mut self, distance: impl Into<String>) {
        self.distance = Some(distance.into());
    }

    pub fn set_type(&mut self, kret_type: GeokretType) {
        self.kret_type = Some(kret_type);
    }

    /// Set the featured image from a relative filename. The fixed image
    /// base path is applied exactly once here.
    pub fn set_featured_image(&mut self, filename: &str) {
        self.featured_image = Some(format!("{}{filename}", geokrety_org::IMAGE_BASE_URL));
    }

    /// Append a further image from a relative filename, prefixed with the
    /// fixed image base path. Insertion order is preserved.
    pub fn add_image(&mut self, filename: &str) {
        self.images
            .push(format!("{}{filename}", geokrety_org::IMAGE_BASE_URL));
    }

    pub fn set_spotted_cache_name(&mut self, spotted_cache_name: impl Into<String>) {
        self.spotted_cache_name = Some(spotted_cache_name.into());
    }

    pub fn set_spotted_type(&mut self, spotted_type: impl Into<String>) {
        self.spotted_type = Some(spotted_type.into());
    }

    pub fn set_spotted_country(&mut self, spotted_country: impl Into<String>) {
        self.spotted_country = Some(spotted_country.into());
    }

    /// Replace the travel history: ordered (country, visit count) pairs.
    pub fn set_country_track(&mut self, country_track: Vec<(String, u32)>) {
        self.country_track = country_track;
    }

    pub fn set_cache_count(&mut self, cache_count: u32) {
        self.cache_count = cache_count;
    }

    pub fn set_cache_rating(&mut self, votes: u32, score: f32) {
        self.cache_rating = Some(CacheRating { votes, score });
    }

    /// Restore the featured image from an already-absolute URL. Used by
    /// persistence reads, which must not re-apply the base-path prefix.
    pub(crate) fn set_featured_image_url(&mut self, url: String) {
        self.featured_image = Some(url);
    }

    /// Restore a further image from an already-absolute URL.
    pub(crate) fn push_image_url(&mut self, url: String) {
        self.images.push(url);
    }

    #[must_use]
    pub const fn gk_id(&self) -> u32 {
        self.gk_id
    }

    #[must_use]
    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn featured_image(&self) -> Option<&str> {
        self.featured_image.as_deref()
    }

    #[must_use]
    pub fn images(&self) -> &[String] {
        &self.images
    }

    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    #[must_use]
    pub const fn owner_id(&self) -> u32 {
        self.owner_id
    }

    #[must_use]
    pub fn date_created(&self) -> Option<&str> {
        self.date_created.as_deref()
    }

    #[must_use]
    pub fn distance(&self) -> Option<&str> {
        self.distance.as_deref()
    }

    #[must_use]
    pub const fn kret_type(&self) -> Option<GeokretType> {
        self.kret_type
    }

    #[must_use]
    pub fn spotted_cache_name(&self) -> Option<&str> {
        self.spotted_cache_name.as_deref()
    }

    #[must_use]
    pub fn spotted_type(&self) -> Option<&str> {
        self.spotted_type.as_deref()
    }

    #[must_use]
    pub fn spotted_country(&self) -> Option<&str> {
        self.spotted_country.as_deref()
    }

    #[must_use]
    pub fn country_track(&self) -> &[(String, u32)] {
        &self.country_track
    }

    #[must_use]
    pub const fn cache_count(&self) -> u32 {
        self.cache_count
    }

    #[must_use]
    pub const fn cache_rating(&self) -> Option<CacheRating> {
        self.cache_rating
    }
}

impl std::fmt::Display for Geokret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.gkid(), self.name().unwrap_or("<unnamed>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("Traditional", 0)]
    #[case("Book/CD/DVD", 1)]
    #[case("Human", 2)]
    #[case("Coin", 3)]
    #[case("Stamp", 4)]
    fn type_label_and_code_round_trip(#[case] label: &str, #[case] code: u8) {
        let from_label = GeokretType::from_label(label).unwrap();
        assert_eq!(from_label.code(), code);
        let from_code = GeokretType::from_code(code).unwrap();
        assert_eq!(from_code.label(), label);
        assert_eq!(from_label, from_code);
    }

    #[test]
    fn unknown_type_label_is_rejected() {
        let error = GeokretType::from_label("Sparkle Pony").unwrap_err();
        assert_eq!(error, UnknownTypeError::Label("Sparkle Pony".to_string()));
        // no case folding, no fuzzy match
        assert!(GeokretType::from_label("traditional").is_err());
    }

    #[test]
    fn unknown_type_code_is_rejected() {
        assert_eq!(
            GeokretType::from_code(5).unwrap_err(),
            UnknownTypeError::Code(5)
        );
    }

    #[test]
    fn gkid_is_zero_padded_uppercase_hex() {
        let mut kret = Geokret::new();
        kret.set_id(18);
        assert_eq!(kret.gkid(), "GK0012");
        kret.set_id(0xABCDE);
        assert_eq!(kret.gkid(), "GKABCDE");
    }

    proptest! {
        #[test]
        fn gkid_round_trips_for_any_id(id in any::<u32>()) {
            let mut kret = Geokret::new();
            kret.set_id(id);
            let gkid = kret.gkid();
            let hex = gkid.strip_prefix("GK").unwrap();
            prop_assert_eq!(u32::from_str_radix(hex, 16).unwrap(), id);
        }
    }

    #[test]
    fn long_description_is_truncated_to_maximum() {
        let mut kret = Geokret::new();
        let long = "x".repeat(GK_DESCRIPTION_MAX + 100);
        kret.set_description(long.clone());
        let stored = kret.description().unwrap();
        assert_eq!(stored.chars().count(), GK_DESCRIPTION_MAX);
        assert!(long.starts_with(stored));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let mut kret = Geokret::new();
        let long = "ü".repeat(GK_DESCRIPTION_MAX + 1);
        kret.set_description(long);
        assert_eq!(
            kret.description().unwrap().chars().count(),
            GK_DESCRIPTION_MAX
        );
    }

    #[test]
    fn short_description_is_stored_verbatim() {
        let mut kret = Geokret::new();
        kret.set_description("a short description");
        assert_eq!(kret.description(), Some("a short description"));
    }

    #[test]
    fn images_are_prefixed_once_and_ordered() {
        let mut kret = Geokret::new();
        kret.add_image("foo.jpg");
        kret.add_image("bar.jpg");
        assert_eq!(
            kret.images(),
            [
                "http://geokrety.org/obrazki/foo.jpg",
                "http://geokrety.org/obrazki/bar.jpg"
            ]
        );

        kret.set_featured_image("hi.jpg");
        assert_eq!(
            kret.featured_image(),
            Some("http://geokrety.org/obrazki/hi.jpg")
        );
    }

    #[test]
    fn independent_entities_do_not_share_containers() {
        let mut first = Geokret::new();
        let second = Geokret::new();
        first.add_image("foo.jpg");
        assert_eq!(first.images().len(), 1);
        assert!(second.images().is_empty());
    }

    #[test]
    fn unseen_fields_stay_unset() {
        let kret = Geokret::new();
        assert_eq!(kret.gk_id(), 0);
        assert_eq!(kret.name(), None);
        assert_eq!(kret.tracking_number(), None);
        assert_eq!(kret.kret_type(), None);
        assert!(kret.country_track().is_empty());
        assert_eq!(kret.cache_rating(), None);
    }
}
