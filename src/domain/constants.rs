//! Site characteristics and domain constants
//!
//! Fixed values of the geokrety.org site and the inventory export schema.

/// geokrety.org site constants
pub mod geokrety_org {
    /// Site base URL for all authenticated requests
    pub const BASE_URL: &str = "https://geokrety.org";

    /// Base path prepended to every relative image filename
    pub const IMAGE_BASE_URL: &str = "http://geokrety.org/obrazki/";

    /// Canonical ID prefix (`GK` + zero-padded uppercase hex)
    pub const ID_PREFIX: &str = "GK";

    /// API login endpoint, exchanges credentials for a `secid`
    pub const API_LOGIN_PATH: &str = "/api-login2secid.php";

    /// Web login form endpoint
    pub const WEB_LOGIN_PATH: &str = "/longin.php";

    /// XML inventory export endpoint (requires `secid`)
    pub const XML_EXPORT_PATH: &str = "/export2.php";

    /// Inventory listing page
    pub const INVENTORY_PAGE_PATH: &str = "/mypage.php";

    /// Single-item detail page
    pub const DETAIL_PAGE_PATH: &str = "/konkret.php";

    /// Item edit form endpoint
    pub const EDIT_PATH: &str = "/edit.php";

    /// Item registration form endpoint
    pub const REGISTER_PATH: &str = "/register.php";

    /// Image upload endpoint
    pub const IMAGE_UPLOAD_PATH: &str = "/imgup.php";
}

/// Maximum accepted description length, in characters. Longer descriptions
/// are truncated silently on write.
pub const GK_DESCRIPTION_MAX: usize = 5120;

/// Ordered column schema for CSV inventory exports. Reads and writes must
/// both use this exact list so round-tripping is lossless.
pub const GK_CSV_COLUMNS: [&str; 17] = [
    "gk_id",
    "tracking_number",
    "name",
    "description",
    "imagehi",
    "images",
    "owner",
    "ownerid",
    "datecreated",
    "distance",
    "type",
    "spotted_name",
    "spotted_type",
    "spotted_country",
    "country_track",
    "cache_count",
    "cache_rating",
];
