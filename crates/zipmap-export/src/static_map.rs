//! Static map request serializer.
//!
//! Builds the query string a static map renderer expects: one
//! `size=<width>x<height>` pair followed by one `path=<spec>` pair per
//! encoded path spec, in order. Repeating the `path` parameter is how
//! the renderer accepts several routes in one image.
//!
//! Values are `application/x-www-form-urlencoded` via the [`url`]
//! crate, so the `|` and `:` separators inside path specs are escaped.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use zipmap_pipeline::EncodedPathSpec;

/// Longest URL the renderer accepts, in characters.
pub const URL_LIMIT: usize = 2048;

/// Where and how large to render the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticMapRequest {
    /// Renderer endpoint, without a query string.
    pub base_url: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl StaticMapRequest {
    /// Default renderer endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://maps.googleapis.com/maps/api/staticmap";
    /// Default image width and height in pixels.
    pub const DEFAULT_SIZE: u32 = 800;
}

impl Default for StaticMapRequest {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            width: Self::DEFAULT_SIZE,
            height: Self::DEFAULT_SIZE,
        }
    }
}

/// Serialize path specs into a form-encoded query string.
///
/// # Examples
///
/// ```
/// use zipmap_export::{StaticMapRequest, to_query};
/// use zipmap_pipeline::{EncodedPathSpec, PathStyle};
///
/// let specs = vec![EncodedPathSpec {
///     style: PathStyle::default(),
///     encoded: "_p~iF~ps|U".to_owned(),
/// }];
/// let query = to_query(&specs, &StaticMapRequest::default());
/// assert_eq!(
///     query,
///     "size=800x800&path=weight%3A3%7Ccolor%3Ablue%7Cfillcolor%3Apurple%7Cenc%3A_p%7EiF%7Eps%7CU",
/// );
/// ```
#[must_use]
pub fn to_query(specs: &[EncodedPathSpec], request: &StaticMapRequest) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("size", &format!("{}x{}", request.width, request.height));
    for spec in specs {
        serializer.append_pair("path", &spec.to_string());
    }
    serializer.finish()
}

/// Serialize path specs into a complete request URL.
#[must_use]
pub fn to_url(specs: &[EncodedPathSpec], request: &StaticMapRequest) -> String {
    format!("{}?{}", request.base_url, to_query(specs, request))
}

/// Returns `true` if `url` is short enough for the renderer.
#[must_use]
pub fn fits_url_limit(url: &str) -> bool {
    url.chars().count() <= URL_LIMIT
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use zipmap_pipeline::PathStyle;

    use super::*;

    fn spec(encoded: &str) -> EncodedPathSpec {
        EncodedPathSpec {
            style: PathStyle::default(),
            encoded: encoded.to_owned(),
        }
    }

    fn query_pairs(query: &str) -> Vec<(String, String)> {
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn empty_specs_only_carry_size() {
        let query = to_query(&[], &StaticMapRequest::default());
        assert_eq!(query, "size=800x800");
    }

    #[test]
    fn each_spec_becomes_a_path_pair_in_order() {
        let specs = vec![spec("_p~iF~ps|U"), spec("??")];
        let query = to_query(&specs, &StaticMapRequest::default());

        let pairs = query_pairs(&query);
        assert_eq!(
            pairs,
            vec![
                ("size".to_owned(), "800x800".to_owned()),
                (
                    "path".to_owned(),
                    "weight:3|color:blue|fillcolor:purple|enc:_p~iF~ps|U".to_owned()
                ),
                (
                    "path".to_owned(),
                    "weight:3|color:blue|fillcolor:purple|enc:??".to_owned()
                ),
            ],
        );
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let query = to_query(&[spec("`~oia@")], &StaticMapRequest::default());
        assert!(!query.contains('|'));
        assert!(!query.contains('`'));
        assert!(!query.contains('@'));
        assert!(query.contains("%7C"));
    }

    #[test]
    fn custom_size() {
        let request = StaticMapRequest {
            width: 640,
            height: 480,
            ..StaticMapRequest::default()
        };
        assert_eq!(to_query(&[], &request), "size=640x480");
    }

    #[test]
    fn url_prefixes_base() {
        let url = to_url(&[spec("??")], &StaticMapRequest::default());
        assert!(url.starts_with("https://maps.googleapis.com/maps/api/staticmap?size=800x800&path="));
    }

    #[test]
    fn url_limit_boundary() {
        assert!(fits_url_limit(&"a".repeat(URL_LIMIT)));
        assert!(!fits_url_limit(&"a".repeat(URL_LIMIT + 1)));
    }

    #[test]
    fn request_serde_round_trip() {
        let request = StaticMapRequest {
            base_url: "http://localhost/map".to_owned(),
            width: 400,
            height: 300,
        };
        let json = serde_json::to_string(&request).unwrap();
        let deserialized: StaticMapRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, deserialized);
    }

    #[test]
    fn request_partial_json_uses_defaults() {
        let request: StaticMapRequest = serde_json::from_str(r#"{"width": 500}"#).unwrap();
        assert_eq!(request.width, 500);
        assert_eq!(request.height, StaticMapRequest::DEFAULT_SIZE);
        assert_eq!(request.base_url, StaticMapRequest::DEFAULT_BASE_URL);
    }
}
