//! zipmap-export: Pure request serializers (sans-IO)
//!
//! Converts encoded path specs into map renderer requests.
//! Currently supports static map URLs.

pub mod static_map;

pub use static_map::{StaticMapRequest, URL_LIMIT, fits_url_limit, to_query, to_url};
