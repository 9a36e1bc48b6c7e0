//! Session cookie store
//!
//! The portal tracks the login through plain `name=value` cookies. The jar
//! keeps only those pairs: no expiry, domain or path handling, which is all
//! this single-host protocol needs.

use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use crate::suez::http::HttpResponse;

/// Cookie store for one portal session.
#[derive(Debug)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
    pair_pattern: Regex,
}

impl CookieJar {
    pub fn new() -> Self {
        // Matches the leading name=value pair of each Set-Cookie line;
        // attributes after the first ';' are ignored.
        let pair_pattern =
            Regex::new(r"(?m)^\s*([^=;\s]+)=([^;\r\n]*)").expect("hard-coded cookie pattern");
        Self {
            cookies: HashMap::new(),
            pair_pattern,
        }
    }

    /// Drop all stored cookies.
    pub fn reset(&mut self) {
        self.cookies.clear();
    }

    /// Absorb every Set-Cookie header of a response, last write wins.
    pub fn ingest(&mut self, response: &HttpResponse) {
        for value in response.header_values("set-cookie") {
            for caps in self.pair_pattern.captures_iter(value) {
                let name = caps[1].to_string();
                let value = caps[2].to_string();
                debug!(cookie = %name, "storing cookie");
                self.cookies.insert(name, value);
            }
        }
    }

    /// Render the jar as a Cookie header value.
    pub fn header_value(&self) -> String {
        let mut pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        pairs.sort();
        pairs.join("; ")
    }

    /// Whether a cookie is present with a non-empty value.
    pub fn has(&self, name: &str) -> bool {
        self.cookies.get(name).is_some_and(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_cookies(values: &[&str]) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: values
                .iter()
                .map(|v| ("set-cookie".to_string(), v.to_string()))
                .collect(),
            body: String::new(),
        }
    }

    #[test]
    fn test_ingest_and_header_round_trip() {
        let mut jar = CookieJar::new();
        jar.ingest(&response_with_cookies(&[
            "eZSESSID=abc123; path=/; HttpOnly",
            "visited=1; expires=Wed, 01 Jan 2031 00:00:00 GMT",
        ]));

        let header = jar.header_value();
        assert!(header.contains("eZSESSID=abc123"));
        assert!(header.contains("visited=1"));
        assert!(!header.contains("path"));
        assert!(!header.contains("expires"));
    }

    #[test]
    fn test_last_write_wins() {
        let mut jar = CookieJar::new();
        jar.ingest(&response_with_cookies(&["token=old"]));
        jar.ingest(&response_with_cookies(&["token=new; Secure"]));
        assert_eq!(jar.header_value(), "token=new");
    }

    #[test]
    fn test_has_requires_non_empty_value() {
        let mut jar = CookieJar::new();
        jar.ingest(&response_with_cookies(&["eZSESSID=; path=/"]));
        assert!(!jar.has("eZSESSID"));
        assert!(!jar.has("missing"));

        jar.ingest(&response_with_cookies(&["eZSESSID=deadbeef"]));
        assert!(jar.has("eZSESSID"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut jar = CookieJar::new();
        jar.ingest(&response_with_cookies(&["a=1", "b=2"]));
        assert!(!jar.is_empty());
        jar.reset();
        assert!(jar.is_empty());
        assert_eq!(jar.header_value(), "");
    }

    #[test]
    fn test_multiline_header_value() {
        // Some transports fold several cookies into one header value.
        let mut jar = CookieJar::new();
        jar.ingest(&response_with_cookies(&["a=1; path=/\nb=2; HttpOnly"]));
        assert!(jar.has("a"));
        assert!(jar.has("b"));
    }
}
