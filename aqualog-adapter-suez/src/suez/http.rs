//! Portal HTTP protocol
//!
//! Typed request/response messages and the per-step request builder. The
//! portal is a legacy form-based site: every request carries the same fixed
//! browser-like header set, and the login POST submits the credentials under
//! all the field aliases the provider has used over the years.

use regex::Regex;

use crate::config::PortalConfig;
use crate::suez::cookies::CookieJar;

/// HTTP verbs used by the portal protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
        }
    }
}

/// Which portal endpoint a connection or request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalHost {
    Login,
    Data,
}

/// One fully assembled portal request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub verb: Verb,
    pub host: PortalHost,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// A complete response as delivered by the transport.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// All values of a header, name compared case-insensitively.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// URL-encode a form body. A `None` value emits the bare key with no `=`,
/// which is what the portal expects for its unused field aliases.
pub fn form_encode(fields: &[(&str, Option<&str>)]) -> String {
    fields
        .iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{key}={}", urlencoding::encode(value)),
            None => (*key).to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Builds the request of each protocol step from the portal configuration.
pub struct RequestBuilder {
    config: PortalConfig,
    csrf_pattern: Regex,
}

impl RequestBuilder {
    pub fn new(config: PortalConfig) -> Self {
        let csrf_pattern = Regex::new(r#"(?i)"_csrf_token" value="([^"]*)""#)
            .expect("hard-coded token pattern");
        Self {
            config,
            csrf_pattern,
        }
    }

    /// The anti-forgery token embedded in the login page, if any.
    pub fn extract_csrf_token(&self, body: &str) -> Option<String> {
        self.csrf_pattern
            .captures(body)
            .map(|caps| caps[1].to_string())
    }

    /// GET of the login page. Sent on a fresh jar, so no Cookie header.
    pub fn login_page(&self) -> HttpRequest {
        HttpRequest {
            verb: Verb::Get,
            host: PortalHost::Login,
            path: self.config.login_path.clone(),
            headers: self.default_headers(PortalHost::Login),
            body: None,
        }
    }

    /// POST of the credentials, carrying the pre-auth cookies.
    pub fn login_submit(&self, csrf_token: &str, jar: &CookieJar) -> HttpRequest {
        let username = self.config.username.as_str();
        let password = self.config.password.as_str();
        let body = form_encode(&[
            ("_username", Some(username)),
            ("_password", Some(password)),
            ("_csrf_token", Some(csrf_token)),
            ("signin[username]", Some(username)),
            ("signin[password]", None),
            ("tsme_user_login[_username]", Some(username)),
            ("tsme_user_login[_password]", Some(password)),
        ]);

        let mut headers = self.default_headers(PortalHost::Login);
        headers.push(("Cookie".to_string(), jar.header_value()));
        HttpRequest {
            verb: Verb::Post,
            host: PortalHost::Login,
            path: self.config.login_path.clone(),
            headers,
            body: Some(body),
        }
    }

    /// GET of one month of daily readings for the configured counter.
    pub fn day_data(&self, year: i32, month: u32, jar: &CookieJar) -> HttpRequest {
        let mut headers = self.default_headers(PortalHost::Data);
        headers.push(("Cookie".to_string(), jar.header_value()));
        HttpRequest {
            verb: Verb::Get,
            host: PortalHost::Data,
            path: format!(
                "{}/{year}/{month}/{}",
                self.config.data_path, self.config.counter_id
            ),
            headers,
            body: None,
        }
    }

    fn default_headers(&self, host: PortalHost) -> Vec<(String, String)> {
        let host_name = match host {
            PortalHost::Login => &self.config.login_host,
            PortalHost::Data => &self.config.data_host,
        };
        vec![
            (
                "Accept".to_string(),
                "application/json, text/javascript, */*; q=0.01".to_string(),
            ),
            (
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ),
            (
                "Accept-Language".to_string(),
                "fr,fr-FR;q=0.8,en;q=0.6".to_string(),
            ),
            ("User-Agent".to_string(), self.config.user_agent.clone()),
            ("Connection".to_string(), "keep-alive".to_string()),
            (
                "Host".to_string(),
                format!("{host_name}:{}", self.config.port),
            ),
        ]
    }
}
