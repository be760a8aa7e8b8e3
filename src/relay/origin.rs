//! Origin Policies
//!
//! Decides which browser origins may open a relay session. The default allows
//! everything; stricter policies can be swapped in through configuration
//! without touching the relay itself.

use std::fmt::Debug;

use reqwest::Url;

/// Headers an origin decision is based on
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginRequest<'a> {
    /// Value of the `Origin` header, if any
    pub origin: Option<&'a str>,
    /// Value of the `Host` header, if any
    pub host: Option<&'a str>,
}

/// Policy consulted before an inbound connection is upgraded
pub trait OriginPolicy: Send + Sync + Debug {
    fn allows(&self, request: &OriginRequest<'_>) -> bool;
}

/// Every origin may connect
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAnyOrigin;

impl OriginPolicy for AllowAnyOrigin {
    fn allows(&self, _request: &OriginRequest<'_>) -> bool {
        true
    }
}

/// The origin's authority must match the `Host` header.
///
/// Requests without an `Origin` header are not from a browser and pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SameHostOrigin;

impl OriginPolicy for SameHostOrigin {
    fn allows(&self, request: &OriginRequest<'_>) -> bool {
        let Some(origin) = request.origin else {
            return true;
        };
        match (origin_authority(origin), request.host) {
            (Some(authority), Some(host)) => authority.eq_ignore_ascii_case(host),
            _ => false,
        }
    }
}

/// Only the listed origins may connect (compared case-insensitively,
/// ignoring a trailing slash). Requests without an `Origin` header pass.
#[derive(Debug, Clone, Default)]
pub struct AllowListedOrigins {
    origins: Vec<String>,
}

impl AllowListedOrigins {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origins: origins
                .into_iter()
                .map(|o| o.into().trim_end_matches('/').to_ascii_lowercase())
                .collect(),
        }
    }
}

impl OriginPolicy for AllowListedOrigins {
    fn allows(&self, request: &OriginRequest<'_>) -> bool {
        match request.origin {
            None => true,
            Some(origin) => {
                let origin = origin.trim_end_matches('/').to_ascii_lowercase();
                self.origins.iter().any(|allowed| *allowed == origin)
            }
        }
    }
}

/// `host[:port]` part of an origin such as `http://localhost:8080`
fn origin_authority(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(origin: Option<&'a str>, host: Option<&'a str>) -> OriginRequest<'a> {
        OriginRequest { origin, host }
    }

    #[test]
    fn test_allow_any() {
        let policy = AllowAnyOrigin;
        assert!(policy.allows(&request(Some("http://evil.example"), Some("localhost:8080"))));
        assert!(policy.allows(&request(None, None)));
    }

    #[test]
    fn test_same_host() {
        let policy = SameHostOrigin;
        assert!(policy.allows(&request(Some("http://localhost:8080"), Some("localhost:8080"))));
        assert!(policy.allows(&request(Some("http://LOCALHOST:8080"), Some("localhost:8080"))));
        assert!(!policy.allows(&request(Some("http://evil.example"), Some("localhost:8080"))));
        assert!(!policy.allows(&request(Some("not a url"), Some("localhost:8080"))));
        assert!(!policy.allows(&request(Some("http://localhost:8080"), None)));
        assert!(policy.allows(&request(None, Some("localhost:8080"))));
    }

    #[test]
    fn test_allow_list() {
        let policy = AllowListedOrigins::new(["http://localhost:8080/", "https://tools.example"]);
        assert!(policy.allows(&request(Some("http://localhost:8080"), None)));
        assert!(policy.allows(&request(Some("HTTPS://tools.example/"), None)));
        assert!(!policy.allows(&request(Some("http://localhost:9090"), None)));
        assert!(policy.allows(&request(None, None)));
    }
}
