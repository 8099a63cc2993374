//! `Origin` allow-list for WebSocket upgrades.

use std::collections::HashSet;

/// Browser origins permitted to open a WebSocket.
///
/// Requests without an `Origin` header (non-browser clients, same-origin
/// tools) are always let through. A `*` entry permits every origin.
#[derive(Debug, Clone, Default)]
pub struct OriginAllowList {
    origins: HashSet<String>,
    any: bool,
}

impl OriginAllowList {
    /// Parses a comma-separated list such as
    /// `"http://localhost:3000, https://dash.example.com"`.
    #[must_use]
    pub fn from_csv(csv: &str) -> Self {
        let mut list = Self::default();
        for origin in csv.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            if origin == "*" {
                list.any = true;
            } else {
                list.origins.insert(origin.trim_end_matches('/').to_string());
            }
        }
        list
    }

    /// Returns `true` if a request carrying `origin` may upgrade.
    #[must_use]
    pub fn permits(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => self.any || self.origins.contains(origin.trim_end_matches('/')),
        }
    }

    /// Returns `true` if every origin is permitted.
    #[must_use]
    pub const fn allows_any(&self) -> bool {
        self.any
    }

    /// Iterates over the explicitly listed origins.
    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.origins.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> OriginAllowList {
        OriginAllowList::from_csv("http://localhost:3000,http://example.com")
    }

    #[test]
    fn listed_origins_are_allowed() {
        assert!(list().permits(Some("http://localhost:3000")));
        assert!(list().permits(Some("http://example.com")));
    }

    #[test]
    fn unlisted_origin_is_refused() {
        assert!(!list().permits(Some("http://malicious.com")));
        assert!(!list().permits(Some("")));
    }

    #[test]
    fn missing_origin_is_allowed() {
        assert!(list().permits(None));
    }

    #[test]
    fn whitespace_and_trailing_slashes_are_ignored() {
        let list = OriginAllowList::from_csv(" http://a.test/ , ,http://b.test ");
        assert!(list.permits(Some("http://a.test")));
        assert!(list.permits(Some("http://b.test/")));
        assert_eq!(list.origins().count(), 2);
    }

    #[test]
    fn wildcard_allows_everything() {
        let list = OriginAllowList::from_csv("*");
        assert!(list.allows_any());
        assert!(list.permits(Some("http://anything.test")));
    }
}
