//! URL construction for the drive API endpoints.

use crate::config::{DriveConfig, ProtectedRoute};
use crate::error::Result;
use url::Url;

/// Query parameter carrying the protected-route token
const TOKEN_PARAM: &str = "odpt";

/// Builds endpoint URLs for one drive backend, attaching route tokens when needed
#[derive(Debug, Clone)]
pub struct Endpoints {
    base_url: Url,
    protected_routes: Vec<ProtectedRoute>,
    thumbnail_size: String,
}

impl Endpoints {
    /// Create endpoints for a backend rooted at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid absolute URL.
    pub fn new(
        base_url: &str,
        protected_routes: Vec<ProtectedRoute>,
        thumbnail_size: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            protected_routes,
            thumbnail_size: thumbnail_size.into(),
        })
    }

    /// Create endpoints from the `[drive]` config section
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is invalid.
    pub fn from_config(config: &DriveConfig, thumbnail_size: &str) -> Result<Self> {
        Self::new(
            &config.base_url,
            config.protected_routes.clone(),
            thumbnail_size,
        )
    }

    /// Token for `path`, from the longest protected route that prefixes it
    #[must_use]
    pub fn token_for(&self, path: &str) -> Option<&str> {
        self.protected_routes
            .iter()
            .filter(|r| !r.token.is_empty() && route_matches(&r.route, path))
            .max_by_key(|r| r.route.len())
            .map(|r| r.token.as_str())
    }

    /// `GET /api/?path=..[&next=..]` folder listing or item description
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built.
    pub fn listing(&self, path: &str, next: Option<&str>) -> Result<Url> {
        let mut params = vec![("path", path)];
        if let Some(next) = next {
            params.push(("next", next));
        }
        self.build("api/", path, &params)
    }

    /// `GET /api/raw/?path=..` raw file content
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built.
    pub fn raw(&self, path: &str) -> Result<Url> {
        self.build("api/raw/", path, &[("path", path)])
    }

    /// `GET /api/thumbnail/?path=..&size=..` cover art
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be built.
    pub fn thumbnail(&self, path: &str) -> Result<Url> {
        self.build(
            "api/thumbnail/",
            path,
            &[("path", path), ("size", self.thumbnail_size.as_str())],
        )
    }

    fn build(&self, endpoint: &str, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.join(endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query.extend_pairs(params);
            if let Some(token) = self.token_for(path) {
                query.append_pair(TOKEN_PARAM, token);
            }
        }
        Ok(url)
    }
}

/// A route matches itself and anything beneath it
fn route_matches(route: &str, path: &str) -> bool {
    let route = route.trim_end_matches('/');
    if route.is_empty() {
        return true;
    }
    path.strip_prefix(route)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints::new(
            "https://drive.example.com",
            vec![
                ProtectedRoute {
                    route: "/Private".into(),
                    token: "outer".into(),
                },
                ProtectedRoute {
                    route: "/Private/Deep".into(),
                    token: "inner".into(),
                },
                ProtectedRoute {
                    route: "/Unset".into(),
                    token: String::new(),
                },
            ],
            "medium",
        )
        .unwrap()
    }

    #[test]
    fn test_raw_url_encodes_path() {
        let url = endpoints().raw("/Music/My Song.mp3").unwrap();
        assert_eq!(
            url.as_str(),
            "https://drive.example.com/api/raw/?path=%2FMusic%2FMy+Song.mp3"
        );
    }

    #[test]
    fn test_thumbnail_url_has_size() {
        let url = endpoints().thumbnail("/a.mp3").unwrap();
        assert_eq!(
            url.as_str(),
            "https://drive.example.com/api/thumbnail/?path=%2Fa.mp3&size=medium"
        );
    }

    #[test]
    fn test_listing_url_with_next() {
        let url = endpoints().listing("/Music", Some("tok en")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://drive.example.com/api/?path=%2FMusic&next=tok+en"
        );
    }

    #[test]
    fn test_token_attached_for_protected_route() {
        let url = endpoints().raw("/Private/a.mp3").unwrap();
        assert!(url.as_str().ends_with("&odpt=outer"));
    }

    #[test]
    fn test_longest_route_wins() {
        assert_eq!(endpoints().token_for("/Private/Deep/x.mp3"), Some("inner"));
        assert_eq!(endpoints().token_for("/Private/x.mp3"), Some("outer"));
    }

    #[test]
    fn test_route_prefix_must_end_at_segment() {
        assert_eq!(endpoints().token_for("/PrivateStuff/x.mp3"), None);
        assert_eq!(endpoints().token_for("/Private"), Some("outer"));
    }

    #[test]
    fn test_empty_token_is_ignored() {
        assert_eq!(endpoints().token_for("/Unset/x.mp3"), None);
    }

    #[test]
    fn test_base_url_with_subpath() {
        let endpoints = Endpoints::new("https://example.com/drive/", vec![], "large").unwrap();
        let url = endpoints.raw("/a").unwrap();
        assert_eq!(url.as_str(), "https://example.com/drive/api/raw/?path=%2Fa");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(Endpoints::new("not a url", vec![], "medium").is_err());
    }
}
