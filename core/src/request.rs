use crate::{Error, Result};
use http::header::HeaderName;
use http::HeaderMap;
use http::Method;

/// Signing context for request.
///
/// A read-only view over `http::request::Parts` holding exactly what a
/// signature is computed from.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP path, still percent encoded.
    pub path: String,
    /// HTTP query parameters, in the order they appear in the uri.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &http::request::Parts) -> Result<Self> {
        if parts.uri.authority().is_none() {
            return Err(Error::request_invalid(
                "request without authority is invalid for signing",
            ));
        }

        Ok(SigningRequest {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts
                .uri
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),
            headers: parts.headers.clone(),
        })
    }

    /// Get the path with percent encoding removed.
    pub fn path_percent_decoded(&self) -> String {
        percent_encoding::percent_decode_str(&self.path)
            .decode_utf8_lossy()
            .into_owned()
    }

    /// Get header value by name.
    ///
    /// Returns empty string if header not found.
    #[inline]
    pub fn header_get_or_default(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Ok(""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_keeps_query_order() {
        let (parts, _) = http::Request::patch(
            "https://account.dfs.core.windows.net/logs/2024/app_0.log?action=append&position=42",
        )
        .header("x-ms-version", "2018-11-09")
        .body(())
        .unwrap()
        .into_parts();

        let req = SigningRequest::build(&parts).unwrap();
        assert_eq!(req.method, Method::PATCH);
        assert_eq!(req.path, "/logs/2024/app_0.log");
        assert_eq!(
            req.query,
            vec![
                ("action".to_string(), "append".to_string()),
                ("position".to_string(), "42".to_string()),
            ]
        );
        assert_eq!(
            req.header_get_or_default(&HeaderName::from_static("x-ms-version"))
                .unwrap(),
            "2018-11-09"
        );
        assert_eq!(
            req.header_get_or_default(&http::header::RANGE).unwrap(),
            ""
        );
    }

    #[test]
    fn test_build_requires_authority() {
        let (parts, _) = http::Request::get("/container").body(()).unwrap().into_parts();
        assert!(SigningRequest::build(&parts).is_err());
    }

    #[test]
    fn test_path_percent_decoded() {
        let (parts, _) = http::Request::head("https://a.dfs.core.windows.net/c/my%20file.log")
            .body(())
            .unwrap()
            .into_parts();
        let req = SigningRequest::build(&parts).unwrap();
        assert_eq!(req.path_percent_decoded(), "/c/my file.log");
    }
}
