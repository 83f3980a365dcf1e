use crate::constants::*;
use crate::Credential;
use abfs_core::hash::{base64_decode, base64_hmac_sha256};
use abfs_core::time::{format_http_date, now, DateTime};
use abfs_core::{Context, Error, Result, SignRequest, SigningRequest};
use async_trait::async_trait;
use http::header::{self, HeaderName};
use http::request::Parts;
use http::HeaderValue;
use log::debug;
use std::fmt::Write;

/// RequestSigner that implement Azure Storage Shared Key and Bearer Token Authorization.
///
/// - [Authorize with Shared Key](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
///
/// Before signing, `x-ms-date` and `x-ms-version` are stamped on the request
/// unless it already carries them.
#[derive(Debug, Default)]
pub struct RequestSigner {
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new builder for Azure Storage signer.
    pub fn new() -> Self {
        Self { time: None }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
    ) -> Result<()> {
        let Some(cred) = credential else {
            return Err(Error::request_invalid("credential is required"));
        };

        if !req.headers.contains_key(X_MS_DATE) {
            let date = format_http_date(self.time.unwrap_or_else(now));
            req.headers.insert(X_MS_DATE, HeaderValue::try_from(date)?);
        }
        if !req.headers.contains_key(X_MS_VERSION) {
            req.headers
                .insert(X_MS_VERSION, HeaderValue::from_static(ABFS_API_VERSION));
        }

        let authorization = match cred {
            Credential::BearerToken { token, .. } => format!("Bearer {token}"),
            Credential::SharedKey {
                account_name,
                account_key,
            } => {
                let ctx = SigningRequest::build(req)?;
                let string_to_sign = string_to_sign(&ctx, account_name)?;
                debug!("string to sign: {string_to_sign:?}");

                let key = base64_decode(account_key).map_err(|e| {
                    Error::credential_invalid("account key is not valid base64").with_source(e)
                })?;
                let signature = base64_hmac_sha256(&key, string_to_sign.as_bytes());
                format!("SharedKey {account_name}:{signature}")
            }
        };

        let mut value = HeaderValue::try_from(authorization)?;
        value.set_sensitive(true);
        req.headers.insert(header::AUTHORIZATION, value);
        Ok(())
    }
}

/// Construct string to sign
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-Encoding + "\n" +
/// Content-Language + "\n" +
/// Content-Length + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// If-Modified-Since + "\n" +
/// If-Match + "\n" +
/// If-None-Match + "\n" +
/// If-Unmodified-Since + "\n" +
/// Range + "\n" +
/// "x-ms-date:" + XMsDate + "\n" +
/// "x-ms-version:" + XMsVersion + "\n" +
/// CanonicalizedResource;
/// ```
///
/// `Content-Length` is written with leading zeros stripped, so a zero length
/// contributes an empty line.
///
/// ## Reference
///
/// - [Blob, Queue, and File Services (Shared Key authorization)](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
pub fn string_to_sign(ctx: &SigningRequest, account_name: &str) -> Result<String> {
    let mut s = String::with_capacity(256);

    s.push_str(&ctx.method.as_str().to_uppercase());
    s.push('\n');
    for name in [header::CONTENT_ENCODING, header::CONTENT_LANGUAGE] {
        s.push_str(ctx.header_get_or_default(&name)?);
        s.push('\n');
    }
    s.push_str(
        ctx.header_get_or_default(&header::CONTENT_LENGTH)?
            .trim_start_matches('0'),
    );
    s.push('\n');
    for name in [
        HeaderName::from_static("content-md5"),
        header::CONTENT_TYPE,
        header::DATE,
        header::IF_MODIFIED_SINCE,
        header::IF_MATCH,
        header::IF_NONE_MATCH,
        header::IF_UNMODIFIED_SINCE,
        header::RANGE,
    ] {
        s.push_str(ctx.header_get_or_default(&name)?);
        s.push('\n');
    }

    let date = ctx.header_get_or_default(&HeaderName::from_static(X_MS_DATE))?;
    let version = ctx.header_get_or_default(&HeaderName::from_static(X_MS_VERSION))?;
    writeln!(&mut s, "{X_MS_DATE}:{date}")
        .and_then(|_| writeln!(&mut s, "{X_MS_VERSION}:{version}"))
        .map_err(|e| Error::unexpected("failed to write canonical headers").with_source(e))?;

    s.push_str(&canonicalize_resource(ctx, account_name));
    Ok(s)
}

/// Build the canonicalized resource.
///
/// Without query parameters this is just `/<account>`. Otherwise it is
/// `/<account><path>` followed by one `key:value` line per parameter, keys
/// lowercased, in the order they appear on the request.
pub fn canonicalize_resource(ctx: &SigningRequest, account_name: &str) -> String {
    if ctx.query.is_empty() {
        return format!("/{account_name}");
    }

    let mut s = format!("/{account_name}{}", ctx.path_percent_decoded());
    for (k, v) in &ctx.query {
        s.push('\n');
        s.push_str(&k.to_lowercase());
        s.push(':');
        s.push_str(v);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn parts(method: http::Method, uri: &str, content_length: usize) -> Parts {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .header(X_MS_VERSION, ABFS_API_VERSION)
            .header(X_MS_DATE, "Tue, 01 Mar 2022 08:12:34 GMT")
            .header(header::CONTENT_LENGTH, content_length)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_string_to_sign_append() {
        let req = parts(
            http::Method::PATCH,
            "https://account.dfs.core.windows.net/logs/app/20220301_0.log?action=append&position=1024",
            512,
        );
        let ctx = SigningRequest::build(&req).unwrap();

        assert_eq!(
            string_to_sign(&ctx, "account").unwrap(),
            "PATCH\n\n\n512\n\n\n\n\n\n\n\n\n\
             x-ms-date:Tue, 01 Mar 2022 08:12:34 GMT\n\
             x-ms-version:2018-11-09\n\
             /account/logs/app/20220301_0.log\naction:append\nposition:1024"
        );
    }

    #[test]
    fn test_string_to_sign_zero_length_without_query() {
        let req = parts(
            http::Method::HEAD,
            "https://account.dfs.core.windows.net/logs/app/20220301_0.log",
            0,
        );
        let ctx = SigningRequest::build(&req).unwrap();

        assert_eq!(
            string_to_sign(&ctx, "account").unwrap(),
            "HEAD\n\n\n\n\n\n\n\n\n\n\n\n\
             x-ms-date:Tue, 01 Mar 2022 08:12:34 GMT\n\
             x-ms-version:2018-11-09\n\
             /account"
        );
    }

    #[test]
    fn test_canonicalize_resource_keeps_order() {
        let req = parts(
            http::Method::PUT,
            "https://account.dfs.core.windows.net/logs/a.log?resource=file&Recursive=false",
            0,
        );
        let ctx = SigningRequest::build(&req).unwrap();

        assert_eq!(
            canonicalize_resource(&ctx, "account"),
            "/account/logs/a.log\nresource:file\nrecursive:false"
        );
    }

    #[tokio::test]
    async fn test_sign_stamps_headers() {
        let time = Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap();
        let signer = RequestSigner::new().with_time(time);
        let cred = Credential::with_bearer_token("eyJ0eXAi.token");

        let mut req = http::Request::head("https://account.dfs.core.windows.net/logs?resource=filesystem")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        signer
            .sign_request(&Context::new(), &mut req, Some(&cred))
            .await
            .unwrap();

        assert_eq!(
            req.headers.get(X_MS_DATE).unwrap(),
            "Tue, 01 Mar 2022 08:12:34 GMT"
        );
        assert_eq!(req.headers.get(X_MS_VERSION).unwrap(), ABFS_API_VERSION);
        let auth = req.headers.get(header::AUTHORIZATION).unwrap();
        assert!(auth.is_sensitive());
        assert_eq!(auth, "Bearer eyJ0eXAi.token");
    }

    #[tokio::test]
    async fn test_sign_requires_credential() {
        let mut req = parts(http::Method::HEAD, "https://account.dfs.core.windows.net/logs", 0);
        let err = RequestSigner::new()
            .sign_request(&Context::new(), &mut req, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), abfs_core::ErrorKind::RequestInvalid);
    }

    #[tokio::test]
    async fn test_sign_rejects_bad_key() {
        let mut req = parts(http::Method::HEAD, "https://account.dfs.core.windows.net/logs", 0);
        let cred = Credential::with_shared_key("account", "not base64!");
        let err = RequestSigner::new()
            .sign_request(&Context::new(), &mut req, Some(&cred))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), abfs_core::ErrorKind::CredentialInvalid);
    }
}
