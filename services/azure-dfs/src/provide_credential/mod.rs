mod static_provider;
pub use static_provider::StaticCredentialProvider;

mod imds;
pub use imds::ImdsCredentialProvider;

mod client_secret;
pub use client_secret::ClientSecretCredentialProvider;

mod azure_cli;
pub use azure_cli::AzureCliCredentialProvider;

mod default;
pub use default::DefaultCredentialProvider;

use crate::Credential;
use abfs_core::{Error, Result};
use bytes::Bytes;
use log::debug;

#[derive(serde::Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Turn a token endpoint response into a bearer credential.
///
/// Both the instance metadata endpoint and the OAuth endpoint answer with a
/// JSON document carrying `access_token`; anything else is an acquisition failure.
fn parse_token_response(source: &str, resp: http::Response<Bytes>) -> Result<Credential> {
    let status = resp.status();
    if !status.is_success() {
        let body = String::from_utf8_lossy(resp.body());
        return Err(Error::credential_invalid(format!(
            "failed to acquire access token from {source}. {}: {body}",
            status.as_u16()
        )));
    }

    let token: AccessTokenResponse = serde_json::from_slice(resp.body()).map_err(|e| {
        Error::credential_invalid(format!("failed to parse {source} token response"))
            .with_source(e)
    })?;
    let access_token = token.access_token.trim_end();
    if access_token.is_empty() {
        return Err(Error::credential_invalid(format!(
            "{source} returned an empty access token"
        )));
    }

    debug!("acquired access token from {source}");
    Ok(Credential::with_bearer_token(access_token))
}
