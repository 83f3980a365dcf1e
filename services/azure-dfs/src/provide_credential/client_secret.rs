use crate::constants::*;
use crate::Credential;
use abfs_core::utils::Redact;
use abfs_core::{Context, Error, ProvideCredential, Result};
use async_trait::async_trait;

use super::parse_token_response;

/// Load credential with the OAuth 2.0 client credentials grant.
///
/// Talks to the v1 token endpoint `<authority>/<tenant>/oauth2/token`, which
/// takes a `resource` instead of a scope.
///
/// Reference: <https://learn.microsoft.com/en-us/previous-versions/azure/active-directory/azuread-dev/v1-oauth2-client-creds-grant-flow>
#[derive(Clone)]
pub struct ClientSecretCredentialProvider {
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    resource: String,
}

impl std::fmt::Debug for ClientSecretCredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretCredentialProvider")
            .field("authority_host", &self.authority_host)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &Redact::from(&self.client_secret))
            .field("resource", &self.resource)
            .finish()
    }
}

impl ClientSecretCredentialProvider {
    /// Create a new client secret loader.
    pub fn new(tenant_id: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            resource: DEFAULT_STORAGE_RESOURCE.to_string(),
        }
    }

    /// Set the authority host.
    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = authority_host.into();
        self
    }

    /// Set the resource tokens are requested for.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }
}

#[async_trait]
impl ProvideCredential for ClientSecretCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("api-version", ACCESS_TOKEN_API_VERSION)
            .append_pair("resource", &self.resource)
            .finish();
        let url = format!(
            "{}/{}/oauth2/token?{query}",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        );

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("resource", &self.resource)
            .finish();

        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri(&url)
            .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(bytes::Bytes::from(body))
            .map_err(|e| {
                Error::unexpected("failed to build client secret request").with_source(e)
            })?;

        let resp = ctx.http_send(req).await?;
        parse_token_response("OAuth endpoint", resp).map(Some)
    }
}
