// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::constants::*;
use crate::Credential;
use abfs_core::{Context, Error, ProvideCredential, Result};
use async_trait::async_trait;

use super::parse_token_response;

/// Load credential from Azure Instance Metadata Service (IMDS).
///
/// This loader retrieves an access token for a managed identity from the
/// metadata endpoint available on Azure VMs and other Azure compute resources.
///
/// Reference: <https://learn.microsoft.com/en-us/entra/identity/managed-identities-azure-resources/how-to-use-vm-token#get-a-token-using-http>
#[derive(Debug, Clone)]
pub struct ImdsCredentialProvider {
    endpoint: String,
    resource: String,
    msi_res_id: Option<String>,
    client_id: Option<String>,
    object_id: Option<String>,
}

impl ImdsCredentialProvider {
    /// Create a new IMDS loader requesting tokens for `resource`.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            endpoint: IMDS_TOKEN_ENDPOINT.to_string(),
            resource: resource.into(),
            msi_res_id: None,
            client_id: None,
            object_id: None,
        }
    }

    /// Override the metadata endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the ARM resource id of the managed identity.
    pub fn with_msi_res_id(mut self, msi_res_id: Option<String>) -> Self {
        self.msi_res_id = msi_res_id;
        self
    }

    /// Set the client id of the managed identity.
    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id;
        self
    }

    /// Set the object id of the managed identity.
    pub fn with_object_id(mut self, object_id: Option<String>) -> Self {
        self.object_id = object_id;
        self
    }

    fn url(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("api-version", ACCESS_TOKEN_API_VERSION)
            .append_pair("resource", &self.resource);
        if let Some(v) = self.msi_res_id.as_deref().filter(|v| !v.is_empty()) {
            query.append_pair("msi_res_id", v);
        }
        if let Some(v) = self.client_id.as_deref().filter(|v| !v.is_empty()) {
            query.append_pair("client_id", v);
        }
        if let Some(v) = self.object_id.as_deref().filter(|v| !v.is_empty()) {
            query.append_pair("object_id", v);
        }
        format!("{}?{}", self.endpoint, query.finish())
    }
}

#[async_trait]
impl ProvideCredential for ImdsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(self.url())
            .header(METADATA, "true")
            .body(bytes::Bytes::new())
            .map_err(|e| Error::unexpected("failed to build IMDS request").with_source(e))?;

        let resp = ctx.http_send(req).await?;
        parse_token_response("IMDS", resp).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_url_includes_identity_selectors() {
        let provider = ImdsCredentialProvider::new(DEFAULT_STORAGE_RESOURCE)
            .with_msi_res_id(Some("/subscriptions/sub/identity".to_string()))
            .with_client_id(None)
            .with_object_id(Some("object".to_string()));

        assert_eq!(
            provider.url(),
            "http://169.254.169.254/metadata/identity/oauth2/token?api-version=2018-02-01\
             &resource=https%3A%2F%2Fstorage.azure.com%2F\
             &msi_res_id=%2Fsubscriptions%2Fsub%2Fidentity&object_id=object"
        );
    }
}
