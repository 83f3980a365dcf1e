use abfs_core::{Context, Error, ProvideCredential, Result};
use async_trait::async_trait;
use log::debug;

use crate::Credential;

/// AzureCliCredentialProvider provides credentials from Azure CLI
///
/// This provider invokes `az account get-access-token` and takes the token
/// printed on stdout.
#[derive(Clone, Debug)]
pub struct AzureCliCredentialProvider {
    resource: String,
}

impl AzureCliCredentialProvider {
    /// Create a provider requesting tokens for `resource`.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }

    fn args(&self) -> [&str; 8] {
        [
            "account",
            "get-access-token",
            "--resource",
            &self.resource,
            "--query",
            "accessToken",
            "-o",
            "tsv",
        ]
    }
}

#[async_trait]
impl ProvideCredential for AzureCliCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let output = ctx.command_execute("az", &self.args()).await?;

        if !output.success() {
            return Err(Error::credential_invalid(format!(
                "Azure CLI command failed with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim_end()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let token = stdout.trim_end();
        if token.is_empty() {
            return Err(Error::credential_invalid(
                "Azure CLI returned an empty access token",
            ));
        }

        debug!("acquired access token from Azure CLI");
        Ok(Some(Credential::with_bearer_token(token)))
    }
}
