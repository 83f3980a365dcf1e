use abfs_core::hash::base64_decode;
use abfs_core::{Context, Error, ProvideCredential, Result};
use async_trait::async_trait;

use crate::Credential;

/// StaticCredentialProvider hands out a fixed shared key.
///
/// No token endpoint is involved and nothing ever needs refreshing. The key is
/// checked to be valid base64 every time it is handed out.
#[derive(Clone)]
pub struct StaticCredentialProvider {
    account_name: String,
    account_key: String,
}

impl std::fmt::Debug for StaticCredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentialProvider")
            .field("account_name", &self.account_name)
            .field("account_key", &abfs_core::utils::Redact::from(&self.account_key))
            .finish()
    }
}

impl StaticCredentialProvider {
    /// Create a provider for the given account name and base64 account key.
    pub fn new(account_name: &str, account_key: &str) -> Self {
        Self {
            account_name: account_name.to_string(),
            account_key: account_key.to_string(),
        }
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        base64_decode(&self.account_key).map_err(|e| {
            Error::credential_invalid(format!(
                "account key of '{}' is not valid base64",
                self.account_name
            ))
            .with_source(e)
        })?;

        Ok(Some(Credential::with_shared_key(
            &self.account_name,
            &self.account_key,
        )))
    }
}
