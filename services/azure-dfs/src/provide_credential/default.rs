use crate::provide_credential::{
    AzureCliCredentialProvider, ClientSecretCredentialProvider, ImdsCredentialProvider,
    StaticCredentialProvider,
};
use crate::{Config, Credential};
use abfs_core::{Context, Error, ProvideCredential, Result};
use async_trait::async_trait;

/// Default loader that picks exactly one credential source from the config.
///
/// The source is decided once, at construction, in this order:
/// 1. Shared key (`account_key`)
/// 2. Managed identity through IMDS (`instance_msi`)
/// 3. Client secret (`oauth_app_id`, `oauth_secret` and `oauth_tenant_id`)
/// 4. Azure CLI (`oauth_use_azure_cli`)
///
/// Unlike a provider chain, a failing source never falls through to the next one.
#[derive(Debug, Clone)]
pub struct DefaultCredentialProvider {
    strategy: Strategy,
}

#[derive(Debug, Clone)]
enum Strategy {
    SharedKey(StaticCredentialProvider),
    Imds(ImdsCredentialProvider),
    ClientSecret(ClientSecretCredentialProvider),
    AzureCli(AzureCliCredentialProvider),
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|v| !v.is_empty())
}

impl DefaultCredentialProvider {
    /// Select the credential source for this config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let strategy = if let Some(account_key) = non_empty(&config.account_key) {
            Strategy::SharedKey(StaticCredentialProvider::new(
                config.account_name()?,
                account_key,
            ))
        } else if let Some(msi) = non_empty(&config.instance_msi) {
            Strategy::Imds(
                ImdsCredentialProvider::new(&config.url_storage_resource)
                    .with_msi_res_id(Some(msi.to_string()))
                    .with_client_id(config.client_id.clone())
                    .with_object_id(config.object_id.clone()),
            )
        } else if let (Some(app_id), Some(secret), Some(tenant)) = (
            non_empty(&config.oauth_app_id),
            non_empty(&config.oauth_secret),
            non_empty(&config.oauth_tenant_id),
        ) {
            Strategy::ClientSecret(
                ClientSecretCredentialProvider::new(tenant, app_id, secret)
                    .with_authority_host(&config.oauth_identity_authority)
                    .with_resource(&config.url_storage_resource),
            )
        } else if config.oauth_use_azure_cli {
            Strategy::AzureCli(AzureCliCredentialProvider::new(
                &config.url_storage_resource,
            ))
        } else {
            return Err(Error::config_invalid(
                "no credential configured: set account_key, instance_msi, \
                 oauth_app_id/oauth_secret/oauth_tenant_id or oauth_use_azure_cli",
            ));
        };

        Ok(Self { strategy })
    }

    /// Whether requests are signed with the shared key, which never needs refreshing.
    pub fn is_shared_key(&self) -> bool {
        matches!(self.strategy, Strategy::SharedKey(_))
    }

    /// Human readable name of the selected source.
    pub fn name(&self) -> &'static str {
        match self.strategy {
            Strategy::SharedKey(_) => "shared key",
            Strategy::Imds(_) => "managed identity",
            Strategy::ClientSecret(_) => "client secret",
            Strategy::AzureCli(_) => "azure cli",
        }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        match &self.strategy {
            Strategy::SharedKey(p) => p.provide_credential(ctx).await,
            Strategy::Imds(p) => p.provide_credential(ctx).await,
            Strategy::ClientSecret(p) => p.provide_credential(ctx).await,
            Strategy::AzureCli(p) => p.provide_credential(ctx).await,
        }
    }
}
