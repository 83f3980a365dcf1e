use std::fmt::{Debug, Formatter};
use std::time::Duration;

use abfs_core::utils::Redact;
use abfs_core::{Context, Error, Result};
use serde::Deserialize;

use crate::constants::*;

/// Config carries all the configuration for appending to Azure Data Lake Storage Gen2.
///
/// Every field has a default, so a TOML document only needs to name what it changes:
///
/// ```toml
/// account_name = "mystorageaccount"
/// account_key = "dGVzdF9zdG9yYWdlX2FjY2Vzc19rZXk="
/// container = "logs"
/// path = "app/"
/// ```
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage account name, the first label of `<account>.dfs.core.windows.net`.
    ///
    /// - env value: [`AZURE_STORAGE_ACCOUNT`]
    pub account_name: Option<String>,
    /// Base64 storage account key. Enables shared key signing when set.
    ///
    /// - env value: [`AZURE_STORAGE_ACCESS_KEY`]
    pub account_key: Option<String>,
    /// ARM resource id of the managed identity. Enables the instance metadata strategy when set.
    ///
    /// - env value: [`AZURE_MSI_RES_ID`]
    pub instance_msi: Option<String>,
    /// Client id of a user assigned managed identity.
    ///
    /// - env value: [`AZURE_CLIENT_ID`]
    pub client_id: Option<String>,
    /// Object id of a user assigned managed identity.
    ///
    /// - env value: [`AZURE_OBJECT_ID`]
    pub object_id: Option<String>,
    /// Application id used by the OAuth client credentials strategy.
    ///
    /// - env value: [`AZURE_CLIENT_ID`]
    pub oauth_app_id: Option<String>,
    /// Application secret used by the OAuth client credentials strategy.
    ///
    /// - env value: [`AZURE_CLIENT_SECRET`]
    pub oauth_secret: Option<String>,
    /// Tenant used by the OAuth client credentials strategy.
    ///
    /// - env value: [`AZURE_TENANT_ID`]
    pub oauth_tenant_id: Option<String>,
    /// Authority host of the OAuth token endpoint.
    ///
    /// - env value: [`AZURE_AUTHORITY_HOST`]
    pub oauth_identity_authority: String,
    /// Fall back to `az account get-access-token` when nothing else is configured.
    pub oauth_use_azure_cli: bool,
    /// Seconds between background token refreshes. `0` disables refreshing.
    pub oauth_refresh_interval: u64,

    /// Target container (filesystem).
    pub container: Option<String>,
    /// Template every blob path is resolved from.
    pub object_key_format: String,
    /// Value substituted for `%{path}`.
    pub path: String,
    /// Value substituted for `%{file_extension}`.
    pub file_extension: String,
    /// strftime format for `%{time_slice}` and `%{date_slice}`.
    pub time_slice_format: String,
    /// strftime format for `%{upload_timestamp}`.
    pub upload_timestamp_format: String,
    /// Number of hex characters substituted for `%{hex_random}`.
    pub hex_random_length: usize,
    /// Use local time instead of UTC for `%{hms_slice}` and `%{upload_timestamp}`.
    pub localtime: bool,

    /// Create the container at startup when it is missing.
    pub auto_create_container: bool,
    /// Do not touch the container at startup at all.
    pub skip_container_check: bool,
    /// Log a failing container check at startup and carry on.
    pub failsafe_container_check: bool,
    /// Assume blank targets: create every blob and append from position 0.
    pub write_only: bool,
    /// Report upload failures as retryable so the host re-delivers the chunk.
    pub enable_retry: bool,
    /// Abort startup when the first credential acquisition fails.
    pub startup_fail_on_error: bool,

    /// Domain suffix appended to the account name.
    pub url_domain_suffix: String,
    /// Resource tokens are requested for.
    pub url_storage_resource: String,

    /// Proxy every HTTP exchange through this url.
    pub proxy_url: Option<String>,
    /// Proxy basic auth user.
    pub proxy_username: Option<String>,
    /// Proxy basic auth password.
    pub proxy_password: Option<String>,
    /// Timeout applied to each HTTP exchange.
    pub http_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account_name: None,
            account_key: None,
            instance_msi: None,
            client_id: None,
            object_id: None,
            oauth_app_id: None,
            oauth_secret: None,
            oauth_tenant_id: None,
            oauth_identity_authority: DEFAULT_AUTHORITY_HOST.to_string(),
            oauth_use_azure_cli: false,
            oauth_refresh_interval: 3600,
            container: None,
            object_key_format: DEFAULT_OBJECT_KEY_FORMAT.to_string(),
            path: String::new(),
            file_extension: "log".to_string(),
            time_slice_format: "%Y%m%d".to_string(),
            upload_timestamp_format: "%H%M%S%3f".to_string(),
            hex_random_length: 4,
            localtime: false,
            auto_create_container: false,
            skip_container_check: false,
            failsafe_container_check: false,
            write_only: false,
            enable_retry: false,
            startup_fail_on_error: true,
            url_domain_suffix: DEFAULT_URL_DOMAIN_SUFFIX.to_string(),
            url_storage_resource: DEFAULT_STORAGE_RESOURCE.to_string(),
            proxy_url: None,
            proxy_username: None,
            proxy_password: None,
            http_timeout_seconds: 120,
        }
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&self.account_key))
            .field("instance_msi", &self.instance_msi)
            .field("client_id", &self.client_id)
            .field("object_id", &self.object_id)
            .field("oauth_app_id", &self.oauth_app_id)
            .field("oauth_secret", &Redact::from(&self.oauth_secret))
            .field("oauth_tenant_id", &self.oauth_tenant_id)
            .field("oauth_identity_authority", &self.oauth_identity_authority)
            .field("oauth_use_azure_cli", &self.oauth_use_azure_cli)
            .field("oauth_refresh_interval", &self.oauth_refresh_interval)
            .field("container", &self.container)
            .field("object_key_format", &self.object_key_format)
            .field("path", &self.path)
            .field("write_only", &self.write_only)
            .field("enable_retry", &self.enable_retry)
            .field("url_domain_suffix", &self.url_domain_suffix)
            .field("proxy_url", &self.proxy_url)
            .field("proxy_password", &Redact::from(&self.proxy_password))
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Parse config from a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::config_invalid("failed to parse config as toml").with_source(e))
    }

    /// Fill fields that are still unset from the environment.
    ///
    /// Values already present in the config win over the environment.
    pub fn from_env(mut self, ctx: &Context) -> Self {
        let envs = ctx.env_vars();
        let pick = |slot: &mut Option<String>, key: &str| {
            if slot.is_none() {
                if let Some(v) = envs.get(key).filter(|v| !v.is_empty()) {
                    *slot = Some(v.clone());
                }
            }
        };

        pick(&mut self.account_name, AZURE_STORAGE_ACCOUNT);
        pick(&mut self.account_key, AZURE_STORAGE_ACCESS_KEY);
        pick(&mut self.oauth_tenant_id, AZURE_TENANT_ID);
        pick(&mut self.client_id, AZURE_CLIENT_ID);
        pick(&mut self.oauth_app_id, AZURE_CLIENT_ID);
        pick(&mut self.oauth_secret, AZURE_CLIENT_SECRET);
        pick(&mut self.object_id, AZURE_OBJECT_ID);
        pick(&mut self.instance_msi, AZURE_MSI_RES_ID);

        if self.oauth_identity_authority == DEFAULT_AUTHORITY_HOST {
            if let Some(v) = envs.get(AZURE_AUTHORITY_HOST).filter(|v| !v.is_empty()) {
                self.oauth_identity_authority = v.clone();
            }
        }

        self
    }

    /// Check the config is complete enough to start.
    pub fn validate(&self) -> Result<()> {
        if self.account_name.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::config_invalid("account_name is required"));
        }
        if self.container.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::config_invalid("container is required"));
        }
        if self.object_key_format.is_empty() {
            return Err(Error::config_invalid("object_key_format must not be empty"));
        }
        if self.http_timeout_seconds == 0 {
            return Err(Error::config_invalid("http_timeout_seconds must be positive"));
        }
        if self.proxy_username.is_some() != self.proxy_password.is_some() {
            return Err(Error::config_invalid(
                "proxy_username and proxy_password must be set together",
            ));
        }
        Ok(())
    }

    /// Account name, or an error when it is missing.
    pub fn account_name(&self) -> Result<&str> {
        self.account_name
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::config_invalid("account_name is required"))
    }

    /// Container name, or an error when it is missing.
    pub fn container(&self) -> Result<&str> {
        self.container
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::config_invalid("container is required"))
    }

    /// Host every storage request goes to.
    pub fn account_host(&self) -> Result<String> {
        Ok(format!("{}{}", self.account_name()?, self.url_domain_suffix))
    }

    /// Build the http client shared by storage calls and token endpoints.
    pub fn build_http_client(&self) -> Result<reqwest::Client> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(self.http_timeout_seconds));

        if let Some(url) = self.proxy_url.as_deref().filter(|v| !v.is_empty()) {
            let mut proxy = reqwest::Proxy::all(url)
                .map_err(|e| Error::config_invalid("proxy_url is invalid").with_source(e))?;
            if let (Some(user), Some(password)) = (&self.proxy_username, &self.proxy_password) {
                proxy = proxy.basic_auth(user, password);
            }
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| Error::config_invalid("failed to build http client").with_source(e))
    }
}
