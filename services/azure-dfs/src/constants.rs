use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use std::time::Duration;

// Headers used in azure services.
pub const X_MS_DATE: &str = "x-ms-date";
pub const X_MS_VERSION: &str = "x-ms-version";
pub const METADATA: &str = "Metadata";

/// Storage service version every request is signed and sent with.
pub const ABFS_API_VERSION: &str = "2018-11-09";
/// Version of the instance metadata and OAuth token endpoints.
pub const ACCESS_TOKEN_API_VERSION: &str = "2018-02-01";

pub const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

pub const DEFAULT_URL_DOMAIN_SUFFIX: &str = ".dfs.core.windows.net";
pub const DEFAULT_STORAGE_RESOURCE: &str = "https://storage.azure.com/";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_OBJECT_KEY_FORMAT: &str = "%{path}%{time_slice}_%{index}.%{file_extension}";

/// Largest block a single append call may carry.
pub const BLOCK_SIZE_LIMIT: usize = 4 * 1024 * 1024 - 1;

/// Delay between startup credential attempts when startup failures are tolerated.
pub const STARTUP_RETRY_DELAY: Duration = Duration::from_secs(20);

pub const CREATE_BLOB_CONTENT_TYPE: &str = "text/plain";

// Env values used in azure services.
pub const AZURE_STORAGE_ACCOUNT: &str = "AZURE_STORAGE_ACCOUNT";
pub const AZURE_STORAGE_ACCESS_KEY: &str = "AZURE_STORAGE_ACCESS_KEY";
pub const AZURE_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const AZURE_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const AZURE_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const AZURE_OBJECT_ID: &str = "AZURE_OBJECT_ID";
pub const AZURE_MSI_RES_ID: &str = "AZURE_MSI_RES_ID";
pub const AZURE_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";

/// AsciiSet for blob paths: everything but unreserved characters and `/` is encoded.
pub static AZURE_PATH_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
