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

use abfs_core::time::{now, DateTime};
use abfs_core::utils::Redact;
use abfs_core::SigningCredential;
use std::fmt::{Debug, Formatter};

/// Credential enum for the two Azure Storage authentication schemes.
#[derive(Clone, PartialEq)]
pub enum Credential {
    /// Shared Key authentication with account name and key
    SharedKey {
        /// Azure storage account name.
        account_name: String,
        /// Azure storage account key, base64 encoded as shown in the portal.
        account_key: String,
    },
    /// Bearer token for OAuth authentication
    BearerToken {
        /// Bearer token.
        token: String,
        /// When this token was acquired.
        ///
        /// Tokens are replaced by periodic refresh, never by reading an expiry claim.
        obtained_at: DateTime,
    },
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => f
                .debug_struct("Credential::SharedKey")
                .field("account_name", account_name)
                .field("account_key", &Redact::from(account_key))
                .finish(),
            Credential::BearerToken { token, obtained_at } => f
                .debug_struct("Credential::BearerToken")
                .field("token", &Redact::from(token))
                .field("obtained_at", obtained_at)
                .finish(),
        }
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        match self {
            Credential::SharedKey {
                account_name,
                account_key,
            } => !account_name.is_empty() && !account_key.is_empty(),
            Credential::BearerToken { token, .. } => !token.is_empty(),
        }
    }
}

impl Credential {
    /// Create a new credential with shared key authentication.
    pub fn with_shared_key(account_name: &str, account_key: &str) -> Self {
        Self::SharedKey {
            account_name: account_name.to_string(),
            account_key: account_key.to_string(),
        }
    }

    /// Create a new credential with bearer token authentication.
    ///
    /// Trailing whitespace (the newline printed by CLI tools, for instance) is dropped.
    pub fn with_bearer_token(bearer_token: &str) -> Self {
        Self::BearerToken {
            token: bearer_token.trim_end().to_string(),
            obtained_at: now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_is_trimmed() {
        let cred = Credential::with_bearer_token("eyJ0eXAiOiJKV1Qi\n");
        match cred {
            Credential::BearerToken { token, .. } => assert_eq!(token, "eyJ0eXAiOiJKV1Qi"),
            _ => panic!("expected bearer token"),
        }
    }

    #[test]
    fn test_validity() {
        assert!(Credential::with_shared_key("account", "a2V5").is_valid());
        assert!(!Credential::with_shared_key("account", "").is_valid());
        assert!(!Credential::with_bearer_token("  \n").is_valid());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cred = Credential::with_shared_key("account", "dGVzdF9zdG9yYWdlX2FjY2Vzc19rZXk=");
        let s = format!("{cred:?}");
        assert!(s.contains("account"));
        assert!(!s.contains("dGVzdF9zdG9yYWdlX2FjY2Vzc19rZXk="));
    }
}
