use crate::{Context, Error, ProvideCredential, Result, SignRequest, SigningCredential};
use log::debug;
use std::sync::{Arc, RwLock};

/// Signer is the main struct used to sign the request.
///
/// It owns the single active credential slot. Readers clone the credential
/// under a read guard; [`Signer::refresh`] replaces it wholesale and only
/// takes the write guard once a new credential is in hand, so a failed
/// refresh leaves the previous credential untouched.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    provider: Arc<dyn ProvideCredential<Credential = K>>,
    builder: Arc<dyn SignRequest<Credential = K>>,
    credential: Arc<RwLock<Option<K>>>,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        provider: impl ProvideCredential<Credential = K>,
        builder: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,

            provider: Arc::new(provider),
            builder: Arc::new(builder),
            credential: Arc::new(RwLock::new(None)),
        }
    }

    /// The context used by this signer.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Snapshot of the active credential.
    pub fn credential(&self) -> Option<K> {
        self.credential
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Acquire a new credential from the provider and make it the active one.
    pub async fn refresh(&self) -> Result<()> {
        let Some(cred) = self.provider.provide_credential(&self.ctx).await? else {
            return Err(Error::credential_invalid(
                "credential provider returned no credential",
            ));
        };
        if !cred.is_valid() {
            return Err(Error::credential_invalid(
                "credential provider returned an unusable credential",
            ));
        }

        debug!("replacing active credential: {cred:?}");
        *self
            .credential
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(cred);
        Ok(())
    }

    /// Signing request.
    ///
    /// The provider is only consulted when no usable credential is loaded yet.
    pub async fn sign(&self, req: &mut http::request::Parts) -> Result<()> {
        let mut cred = self.credential();
        if !cred.is_valid() {
            self.refresh().await?;
            cred = self.credential();
        }

        self.builder
            .sign_request(&self.ctx, req, cred.as_ref())
            .await
    }
}
