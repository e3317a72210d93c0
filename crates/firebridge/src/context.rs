// Provider context.
//
// Region, credentials, and provider mode travel as an explicit value
// handed to the client, so one process can serve classic and modern
// sessions concurrently without any ambient configuration.

use secrecy::SecretString;
use url::Url;

use crate::dialect::{ProviderMode, WireDialect};
use crate::error::Error;

/// API credentials for the backend session.
///
/// The secret key is held behind `secrecy` so it never lands in debug
/// output or logs. Signing itself happens below the transport boundary.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
        }
    }
}

/// Everything an operation needs to know about the active session.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    endpoint: Url,
    region_id: Option<String>,
    credentials: Credentials,
    mode: ProviderMode,
}

impl ProviderContext {
    pub fn new(endpoint: Url, credentials: Credentials, mode: ProviderMode) -> Self {
        Self {
            endpoint,
            region_id: None,
            credentials,
            mode,
        }
    }

    /// Set the active region. Listing and describe calls require one.
    pub fn with_region(mut self, region_id: impl Into<String>) -> Self {
        self.region_id = Some(region_id.into());
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn mode(&self) -> ProviderMode {
        self.mode
    }

    /// The wire dialect for this session. Looked up fresh inside every
    /// operation rather than cached on the client, since a long-lived
    /// adapter may be rebound to a different session.
    pub fn dialect(&self) -> WireDialect {
        WireDialect::for_mode(self.mode)
    }

    /// The active region, or [`Error::NoRegion`] if none is set.
    pub fn region_id(&self) -> Result<&str, Error> {
        self.region_id.as_deref().ok_or(Error::NoRegion)
    }
}
