//! Google credential resolution.
//!
//! Credentials are resolved by walking an ordered [`CredentialChain`]. Each
//! [`CredentialStrategy`] either yields an authenticator, reports itself as
//! not applicable (and the chain moves on), or fails hard. An explicitly
//! configured key file that cannot be loaded is always a hard failure.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};
use yup_oauth2::authenticator::{ApplicationDefaultCredentialsTypes, DefaultAuthenticator};
use yup_oauth2::{
    ApplicationDefaultCredentialsAuthenticator, ApplicationDefaultCredentialsFlowOpts,
    AuthorizedUserAuthenticator, ServiceAccountAuthenticator,
};

use crate::config::WarehouseConfig;
use crate::error::WarehouseError;

/// OAuth scope requested for every token.
pub const SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// How long the metadata server probe may take before the strategy is
/// considered not applicable.
const METADATA_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// ── Strategy ─────────────────────────────────────────────────────

/// One way of obtaining Google credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    /// Service account key file passed via `--key-file` / `BIGQUERY_KEY_FILE`.
    KeyFile(PathBuf),
    /// Service account key file named by `GOOGLE_APPLICATION_CREDENTIALS`.
    EnvironmentKeyFile(PathBuf),
    /// Authorized-user secret written by `gcloud auth application-default login`.
    GcloudUserCredentials(PathBuf),
    /// GCE / GKE metadata server.
    InstanceMetadata,
}

impl fmt::Display for CredentialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialStrategy::KeyFile(p) => write!(f, "key file {}", p.display()),
            CredentialStrategy::EnvironmentKeyFile(p) => {
                write!(f, "GOOGLE_APPLICATION_CREDENTIALS ({})", p.display())
            }
            CredentialStrategy::GcloudUserCredentials(p) => {
                write!(f, "gcloud user credentials ({})", p.display())
            }
            CredentialStrategy::InstanceMetadata => f.write_str("instance metadata server"),
        }
    }
}

impl CredentialStrategy {
    /// Try this strategy. `Ok(None)` means "not applicable here".
    async fn attempt(&self) -> Result<Option<DefaultAuthenticator>, WarehouseError> {
        match self {
            CredentialStrategy::KeyFile(path) | CredentialStrategy::EnvironmentKeyFile(path) => {
                service_account(path).await.map(Some)
            }
            CredentialStrategy::GcloudUserCredentials(path) => {
                if !path.is_file() {
                    debug!(path = %path.display(), "No gcloud user credentials file");
                    return Ok(None);
                }
                authorized_user(path).await.map(Some)
            }
            CredentialStrategy::InstanceMetadata => instance_metadata().await,
        }
    }
}

async fn service_account(path: &Path) -> Result<DefaultAuthenticator, WarehouseError> {
    let key = yup_oauth2::read_service_account_key(path).await.map_err(|e| {
        WarehouseError::Authentication(format!(
            "cannot read service account key '{}': {e}",
            path.display()
        ))
    })?;
    ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(|e| WarehouseError::Authentication(e.to_string()))
}

async fn authorized_user(path: &Path) -> Result<DefaultAuthenticator, WarehouseError> {
    let secret = yup_oauth2::read_authorized_user_secret(path)
        .await
        .map_err(|e| {
            WarehouseError::Authentication(format!(
                "cannot read gcloud credentials '{}': {e}",
                path.display()
            ))
        })?;
    AuthorizedUserAuthenticator::builder(secret)
        .build()
        .await
        .map_err(|e| WarehouseError::Authentication(e.to_string()))
}

async fn instance_metadata() -> Result<Option<DefaultAuthenticator>, WarehouseError> {
    let opts = ApplicationDefaultCredentialsFlowOpts::default();
    let built = match ApplicationDefaultCredentialsAuthenticator::builder(opts).await {
        ApplicationDefaultCredentialsTypes::InstanceMetadata(builder) => builder.build().await,
        ApplicationDefaultCredentialsTypes::ServiceAccount(builder) => builder.build().await,
    };
    let authenticator = match built {
        Ok(a) => a,
        Err(e) => {
            debug!(error = %e, "Metadata authenticator unavailable");
            return Ok(None);
        }
    };

    match tokio::time::timeout(METADATA_PROBE_TIMEOUT, authenticator.token(&[SCOPE])).await {
        Ok(Ok(_)) => Ok(Some(authenticator)),
        Ok(Err(e)) => {
            debug!(error = %e, "Metadata server did not issue a token");
            Ok(None)
        }
        Err(_) => {
            debug!("Metadata server probe timed out");
            Ok(None)
        }
    }
}

// ── Chain ────────────────────────────────────────────────────────

/// Ordered list of strategies, tried first to last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialChain {
    strategies: Vec<CredentialStrategy>,
}

impl CredentialChain {
    /// Build the chain from explicit sources.
    ///
    /// Order: configured key file, `GOOGLE_APPLICATION_CREDENTIALS`, gcloud
    /// user credentials, metadata server. Absent sources are skipped.
    pub fn from_sources(
        key_file: Option<PathBuf>,
        environment_key_file: Option<PathBuf>,
        gcloud_file: Option<PathBuf>,
    ) -> Self {
        let mut strategies = Vec::with_capacity(4);
        if let Some(p) = key_file {
            strategies.push(CredentialStrategy::KeyFile(p));
        }
        if let Some(p) = environment_key_file {
            strategies.push(CredentialStrategy::EnvironmentKeyFile(p));
        }
        if let Some(p) = gcloud_file {
            strategies.push(CredentialStrategy::GcloudUserCredentials(p));
        }
        strategies.push(CredentialStrategy::InstanceMetadata);
        Self { strategies }
    }

    /// Build the chain for `config`, reading the process environment and
    /// the user's home directory.
    pub fn for_config(config: &WarehouseConfig) -> Self {
        let env_key = std::env::var("GOOGLE_APPLICATION_CREDENTIALS")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);
        let gcloud = dirs::home_dir().map(|h| {
            h.join(".config")
                .join("gcloud")
                .join("application_default_credentials.json")
        });
        Self::from_sources(config.key_file.clone(), env_key, gcloud)
    }

    pub fn strategies(&self) -> &[CredentialStrategy] {
        &self.strategies
    }

    /// Walk the chain and return the first usable credentials.
    pub async fn resolve(&self) -> Result<Credentials, WarehouseError> {
        for strategy in &self.strategies {
            debug!(strategy = %strategy, "Trying credential strategy");
            match strategy.attempt().await {
                Ok(Some(authenticator)) => {
                    info!(strategy = %strategy, "Resolved Google credentials");
                    return Ok(Credentials {
                        source: strategy.clone(),
                        authenticator,
                    });
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!(strategy = %strategy, error = %e, "Credential strategy failed");
                    return Err(e);
                }
            }
        }
        Err(WarehouseError::Authentication(
            "no Google credentials found (tried key file, GOOGLE_APPLICATION_CREDENTIALS, \
             gcloud user credentials, metadata server)"
                .into(),
        ))
    }
}

// ── Credentials ──────────────────────────────────────────────────

/// Resolved credentials able to mint bearer tokens.
#[derive(Clone)]
pub struct Credentials {
    source: CredentialStrategy,
    authenticator: DefaultAuthenticator,
}

impl Credentials {
    /// Which strategy produced these credentials.
    pub fn source(&self) -> &CredentialStrategy {
        &self.source
    }

    /// A currently valid access token. yup-oauth2 caches and refreshes it.
    pub async fn bearer_token(&self) -> Result<String, WarehouseError> {
        let token = self
            .authenticator
            .token(&[SCOPE])
            .await
            .map_err(|e| WarehouseError::Authentication(e.to_string()))?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| WarehouseError::Authentication("token response had no access token".into()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
