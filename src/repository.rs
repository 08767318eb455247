/*!
 * Artifact repository descriptor
 */

use crate::credentials::Credentials;
use crate::error::{Result, TransportError};
use std::collections::HashSet;
use url::Url;

/// A named remote repository and the credentials configured for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRepository {
    name: String,
    url: Url,
    credentials: Credentials,
}

impl ArtifactRepository {
    pub fn new(name: impl Into<String>, url: Url, credentials: Credentials) -> Self {
        Self {
            name: name.into(),
            url,
            credentials,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URI scheme of the repository, lower-cased
    pub fn protocol(&self) -> String {
        self.url.scheme().to_ascii_lowercase()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Credentials to hand to a transport serving `schemes`
    ///
    /// A repository carries a single credential kind, so every scheme set
    /// receives the same value; `s3` transports expect it to be an
    /// access key pair.
    pub fn credentials_for_schemes(&self, _schemes: &HashSet<String>) -> &Credentials {
        &self.credentials
    }

    /// Location of `resource` below the repository root
    ///
    /// The root is treated as a directory whether or not it ends in `/`, so
    /// `s3://bucket/releases` + `a/b.jar` becomes `s3://bucket/releases/a/b.jar`.
    pub fn resolve(&self, resource: &str) -> Result<Url> {
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join(resource.trim_start_matches('/')).map_err(|e| {
            TransportError::configuration_with(
                format!("Cannot resolve {} against {}", resource, self.url),
                e,
            )
        })
    }
}
