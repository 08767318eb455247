/*!
 * Repository credentials
 *
 * A repository carries exactly one credential kind, chosen when it is
 * configured: a username/password pair or an AWS access key pair.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// AWS access key pair
///
/// Either half may be absent. Equality and hashing cover both fields, absent
/// values included.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AwsCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret_key: Option<String>,
}

impl AwsCredentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: Some(access_key.into()),
            secret_key: Some(secret_key.into()),
        }
    }

    pub fn access_key(&self) -> Option<&str> {
        self.access_key.as_deref()
    }

    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key.as_deref()
    }

    pub fn set_access_key(&mut self, access_key: Option<String>) {
        self.access_key = access_key;
    }

    pub fn set_secret_key(&mut self, secret_key: Option<String>) {
        self.secret_key = secret_key;
    }

    /// True when exactly one half of the pair is set
    pub fn is_partial(&self) -> bool {
        self.access_key.is_some() != self.secret_key.is_some()
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Username and password, the default credential kind of a repository
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PasswordCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl PasswordCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }
}

impl fmt::Debug for PasswordCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The single credential kind attached to a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    Password(PasswordCredentials),
    AccessKeyPair(AwsCredentials),
}

impl Default for Credentials {
    fn default() -> Self {
        Credentials::Password(PasswordCredentials::default())
    }
}

impl Credentials {
    /// Short name used in log and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::Password(_) => "password",
            Credentials::AccessKeyPair(_) => "aws access key",
        }
    }

    pub fn as_aws(&self) -> Option<&AwsCredentials> {
        match self {
            Credentials::AccessKeyPair(aws) => Some(aws),
            Credentials::Password(_) => None,
        }
    }
}

impl From<AwsCredentials> for Credentials {
    fn from(aws: AwsCredentials) -> Self {
        Credentials::AccessKeyPair(aws)
    }
}

impl From<PasswordCredentials> for Credentials {
    fn from(password: PasswordCredentials) -> Self {
        Credentials::Password(password)
    }
}
