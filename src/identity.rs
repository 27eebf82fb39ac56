use std::fmt;

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    first_name: String,
    last_name: String,
}

impl Name {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Stored credential is not in `salt$digest` form")]
    Malformed,
    #[error("Stored credential is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Salted SHA-256 digest of a depositor's secret.
///
/// The plain secret is never kept. Checking a candidate re-derives the digest
/// with the stored salt and compares in constant time.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    salt: [u8; SALT_LEN],
    digest: [u8; DIGEST_LEN],
}

impl Credential {
    /// Derives a credential for `secret` under a fresh random salt.
    pub fn derive(secret: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::with_salt(salt, secret)
    }

    fn with_salt(salt: [u8; SALT_LEN], secret: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(secret.as_bytes());
        Self {
            salt,
            digest: hasher.finalize().into(),
        }
    }

    pub fn verify(&self, secret: &str) -> bool {
        let candidate = Self::with_salt(self.salt, secret);
        bool::from(candidate.digest.as_slice().ct_eq(self.digest.as_slice()))
    }

    /// Text form stored in the `password` column.
    pub fn encode(&self) -> String {
        format!("{}${}", hex::encode(self.salt), hex::encode(self.digest))
    }

    pub fn decode(stored: &str) -> Result<Self, CredentialError> {
        let (salt_hex, digest_hex) = stored.split_once('$').ok_or(CredentialError::Malformed)?;
        let mut salt = [0u8; SALT_LEN];
        let mut digest = [0u8; DIGEST_LEN];
        hex::decode_to_slice(salt_hex, &mut salt)?;
        hex::decode_to_slice(digest_hex, &mut digest)?;
        Ok(Self { salt, digest })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}

/// The person behind an account, with contact details and login credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depositor {
    name: Name,
    ssn: String,
    address: String,
    phone: String,
    email: String,
    credential: Credential,
}

impl Depositor {
    pub fn new(
        name: Name,
        ssn: impl Into<String>,
        address: impl Into<String>,
        phone: impl Into<String>,
        email: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            name,
            ssn: ssn.into(),
            address: address.into(),
            phone: phone.into(),
            email: email.into(),
            credential,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn ssn(&self) -> &str {
        &self.ssn
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = credential;
    }
}
