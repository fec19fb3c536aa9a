// Authentication key material: certificate chain and PKCS#8 private key

use crate::core::errors::CryptoError;
use der::Decode;
use pkcs8::PrivateKeyInfo;
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use zeroize::Zeroizing;

/// DER certificates of the server's authentication chain, leaf first
#[derive(Debug, Clone, Default)]
pub struct CertChain {
    certificates: Vec<Vec<u8>>,
}

impl CertChain {
    pub fn from_der(certificates: Vec<Vec<u8>>) -> Self {
        Self { certificates }
    }

    /// Parse every `CERTIFICATE` block of a PEM bundle
    pub fn from_pem(pem_str: &str) -> Result<Self, CryptoError> {
        let blocks = pem::parse_many(pem_str)
            .map_err(|e| CryptoError::CertificateLoadError(format!("Failed to parse PEM: {}", e)))?;

        let certificates = blocks
            .into_iter()
            .filter(|block| block.tag() == "CERTIFICATE")
            .map(|block| block.contents().to_vec())
            .collect();

        Ok(Self { certificates })
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// SHA-256 fingerprint (hex) of every certificate
    pub fn fingerprints(&self) -> Vec<String> {
        self.certificates
            .iter()
            .map(|der| hex::encode(Sha256::digest(der)))
            .collect()
    }
}

/// Private key bytes; zeroized on drop
pub struct AuthPrivateKey {
    algorithm: String,
    key: Secret<Vec<u8>>,
}

impl AuthPrivateKey {
    pub fn from_pem(pem_str: &str) -> Result<Self, CryptoError> {
        let block = pem::parse(pem_str)
            .map_err(|e| CryptoError::KeyLoadError(format!("Failed to parse PEM: {}", e)))?;
        let der_bytes = Zeroizing::new(block.contents().to_vec());

        let info = PrivateKeyInfo::from_der(&der_bytes)
            .map_err(|e| CryptoError::KeyLoadError(format!("Failed to parse PKCS8 DER: {}", e)))?;

        if info.private_key.is_empty() {
            return Err(CryptoError::KeyLoadError("Private key is empty".to_string()));
        }

        Ok(Self {
            algorithm: info.algorithm.oid.to_string(),
            key: Secret::new(info.private_key.to_vec()),
        })
    }

    /// Algorithm OID, e.g. `1.2.840.113549.1.1.1` for RSA
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn key_len(&self) -> usize {
        self.key.expose_secret().len()
    }
}

impl std::fmt::Debug for AuthPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthPrivateKey")
            .field("algorithm", &self.algorithm)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// The server's authentication key: certificate chain plus private key handle
#[derive(Debug, Default)]
pub struct AuthKey {
    cert_chain: Option<CertChain>,
    private_key: Option<AuthPrivateKey>,
}

impl AuthKey {
    pub fn new(cert_chain: Option<CertChain>, private_key: Option<AuthPrivateKey>) -> Self {
        Self {
            cert_chain,
            private_key,
        }
    }

    /// Load the key material; missing paths yield an empty key
    pub fn load(cert_chain_path: Option<&Path>, private_key_path: Option<&Path>) -> Result<Self, CryptoError> {
        let cert_chain = match cert_chain_path {
            Some(path) => {
                let pem_str = fs::read_to_string(path).map_err(|e| {
                    CryptoError::CertificateLoadError(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Some(CertChain::from_pem(&pem_str)?)
            }
            None => None,
        };

        let private_key = match private_key_path {
            Some(path) => {
                let pem_str = Zeroizing::new(fs::read_to_string(path).map_err(|e| {
                    CryptoError::KeyLoadError(format!("Failed to read {}: {}", path.display(), e))
                })?);
                Some(AuthPrivateKey::from_pem(&pem_str)?)
            }
            None => None,
        };

        Ok(Self {
            cert_chain,
            private_key,
        })
    }

    pub fn cert_chain(&self) -> Option<&CertChain> {
        self.cert_chain.as_ref()
    }

    pub fn private_key(&self) -> Option<&AuthPrivateKey> {
        self.private_key.as_ref()
    }

    /// A usable chain is present and non-empty
    pub fn has_cert_chain(&self) -> bool {
        self.cert_chain.as_ref().map(|c| !c.is_empty()).unwrap_or(false)
    }
}
