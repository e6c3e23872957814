use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use k256::ecdsa::SigningKey;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{KeyMaterial, KeyName, KeyStore};
use crate::crypto::{self, Address};
use crate::error::{KeyStoreError, Result};

const KEY_FILE_VERSION: u32 = 1;
const KEY_FILE_EXTENSION: &str = "key";
const CIPHER: &str = "aes-256-gcm";
const KDF: &str = "pbkdf2-sha256";
const SALT_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

/// OWASP recommended minimum for PBKDF2-HMAC-SHA256.
pub const DEFAULT_KDF_ITERATIONS: u32 = 600_000;

/// On-disk key record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedKeyFile {
    pub version: u32,
    pub name: String,
    pub address: Address,
    /// Hex-encoded compressed public key
    pub public_key: String,
    pub created_at: String,
    pub crypto: CryptoParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoParams {
    pub cipher: String,
    pub kdf: String,
    pub iterations: u32,
    /// Base64-encoded salt for PBKDF2
    pub salt: String,
    /// Base64-encoded nonce for AES-GCM
    pub nonce: String,
    /// Base64-encoded encrypted private key
    pub ciphertext: String,
}

/// Keys persisted as one password-encrypted file per name under a directory.
///
/// The directory is created on the first write.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
    kdf_iterations: u32,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
        }
    }

    /// Override the PBKDF2 work factor used for newly created keys.
    /// Existing files keep the count they were written with.
    pub fn with_kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, name: KeyName) -> PathBuf {
        self.dir.join(format!("{}.{}", name.as_str(), KEY_FILE_EXTENSION))
    }

    fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; 32]> {
        let mut key = Zeroizing::new([0u8; 32]);
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key[..]);
        key
    }

    fn encrypt(&self, material: &KeyMaterial, password: &str) -> Result<EncryptedKeyFile> {
        let mut salt = [0u8; SALT_LENGTH];
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let key = Self::derive_key(password, &salt, self.kdf_iterations);
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| KeyStoreError::Crypto(format!("failed to create cipher: {}", e)))?;

        let secret = Zeroizing::new(material.signing_key().to_bytes());
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), secret.as_slice())
            .map_err(|e| KeyStoreError::Crypto(format!("encryption failed: {}", e)))?;

        Ok(EncryptedKeyFile {
            version: KEY_FILE_VERSION,
            name: material.name().as_str().to_string(),
            address: material.address(),
            public_key: hex::encode(crypto::encode_public_key(material.public_key())),
            created_at: chrono::Utc::now().to_rfc3339(),
            crypto: CryptoParams {
                cipher: CIPHER.to_string(),
                kdf: KDF.to_string(),
                iterations: self.kdf_iterations,
                salt: BASE64.encode(salt),
                nonce: BASE64.encode(nonce_bytes),
                ciphertext: BASE64.encode(ciphertext),
            },
        })
    }

    fn decrypt(name: KeyName, file: &EncryptedKeyFile, password: &str) -> Result<KeyMaterial> {
        if file.version != KEY_FILE_VERSION {
            return Err(KeyStoreError::Crypto(format!(
                "{} key: unsupported key file version {}",
                name, file.version
            )));
        }
        if file.crypto.cipher != CIPHER || file.crypto.kdf != KDF {
            return Err(KeyStoreError::Crypto(format!(
                "{} key: unsupported cipher {} / kdf {}",
                name, file.crypto.cipher, file.crypto.kdf
            )));
        }

        let decode = |field: &str, value: &str| {
            BASE64
                .decode(value)
                .map_err(|_| KeyStoreError::Crypto(format!("{} key: invalid {}", name, field)))
        };
        let salt = decode("salt", &file.crypto.salt)?;
        let nonce = decode("nonce", &file.crypto.nonce)?;
        let ciphertext = decode("ciphertext", &file.crypto.ciphertext)?;
        if nonce.len() != NONCE_LENGTH {
            return Err(KeyStoreError::Crypto(format!("{} key: invalid nonce", name)));
        }

        let key = Self::derive_key(password, &salt, file.crypto.iterations);
        let cipher = Aes256Gcm::new_from_slice(&key[..])
            .map_err(|e| KeyStoreError::Crypto(format!("failed to create cipher: {}", e)))?;

        // AES-GCM authentication fails for a wrong password and for tampered data alike
        let secret = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
                .map_err(|_| KeyStoreError::InvalidPassword)?,
        );

        let signing_key = SigningKey::from_slice(&secret)
            .map_err(|e| KeyStoreError::Crypto(format!("{} key: invalid secret: {}", name, e)))?;
        let material = KeyMaterial::new(name, signing_key);

        if material.address() != file.address {
            return Err(KeyStoreError::Crypto(format!(
                "{} key: address mismatch, file records {} but key derives {}",
                name,
                file.address,
                material.address()
            )));
        }

        Ok(material)
    }

    fn load(&self, name: KeyName, path: &Path, password: &str) -> Result<KeyMaterial> {
        let json = fs::read_to_string(path)?;
        let file: EncryptedKeyFile = serde_json::from_str(&json).map_err(|e| {
            KeyStoreError::Crypto(format!("{} key: malformed key file: {}", name, e))
        })?;
        Self::decrypt(name, &file, password)
    }

    fn store(&self, path: &Path, file: &EncryptedKeyFile) -> Result<()> {
        if !self.dir.exists() {
            create_private_dir(&self.dir)?;
            tracing::debug!("created key directory {}", self.dir.display());
        }

        let json = serde_json::to_string_pretty(file)
            .map_err(|e| KeyStoreError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
        let mut out = open_private_file(path)?;
        out.write_all(json.as_bytes())?;
        out.sync_all()?;
        Ok(())
    }
}

impl KeyStore for FileKeyStore {
    fn exists(&self, name: KeyName) -> Result<bool> {
        Ok(self.key_path(name).try_exists()?)
    }

    fn load_or_create(&self, name: KeyName, password: &str) -> Result<(KeyMaterial, bool)> {
        let path = self.key_path(name);
        if path.try_exists()? {
            return Ok((self.load(name, &path, password)?, false));
        }

        let material = KeyMaterial::generate(name);
        let file = self.encrypt(&material, password)?;
        self.store(&path, &file)?;
        Ok((material, true))
    }
}

// Modes are set at creation time.
#[cfg(unix)]
fn create_private_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(unix)]
fn open_private_file(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies to new files.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private_file(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)
}
