use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const BLOCK_SIZE: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Ciphertext is not valid base64")]
    Encoding,

    #[error("Ciphertext too short or not block aligned")]
    Length,

    #[error("Decryption failed")]
    Decrypt,

    #[error("Plaintext is not valid UTF-8")]
    Utf8,
}

/// AES-256 key: SHA-256 of the passphrase
fn derive_key(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

/// AES-256-CBC with a random IV and PKCS7 padding.
/// Output is `base64(iv || ciphertext)`.
pub fn encrypt(key: &str, plain: &str) -> String {
    let key = derive_key(key);
    let mut iv = [0u8; BLOCK_SIZE];
    rand::rng().fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plain.as_bytes());

    let mut out = Vec::with_capacity(BLOCK_SIZE + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    STANDARD.encode(out)
}

/// Inverse of [`encrypt`]
pub fn decrypt(key: &str, enc: &str) -> Result<String, CryptoError> {
    let raw = STANDARD.decode(enc.trim()).map_err(|_| CryptoError::Encoding)?;
    if raw.len() < 2 * BLOCK_SIZE || raw.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::Length);
    }

    let (iv, ciphertext) = raw.split_at(BLOCK_SIZE);
    let key = derive_key(key);
    let plain = Aes256CbcDec::new_from_slices(&key, iv)
        .map_err(|_| CryptoError::Length)?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Decrypt)?;

    String::from_utf8(plain).map_err(|_| CryptoError::Utf8)
}
