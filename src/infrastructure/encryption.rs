//! AES-256-GCM 加密/解密模块
//! 用于元数据文档的端到端加密，密钥由元数据槽位派生

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// nonce 长度（字节）
pub const NONCE_LEN: usize = 12;

/// 加密数据
///
/// # Arguments
/// * `data` - 要加密的原始数据
/// * `key` - 32字节加密密钥
///
/// # Returns
/// 返回加密后的数据（nonce + ciphertext），每次调用使用新的随机 nonce
pub fn encrypt_data(data: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    let cipher =
        Aes256Gcm::new_from_slice(key.as_slice()).map_err(|e| anyhow!("Invalid key: {}", e))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, data)
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut result = nonce.to_vec();
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// 解密数据
///
/// # Arguments
/// * `encrypted` - 加密的数据（nonce + ciphertext）
/// * `key` - 32字节加密密钥
pub fn decrypt_data(encrypted: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    if encrypted.len() < NONCE_LEN {
        return Err(anyhow!("Encrypted data too short"));
    }

    let cipher =
        Aes256Gcm::new_from_slice(key.as_slice()).map_err(|e| anyhow!("Invalid key: {}", e))?;

    let (nonce, ciphertext) = encrypted.split_at(NONCE_LEN);

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| anyhow!("Decryption failed: {}", e))
}

/// 加密密钥（使用Zeroize保护）
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    key: [u8; 32],
}

impl EncryptionKey {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.key
    }
}
