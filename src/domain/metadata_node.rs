//! 元数据节点派生
//!
//! 交易记录存放在固定的元数据槽位 `m/510742'/3'`：
//! - 510742'：元数据用途（purpose）
//! - 3'：交易所交易记录类型
//!
//! 槽位子密钥决定三件事：远端地址（P2PKH）、AES-256 加密密钥（SHA-256(私钥)）、上传签名密钥。
//! 派生是纯函数，同一主密钥永远得到同一结果。

use std::fmt;

use anyhow::{anyhow, Context};
use bitcoin::{Address, Network, PublicKey as BitcoinPublicKey};
use coins_bip32::prelude::*;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::domain::master_key::MasterKey;
use crate::error::{Result, TradeSyncError};
use crate::infrastructure::encryption::EncryptionKey;

/// 元数据用途索引
pub const METADATA_PURPOSE: u32 = 510742;
/// 交易记录槽位类型
pub const TRADES_METADATA_TYPE: u32 = 3;

const HARDENED: u32 = 0x8000_0000;

/// 可恢复签名长度：r(32) || s(32) || recovery id(1)
pub const RECOVERABLE_SIGNATURE_LEN: usize = 65;

/// 槽位子密钥
pub struct MetadataKey {
    type_id: u32,
    path: String,
    address: String,
    signing_key: SigningKey,
    encryption_key: EncryptionKey,
}

impl MetadataKey {
    /// 远端存储地址，即文档身份
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    pub(crate) fn encryption_key(&self) -> &EncryptionKey {
        &self.encryption_key
    }

    /// 对消息做可恢复 ECDSA(secp256k1, SHA-256) 签名，返回 `r || s || v` 的 hex
    ///
    /// 信封不携带公钥，服务端从签名恢复公钥后与槽位地址比对。
    pub fn sign(&self, message: &[u8]) -> anyhow::Result<String> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_recoverable(message)
            .map_err(|e| anyhow!("Signing failed: {}", e))?;

        let mut bytes = signature.to_bytes().to_vec();
        bytes.push(recovery_id.to_byte());
        Ok(hex::encode(bytes))
    }

    /// 校验签名出自本槽位密钥
    pub fn verify(&self, message: &[u8], signature_hex: &str) -> anyhow::Result<()> {
        let signer = recover_signer_address(message, signature_hex)?;
        if signer != self.address {
            anyhow::bail!(
                "Signature signer {} does not match slot address {}",
                signer,
                self.address
            );
        }
        Ok(())
    }
}

/// 从可恢复签名还原签名者的 P2PKH 地址
pub fn recover_signer_address(message: &[u8], signature_hex: &str) -> anyhow::Result<String> {
    let bytes = hex::decode(signature_hex).context("Signature is not valid hex")?;
    if bytes.len() != RECOVERABLE_SIGNATURE_LEN {
        anyhow::bail!(
            "Signature must be {} bytes, got {}",
            RECOVERABLE_SIGNATURE_LEN,
            bytes.len()
        );
    }

    let (compact, recovery_byte) = bytes.split_at(RECOVERABLE_SIGNATURE_LEN - 1);
    let signature =
        Signature::from_slice(compact).map_err(|e| anyhow!("Invalid signature: {}", e))?;
    let recovery_id = RecoveryId::from_byte(recovery_byte[0])
        .ok_or_else(|| anyhow!("Invalid recovery id {}", recovery_byte[0]))?;

    let verifying_key = VerifyingKey::recover_from_msg(message, &signature, recovery_id)
        .map_err(|e| anyhow!("Signature recovery failed: {}", e))?;

    p2pkh_address(&verifying_key)
}

fn p2pkh_address(verifying_key: &VerifyingKey) -> anyhow::Result<String> {
    let encoded = verifying_key.to_encoded_point(true);
    let public_key =
        BitcoinPublicKey::from_slice(encoded.as_bytes()).context("Invalid public key")?;
    Ok(Address::p2pkh(&public_key, Network::Bitcoin).to_string())
}

impl fmt::Debug for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataKey")
            .field("path", &self.path)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// 元数据节点派生器
pub struct MetadataNodeDeriver;

impl MetadataNodeDeriver {
    /// 派生交易记录槽位
    pub fn derive(master: &MasterKey) -> Result<MetadataKey> {
        Self::derive_slot(master, TRADES_METADATA_TYPE)
    }

    /// 派生任意元数据槽位 `m/510742'/type_id'`
    pub fn derive_slot(master: &MasterKey, type_id: u32) -> Result<MetadataKey> {
        if type_id >= HARDENED {
            return Err(TradeSyncError::KeyDerivation(format!(
                "Metadata type {} out of hardened index range",
                type_id
            )));
        }

        let node = master
            .root()
            .derive_child(METADATA_PURPOSE | HARDENED)
            .and_then(|purpose| purpose.derive_child(type_id | HARDENED))
            .map_err(TradeSyncError::key_derivation)?;

        // XPriv 实现 AsRef<SigningKey>
        let signing_key: &SigningKey = node.as_ref();
        let signing_key = signing_key.clone();

        let private_key_bytes = signing_key.to_bytes();
        let digest: [u8; 32] = Sha256::digest(private_key_bytes.as_slice()).into();
        let encryption_key = EncryptionKey::new(digest);

        let address =
            p2pkh_address(signing_key.verifying_key()).map_err(TradeSyncError::key_derivation)?;

        Ok(MetadataKey {
            type_id,
            path: format!("m/{}'/{}'", METADATA_PURPOSE, type_id),
            address,
            signing_key,
            encryption_key,
        })
    }
}
