//! 钱包主密钥
//!
//! 只做解析与持有，不生成新密钥。核心层仅以 `&MasterKey` 借用，不存储、不记录日志。

use std::fmt;

use bip39::{Language, Mnemonic};
use coins_bip32::xkeys::XPriv;
use zeroize::Zeroize;

use crate::error::{Result, TradeSyncError};

/// BIP32 种子最小长度（128 bit）
pub const MIN_SEED_LEN: usize = 16;
/// BIP32 种子最大长度（512 bit）
pub const MAX_SEED_LEN: usize = 64;

/// HD 钱包根私钥
#[derive(Clone)]
pub struct MasterKey {
    root: XPriv,
}

impl MasterKey {
    /// 从种子字节构建根密钥
    ///
    /// 种子长度必须在 16..=64 字节之间，否则返回 `KeyDerivation` 错误。
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        if seed.len() < MIN_SEED_LEN || seed.len() > MAX_SEED_LEN {
            return Err(TradeSyncError::KeyDerivation(format!(
                "Seed must be between {} and {} bytes, got {}",
                MIN_SEED_LEN,
                MAX_SEED_LEN,
                seed.len()
            )));
        }

        let root = XPriv::root_from_seed(seed, None).map_err(TradeSyncError::key_derivation)?;

        Ok(Self { root })
    }

    /// 从 BIP39 英文助记词构建根密钥
    ///
    /// # Arguments
    /// * `phrase` - 助记词
    /// * `passphrase` - BIP39 扩展密码，没有则传空串
    pub fn from_mnemonic(phrase: &str, passphrase: &str) -> Result<Self> {
        let mnemonic = Mnemonic::parse_in(Language::English, phrase)
            .map_err(|e| TradeSyncError::KeyDerivation(format!("Invalid mnemonic: {}", e)))?;

        let mut seed = mnemonic.to_seed(passphrase);
        let key = Self::from_seed(&seed);
        seed.zeroize();

        key
    }

    pub(crate) fn root(&self) -> &XPriv {
        &self.root
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}
