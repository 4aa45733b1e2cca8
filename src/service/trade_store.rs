//! 交易记录元数据存储
//!
//! 文档以 `{"trades":[...]}` JSON 序列化，AES-256-GCM 加密后 base64 编码，
//! 由槽位密钥签名，按槽位地址存到远端。

use std::sync::Arc;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::domain::{MasterKey, MetadataKey, MetadataNodeDeriver, Trade};
use crate::error::{Result, TradeSyncError};
use crate::infrastructure::encryption::{decrypt_data, encrypt_data};
use crate::infrastructure::metadata_client::{MetadataEnvelope, MetadataTransport};

#[derive(Serialize)]
struct TradesPayloadRef<'a> {
    trades: &'a [Trade],
}

#[derive(Deserialize)]
struct TradesPayload {
    #[serde(default)]
    trades: Vec<Trade>,
}

/// 远端加密文档在内存中的副本
#[derive(Debug, Clone)]
pub struct TradeDocument {
    key: Arc<MetadataKey>,
    trades: Vec<Trade>,
    /// 最近一次成功持久化版本的 magic hash，未持久化时为 None
    magic_hash: Option<String>,
}

impl TradeDocument {
    fn new(key: Arc<MetadataKey>) -> Self {
        Self {
            key,
            trades: Vec::new(),
            magic_hash: None,
        }
    }

    /// 文档身份：槽位地址
    pub fn address(&self) -> &str {
        self.key.address()
    }

    pub fn metadata_key(&self) -> &MetadataKey {
        &self.key
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn magic_hash(&self) -> Option<&str> {
        self.magic_hash.as_deref()
    }

    /// 追加到本地副本，需调用 [`TradeStore::save`] 才会持久化
    pub fn push_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.trades.truncate(len);
    }

    pub(crate) fn set_magic_hash(&mut self, magic_hash: Option<String>) {
        self.magic_hash = magic_hash;
    }
}

/// 交易记录存储
pub struct TradeStore<T> {
    transport: T,
}

impl<T: MetadataTransport> TradeStore<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 读取并解密远端文档，不存在时返回 `Ok(None)`
    ///
    /// 网络、解密、格式错误统一返回 `MetadataAccess`，与"不存在"区分。
    pub async fn load(&self, key: &Arc<MetadataKey>) -> Result<Option<TradeDocument>> {
        let envelope = self
            .transport
            .fetch(key.address())
            .await
            .context("Failed to fetch trade metadata")
            .map_err(TradeSyncError::metadata_access)?;

        let Some(envelope) = envelope else {
            tracing::debug!(address = %key.address(), "No trade metadata found");
            return Ok(None);
        };

        let trades = open_envelope(key, &envelope).map_err(TradeSyncError::metadata_access)?;

        tracing::info!(
            address = %key.address(),
            trades = trades.len(),
            "Loaded trade metadata"
        );

        Ok(Some(TradeDocument {
            key: Arc::clone(key),
            trades,
            magic_hash: Some(envelope.magic_hash()),
        }))
    }

    /// 为主密钥对应的槽位创建空文档并立即持久化
    pub async fn create(&self, master: &MasterKey) -> Result<TradeDocument> {
        let key = Arc::new(MetadataNodeDeriver::derive(master)?);
        self.create_for(key).await
    }

    pub(crate) async fn create_for(&self, key: Arc<MetadataKey>) -> Result<TradeDocument> {
        let mut document = TradeDocument::new(key);
        self.save(&mut document).await?;

        tracing::info!(address = %document.address(), "Created trade metadata");

        Ok(document)
    }

    /// 序列化、加密、签名并覆盖远端版本
    ///
    /// 成功后推进文档的 magic hash；失败时文档保持不变，由调用方负责回滚本地修改。
    pub async fn save(&self, document: &mut TradeDocument) -> Result<()> {
        let envelope = seal_document(document).map_err(TradeSyncError::persist)?;

        self.transport
            .store(document.address(), &envelope)
            .await
            .context("Failed to store trade metadata")
            .map_err(TradeSyncError::persist)?;

        document.magic_hash = Some(envelope.magic_hash());

        tracing::debug!(
            address = %document.address(),
            trades = document.len(),
            "Saved trade metadata"
        );

        Ok(())
    }
}

fn seal_document(document: &TradeDocument) -> anyhow::Result<MetadataEnvelope> {
    let plaintext = serde_json::to_vec(&TradesPayloadRef {
        trades: &document.trades,
    })
    .context("Failed to serialize trades")?;

    let encrypted = encrypt_data(&plaintext, document.key.encryption_key())?;
    let payload = STANDARD.encode(encrypted);

    let prev_magic_hash = document.magic_hash.clone();
    let signature = document.key.sign(&MetadataEnvelope::signing_message(
        prev_magic_hash.as_deref(),
        &payload,
    ))?;

    Ok(MetadataEnvelope {
        version: MetadataEnvelope::VERSION,
        type_id: document.key.type_id(),
        payload,
        signature,
        prev_magic_hash,
    })
}

fn open_envelope(key: &MetadataKey, envelope: &MetadataEnvelope) -> anyhow::Result<Vec<Trade>> {
    if envelope.type_id != key.type_id() {
        anyhow::bail!(
            "Unexpected metadata type {} (expected {})",
            envelope.type_id,
            key.type_id()
        );
    }
    if envelope.version > MetadataEnvelope::VERSION {
        anyhow::bail!("Unsupported metadata version {}", envelope.version);
    }

    let message =
        MetadataEnvelope::signing_message(envelope.prev_magic_hash.as_deref(), &envelope.payload);
    key.verify(&message, &envelope.signature)
        .context("Metadata signature check failed")?;

    let encrypted = STANDARD
        .decode(&envelope.payload)
        .context("Metadata payload is not valid base64")?;
    let plaintext = decrypt_data(&encrypted, key.encryption_key())?;

    let payload: TradesPayload =
        serde_json::from_slice(&plaintext).context("Failed to parse trades payload")?;

    Ok(payload.trades)
}
