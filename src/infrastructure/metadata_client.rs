//! 元数据服务客户端
//!
//! 远端只认"地址 → 加密信封"的 get/put 语义。每次写入携带上一版本的 magic hash，
//! 服务端据此拒绝基于过期版本的写入。

use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::config::MetadataApiConfig;
use crate::domain::recover_signer_address;

/// 远端存储的加密信封
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEnvelope {
    pub version: u32,
    pub type_id: u32,
    /// base64(nonce + ciphertext)
    pub payload: String,
    /// 槽位密钥对 `signing_message()` 的 65 字节可恢复签名（hex），
    /// 恢复出的 P2PKH 地址必须等于存储地址
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_magic_hash: Option<String>,
}

impl MetadataEnvelope {
    pub const VERSION: u32 = 1;

    /// 被签名的消息：prev_magic_hash || payload
    pub fn signing_message(prev_magic_hash: Option<&str>, payload: &str) -> Vec<u8> {
        let prev = prev_magic_hash.unwrap_or_default();
        let mut message = Vec::with_capacity(prev.len() + payload.len());
        message.extend_from_slice(prev.as_bytes());
        message.extend_from_slice(payload.as_bytes());
        message
    }

    /// 本版本的 magic hash，下一次写入的 prev_magic_hash
    pub fn magic_hash(&self) -> String {
        let message = Self::signing_message(self.prev_magic_hash.as_deref(), &self.payload);
        hex::encode(Sha256::digest(&message))
    }
}

/// 元数据传输层
#[async_trait]
pub trait MetadataTransport: Send + Sync {
    /// 读取地址上的信封，不存在时返回 `None`
    async fn fetch(&self, address: &str) -> Result<Option<MetadataEnvelope>>;

    /// 覆盖写入地址上的信封
    async fn store(&self, address: &str, envelope: &MetadataEnvelope) -> Result<()>;
}

#[async_trait]
impl<T: MetadataTransport + ?Sized> MetadataTransport for Arc<T> {
    async fn fetch(&self, address: &str) -> Result<Option<MetadataEnvelope>> {
        (**self).fetch(address).await
    }

    async fn store(&self, address: &str, envelope: &MetadataEnvelope) -> Result<()> {
        (**self).store(address, envelope).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HTTP 实现
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 元数据服务 HTTP 客户端
pub struct HttpMetadataTransport {
    client: Client,
    base_url: String,
}

impl HttpMetadataTransport {
    pub fn new(config: &MetadataApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, address: &str) -> String {
        format!("{}/metadata/{}", self.base_url, address)
    }
}

#[async_trait]
impl MetadataTransport for HttpMetadataTransport {
    async fn fetch(&self, address: &str) -> Result<Option<MetadataEnvelope>> {
        let response = self
            .client
            .get(self.url(address))
            .send()
            .await
            .context("Metadata API request failed")?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("无法读取错误响应: {}", e));
            anyhow::bail!("Metadata API returned {}: {}", status, body);
        }

        let envelope = response
            .json::<MetadataEnvelope>()
            .await
            .context("Failed to parse metadata envelope")?;

        Ok(Some(envelope))
    }

    async fn store(&self, address: &str, envelope: &MetadataEnvelope) -> Result<()> {
        let response = self
            .client
            .put(self.url(address))
            .json(envelope)
            .send()
            .await
            .context("Metadata API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("无法读取错误响应: {}", e));
            anyhow::bail!("Metadata API returned {}: {}", status, body);
        }

        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 内存实现（离线模式 / 测试）
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
struct InMemoryState {
    documents: HashMap<String, MetadataEnvelope>,
    failing_fetches: usize,
    failing_stores: usize,
    store_count: usize,
    store_delay: Option<Duration>,
}

/// 进程内元数据存储
///
/// 与服务端一样校验签名与版本链：签名者地址必须等于存储地址，
/// prev_magic_hash 必须等于当前版本的 magic hash。
#[derive(Default)]
pub struct InMemoryMetadataTransport {
    state: Mutex<InMemoryState>,
}

impl InMemoryMetadataTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接下来 `count` 次 fetch 返回传输错误
    pub async fn fail_next_fetches(&self, count: usize) {
        self.state.lock().await.failing_fetches = count;
    }

    /// 接下来 `count` 次 store 返回传输错误
    pub async fn fail_next_stores(&self, count: usize) {
        self.state.lock().await.failing_stores = count;
    }

    /// 每次 store 前的模拟网络延迟
    pub async fn set_store_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.store_delay = delay;
    }

    /// 成功写入的次数
    pub async fn store_count(&self) -> usize {
        self.state.lock().await.store_count
    }

    pub async fn envelope(&self, address: &str) -> Option<MetadataEnvelope> {
        self.state.lock().await.documents.get(address).cloned()
    }

    /// 直接写入信封，绕过版本校验（模拟其他客户端或损坏数据）
    pub async fn insert_raw(&self, address: &str, envelope: MetadataEnvelope) {
        self.state
            .lock()
            .await
            .documents
            .insert(address.to_string(), envelope);
    }
}

#[async_trait]
impl MetadataTransport for InMemoryMetadataTransport {
    async fn fetch(&self, address: &str) -> Result<Option<MetadataEnvelope>> {
        let mut state = self.state.lock().await;
        if state.failing_fetches > 0 {
            state.failing_fetches -= 1;
            anyhow::bail!("simulated metadata fetch failure");
        }

        Ok(state.documents.get(address).cloned())
    }

    async fn store(&self, address: &str, envelope: &MetadataEnvelope) -> Result<()> {
        let delay = self.state.lock().await.store_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if state.failing_stores > 0 {
            state.failing_stores -= 1;
            anyhow::bail!("simulated metadata store failure");
        }

        let message =
            MetadataEnvelope::signing_message(envelope.prev_magic_hash.as_deref(), &envelope.payload);
        let signer = recover_signer_address(&message, &envelope.signature)
            .context("Rejected metadata signature")?;
        if signer != address {
            anyhow::bail!("Signer {} is not allowed to write {}", signer, address);
        }

        let current = state.documents.get(address).map(MetadataEnvelope::magic_hash);
        if envelope.prev_magic_hash != current {
            anyhow::bail!(
                "Revision conflict at {}: expected prev_magic_hash {:?}, got {:?}",
                address,
                current,
                envelope.prev_magic_hash
            );
        }

        state
            .documents
            .insert(address.to_string(), envelope.clone());
        state.store_count += 1;

        Ok(())
    }
}
