//! 交易记录管理器
//!
//! 持有当前钱包的交易文档，提供 fetch-or-create 初始化与乐观追加：
//! 追加先写内存，读者立即可见；保存失败时按追加前长度回滚。
//!
//! 写操作（initialize / append_trade）经同一把异步锁串行执行，
//! 保存在后台任务中完成，调用方取消等待不会留下半截状态。

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Mutex;

use crate::domain::{MasterKey, MetadataKey, MetadataNodeDeriver, Trade};
use crate::error::{Result, TradeSyncError};
use crate::infrastructure::metadata_client::MetadataTransport;
use crate::service::trade_store::{TradeDocument, TradeStore};

/// 管理器内部状态
#[derive(Debug)]
enum ManagerState {
    Uninitialized,
    Initializing,
    Ready(TradeDocument),
}

/// 对外可见的状态标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerStatus {
    Uninitialized,
    Initializing,
    Ready,
}

impl ManagerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
        }
    }
}

struct Shared<T> {
    store: TradeStore<T>,
    /// 同步锁只在内存操作期间持有，绝不跨 await
    state: RwLock<ManagerState>,
    /// 串行化所有写操作
    write_gate: Mutex<()>,
}

impl<T: MetadataTransport> Shared<T> {
    fn read_state(&self) -> RwLockReadGuard<'_, ManagerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ManagerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ManagerState) {
        *self.write_state() = next;
    }

    async fn fetch_or_create(&self, key: Arc<MetadataKey>) -> Result<TradeDocument> {
        let _gate = self.write_gate.lock().await;
        let previous = {
            let mut state = self.write_state();
            std::mem::replace(&mut *state, ManagerState::Initializing)
        };

        // 读取失败直接返回，不能当作"不存在"去覆盖远端数据
        let result = match self.store.load(&key).await {
            Ok(Some(document)) => Ok(document),
            Ok(None) => self.store.create_for(Arc::clone(&key)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(document) => {
                tracing::info!(
                    address = %document.address(),
                    trades = document.len(),
                    "Trade metadata ready"
                );
                self.set_state(ManagerState::Ready(document.clone()));
                Ok(document)
            }
            Err(e) => {
                // 同一钱包刷新失败时保留已加载的文档；切换钱包失败则回到未初始化
                let restored = match previous {
                    ManagerState::Ready(document) if document.address() == key.address() => {
                        ManagerState::Ready(document)
                    }
                    _ => ManagerState::Uninitialized,
                };
                tracing::warn!(
                    address = %key.address(),
                    kept_previous = matches!(restored, ManagerState::Ready(_)),
                    error = %e,
                    "Trade metadata initialization failed"
                );
                self.set_state(restored);
                Err(e)
            }
        }
    }

    async fn append(&self, trade: Trade) -> Result<()> {
        let _gate = self.write_gate.lock().await;

        let (mut snapshot, previous_len) = {
            let mut state = self.write_state();
            let ManagerState::Ready(document) = &mut *state else {
                return Err(TradeSyncError::Uninitialized);
            };
            let previous_len = document.len();
            document.push_trade(trade);
            (document.clone(), previous_len)
        };

        let saved = self.store.save(&mut snapshot).await;

        let mut state = self.write_state();
        let ManagerState::Ready(document) = &mut *state else {
            // 写锁保证保存期间没有其他写操作替换文档
            return saved;
        };

        match saved {
            Ok(()) => {
                document.set_magic_hash(snapshot.magic_hash().map(str::to_string));
                tracing::debug!(
                    address = %document.address(),
                    trades = document.len(),
                    "Trade appended"
                );
                Ok(())
            }
            Err(e) => {
                document.truncate(previous_len);
                tracing::warn!(
                    address = %document.address(),
                    trades = document.len(),
                    error = %e,
                    "Trade save failed, rolled back"
                );
                Err(e)
            }
        }
    }
}

/// 交易记录管理器
///
/// 克隆开销很小，所有克隆共享同一份状态。
pub struct TradeManager<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for TradeManager<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: MetadataTransport + 'static> TradeManager<T> {
    pub fn new(transport: T) -> Self {
        Self::with_store(TradeStore::new(transport))
    }

    pub fn with_store(store: TradeStore<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                state: RwLock::new(ManagerState::Uninitialized),
                write_gate: Mutex::new(()),
            }),
        }
    }

    pub fn store(&self) -> &TradeStore<T> {
        &self.shared.store
    }

    /// 加载交易文档，不存在时创建并持久化一个空文档
    ///
    /// 可重复调用，每次都会重新读取远端并替换内存中的文档。
    /// 失败时：同一钱包保留之前的文档，否则回到未初始化状态。
    pub async fn initialize(&self, master: &MasterKey) -> Result<TradeDocument> {
        // 主密钥只在这里借用，后台任务只拿到派生出的槽位密钥
        let key = Arc::new(MetadataNodeDeriver::derive(master)?);

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.fetch_or_create(key).await })
            .await
            .map_err(|e| TradeSyncError::Internal(format!("Initialization task failed: {}", e)))?
    }

    /// 当前内存中的交易列表（按追加顺序），包含尚在保存中的交易
    pub fn list_trades(&self) -> Result<Vec<Trade>> {
        match &*self.shared.read_state() {
            ManagerState::Ready(document) => Ok(document.trades().to_vec()),
            _ => Err(TradeSyncError::Uninitialized),
        }
    }

    /// 追加交易并持久化
    ///
    /// 交易立即对 [`list_trades`](Self::list_trades) 可见；保存失败时移除并返回 `Persist`。
    pub async fn append_trade(&self, trade: Trade) -> Result<()> {
        if !self.is_ready() {
            return Err(TradeSyncError::Uninitialized);
        }

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.append(trade).await })
            .await
            .map_err(|e| TradeSyncError::Internal(format!("Append task failed: {}", e)))?
    }

    pub fn status(&self) -> ManagerStatus {
        match &*self.shared.read_state() {
            ManagerState::Uninitialized => ManagerStatus::Uninitialized,
            ManagerState::Initializing => ManagerStatus::Initializing,
            ManagerState::Ready(_) => ManagerStatus::Ready,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == ManagerStatus::Ready
    }

    /// 当前文档所在的元数据地址
    pub fn metadata_address(&self) -> Option<String> {
        match &*self.shared.read_state() {
            ManagerState::Ready(document) => Some(document.address().to_string()),
            _ => None,
        }
    }

    /// 当前文档快照
    pub fn document(&self) -> Result<TradeDocument> {
        match &*self.shared.read_state() {
            ManagerState::Ready(document) => Ok(document.clone()),
            _ => Err(TradeSyncError::Uninitialized),
        }
    }
}
