pub mod exchange_gateway;
pub mod trade_manager;
pub mod trade_store;

pub use exchange_gateway::ExchangeGateway;
pub use trade_manager::{ManagerStatus, TradeManager};
pub use trade_store::{TradeDocument, TradeStore};
