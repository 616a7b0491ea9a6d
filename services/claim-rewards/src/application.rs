// アプリケーション層モジュール
pub mod claim_rewards_handler;

// 再エクスポート
pub use claim_rewards_handler::{ClaimRewardsHandler, HandlerError};
