/// リレーラー（署名・送信サービス）へのトランザクション送信
///
/// 鍵はリレーラー側が保持し、このアクションは送信リクエストを渡すのみ。
/// 接続（RelayConnector）と操作（RelayClient）をトレイトで抽象化し、
/// 実際のLambdaリレーラー実装とテスト用モックを差し替え可能にする。
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::RelayerParams;

/// リレー操作のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RelayError {
    /// イベントにリレーラーARNまたはクレデンシャルがない
    #[error("Missing relayer ARN or credentials in event")]
    MissingRelayerParams,

    /// クレデンシャルJSONの解析失敗
    #[error("Invalid relayer credentials: {0}")]
    InvalidCredentials(String),

    /// リレーラーARNからリージョンを取得できない
    #[error("Invalid relayer ARN: {0}")]
    InvalidRelayerArn(String),

    /// Lambda Invoke API呼び出しの失敗
    #[error("Relayer invoke error: {0}")]
    Invoke(String),

    /// リレーラー関数内で発生したエラー
    #[error("Relayer function error ({kind}): {message}")]
    FunctionError { kind: String, message: String },

    /// リレーラーがエラーメッセージを返した
    #[error("Relayer error: {0}")]
    Relayer(String),

    /// JSON-RPCエラーレスポンス
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc { code: i64, message: String },

    /// リクエストのシリアライズ失敗
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// レスポンスの形式が不正
    #[error("Invalid relayer response: {0}")]
    InvalidResponse(String),
}

/// トランザクション送信速度（ガス価格ポリシー）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxSpeed {
    SafeLow,
    Average,
    #[default]
    Fast,
    Fastest,
}

impl TxSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxSpeed::SafeLow => "safeLow",
            TxSpeed::Average => "average",
            TxSpeed::Fast => "fast",
            TxSpeed::Fastest => "fastest",
        }
    }
}

impl fmt::Display for TxSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxSpeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "safeLow" | "safelow" | "safe_low" => Ok(TxSpeed::SafeLow),
            "average" => Ok(TxSpeed::Average),
            "fast" => Ok(TxSpeed::Fast),
            "fastest" => Ok(TxSpeed::Fastest),
            other => Err(format!("unknown speed: {}", other)),
        }
    }
}

/// リレーラーへの送信リクエスト
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerTransactionRequest {
    /// 送信先コントラクトアドレス
    pub to: String,
    /// 0x付き16進のcalldata
    pub data: String,
    pub speed: TxSpeed,
    pub gas_limit: u64,
}

/// リレーラーが受け付けたトランザクション
///
/// 既知のフィールド以外も`extra`に保持し、ハンドラーの戻り値としてそのまま返す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerTransaction {
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// リレーラー操作用トレイト
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// リレーラー自身の送信元アドレスを取得
    async fn relayer_address(&self) -> Result<String, RelayError>;

    /// リレーラーのJSON-RPC経由でガス量を見積もる
    ///
    /// # 引数
    /// * `from` - 送信元（リレーラー）アドレス
    /// * `to` - 送信先アドレス
    /// * `data` - 0x付き16進のcalldata
    async fn estimate_gas(&self, from: &str, to: &str, data: &str) -> Result<u64, RelayError>;

    /// トランザクションを署名・送信する
    ///
    /// # 戻り値
    /// * 成功時はリレーラーが受け付けたトランザクション
    /// * 失敗時は`Err(RelayError)`（再試行はしない）
    async fn send_transaction(
        &self,
        request: &RelayerTransactionRequest,
    ) -> Result<RelayerTransaction, RelayError>;
}

/// リレーラー接続用トレイト
///
/// イベントに含まれるリレーラーパラメータからクライアントを構築する。
#[async_trait]
pub trait RelayConnector: Send + Sync {
    type Client: RelayClient;

    async fn connect(&self, params: &RelayerParams) -> Result<Self::Client, RelayError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// モックリレーラーの送信元アドレス
    pub const MOCK_RELAYER_ADDRESS: &str = "0x0000000000000000000000000000000000000abc";

    // ユニットテスト用のモックリレー（接続とクライアントで状態を共有）
    #[derive(Debug, Clone)]
    pub struct MockRelay {
        /// connect呼び出し時に渡されたパラメータ
        connections: Arc<Mutex<Vec<RelayerParams>>>,
        /// relayer_address呼び出し回数
        address_lookups: Arc<Mutex<usize>>,
        /// estimate_gas呼び出し時の(from, to, data)
        estimates: Arc<Mutex<Vec<(String, String, String)>>>,
        /// send_transaction呼び出し時のリクエスト
        sent: Arc<Mutex<Vec<RelayerTransactionRequest>>>,
        /// 見積もりで返すガス量
        gas_estimate: u64,
        /// 次の送信で返すエラー
        next_send_error: Arc<Mutex<Option<RelayError>>>,
        /// 次の接続で返すエラー
        next_connect_error: Arc<Mutex<Option<RelayError>>>,
    }

    impl MockRelay {
        pub fn new() -> Self {
            Self {
                connections: Arc::new(Mutex::new(Vec::new())),
                address_lookups: Arc::new(Mutex::new(0)),
                estimates: Arc::new(Mutex::new(Vec::new())),
                sent: Arc::new(Mutex::new(Vec::new())),
                gas_estimate: 120_000,
                next_send_error: Arc::new(Mutex::new(None)),
                next_connect_error: Arc::new(Mutex::new(None)),
            }
        }

        pub fn set_next_send_error(&self, error: RelayError) {
            *self.next_send_error.lock().unwrap() = Some(error);
        }

        pub fn set_next_connect_error(&self, error: RelayError) {
            *self.next_connect_error.lock().unwrap() = Some(error);
        }

        pub fn connect_count(&self) -> usize {
            self.connections.lock().unwrap().len()
        }

        pub fn address_lookup_count(&self) -> usize {
            *self.address_lookups.lock().unwrap()
        }

        pub fn estimate_count(&self) -> usize {
            self.estimates.lock().unwrap().len()
        }

        pub fn estimates(&self) -> Vec<(String, String, String)> {
            self.estimates.lock().unwrap().clone()
        }

        pub fn sent_requests(&self) -> Vec<RelayerTransactionRequest> {
            self.sent.lock().unwrap().clone()
        }

        pub fn gas_estimate(&self) -> u64 {
            self.gas_estimate
        }
    }

    #[async_trait]
    impl RelayClient for MockRelay {
        async fn relayer_address(&self) -> Result<String, RelayError> {
            *self.address_lookups.lock().unwrap() += 1;
            Ok(MOCK_RELAYER_ADDRESS.to_string())
        }

        async fn estimate_gas(&self, from: &str, to: &str, data: &str) -> Result<u64, RelayError> {
            self.estimates
                .lock()
                .unwrap()
                .push((from.to_string(), to.to_string(), data.to_string()));
            Ok(self.gas_estimate)
        }

        async fn send_transaction(
            &self,
            request: &RelayerTransactionRequest,
        ) -> Result<RelayerTransaction, RelayError> {
            if let Some(error) = self.next_send_error.lock().unwrap().take() {
                return Err(error);
            }

            let mut sent = self.sent.lock().unwrap();
            sent.push(request.clone());

            Ok(RelayerTransaction {
                transaction_id: format!("tx-{}", sent.len()),
                hash: Some(format!("0x{:064x}", sent.len())),
                to: Some(request.to.clone()),
                data: Some(request.data.clone()),
                speed: Some(request.speed.to_string()),
                nonce: Some(sent.len() as u64 - 1),
                status: Some("pending".to_string()),
                chain_id: Some(1),
                extra: Map::new(),
            })
        }
    }

    #[async_trait]
    impl RelayConnector for MockRelay {
        type Client = MockRelay;

        async fn connect(&self, params: &RelayerParams) -> Result<Self::Client, RelayError> {
            if let Some(error) = self.next_connect_error.lock().unwrap().take() {
                return Err(error);
            }

            self.connections.lock().unwrap().push(params.clone());
            Ok(self.clone())
        }
    }

    // ==================== TxSpeed テスト ====================

    #[test]
    fn test_speed_from_str() {
        assert_eq!("safeLow".parse::<TxSpeed>(), Ok(TxSpeed::SafeLow));
        assert_eq!("average".parse::<TxSpeed>(), Ok(TxSpeed::Average));
        assert_eq!("fast".parse::<TxSpeed>(), Ok(TxSpeed::Fast));
        assert_eq!(" fastest ".parse::<TxSpeed>(), Ok(TxSpeed::Fastest));
        assert!("instant".parse::<TxSpeed>().is_err());
    }

    #[test]
    fn test_speed_default_is_fast() {
        assert_eq!(TxSpeed::default(), TxSpeed::Fast);
    }

    #[test]
    fn test_speed_serializes_camel_case() {
        assert_eq!(serde_json::to_value(TxSpeed::SafeLow).unwrap(), json!("safeLow"));
        assert_eq!(TxSpeed::SafeLow.to_string(), "safeLow");
    }

    // ==================== シリアライズ テスト ====================

    #[test]
    fn test_request_serialization() {
        let request = RelayerTransactionRequest {
            to: "0x1111111111111111111111111111111111111111".to_string(),
            data: "0xabcdef".to_string(),
            speed: TxSpeed::Fast,
            gas_limit: 100_000,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "to": "0x1111111111111111111111111111111111111111",
                "data": "0xabcdef",
                "speed": "fast",
                "gasLimit": 100000
            })
        );
    }

    #[test]
    fn test_transaction_deserialization_keeps_unknown_fields() {
        let tx: RelayerTransaction = serde_json::from_value(json!({
            "transactionId": "5fcb8a6d-8d3e-403a-b33d-ade27ce0f85a",
            "hash": "0xabc",
            "to": "0x1111111111111111111111111111111111111111",
            "speed": "fast",
            "nonce": 12,
            "status": "pending",
            "chainId": 1,
            "validUntil": "2026-10-17T10:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(tx.transaction_id, "5fcb8a6d-8d3e-403a-b33d-ade27ce0f85a");
        assert_eq!(tx.nonce, Some(12));
        assert_eq!(tx.chain_id, Some(1));
        assert_eq!(
            tx.extra.get("validUntil"),
            Some(&json!("2026-10-17T10:00:00.000Z"))
        );

        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["validUntil"], json!("2026-10-17T10:00:00.000Z"));
        assert_eq!(value["transactionId"], json!("5fcb8a6d-8d3e-403a-b33d-ade27ce0f85a"));
    }

    #[test]
    fn test_transaction_requires_transaction_id() {
        let result: Result<RelayerTransaction, _> =
            serde_json::from_value(json!({ "hash": "0xabc" }));

        assert!(result.is_err());
    }

    // ==================== MockRelay テスト ====================

    #[tokio::test]
    async fn test_mock_records_sent_requests() {
        let relay = MockRelay::new();
        let request = RelayerTransactionRequest {
            to: "0x1".to_string(),
            data: "0x".to_string(),
            speed: TxSpeed::Average,
            gas_limit: 21_000,
        };

        let tx = relay.send_transaction(&request).await.unwrap();

        assert_eq!(tx.transaction_id, "tx-1");
        assert_eq!(relay.sent_requests(), vec![request]);
    }

    #[tokio::test]
    async fn test_mock_records_estimate_sender() {
        let relay = MockRelay::new();

        let from = relay.relayer_address().await.unwrap();
        let gas = relay.estimate_gas(&from, "0x1", "0xabcdef").await.unwrap();

        assert_eq!(gas, relay.gas_estimate());
        assert_eq!(relay.address_lookup_count(), 1);
        assert_eq!(
            relay.estimates(),
            vec![(
                MOCK_RELAYER_ADDRESS.to_string(),
                "0x1".to_string(),
                "0xabcdef".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_mock_returns_next_error_once() {
        let relay = MockRelay::new();
        relay.set_next_send_error(RelayError::Relayer("nonce too low".to_string()));
        let request = RelayerTransactionRequest {
            to: "0x1".to_string(),
            data: "0x".to_string(),
            speed: TxSpeed::Fast,
            gas_limit: 21_000,
        };

        assert!(relay.send_transaction(&request).await.is_err());
        assert!(relay.send_transaction(&request).await.is_ok());
    }
}
