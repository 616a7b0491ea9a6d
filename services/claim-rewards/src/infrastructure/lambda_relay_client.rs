/// Lambdaリレーラー実装
///
/// アクション実行環境ではリレーラーはLambda関数として公開され、
/// イベントに含まれる一時クレデンシャルで同期呼び出しする。
/// リクエストは`{"action": ..., "payload": ...}`形式のJSON。
/// - `send-tx`: トランザクションの署名・送信
/// - `json-rpc-query`: リレーラー経由のJSON-RPC呼び出し（ガス見積もり用）
/// - `get-self`: リレーラー自身の情報（送信元アドレス）の取得
use async_trait::async_trait;
use aws_sdk_lambda::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use aws_sdk_lambda::Client as LambdaClient;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::relay_client::{
    RelayClient, RelayConnector, RelayError, RelayerTransaction, RelayerTransactionRequest,
};
use crate::domain::RelayerParams;

/// 送信アクション名
pub const ACTION_SEND_TX: &str = "send-tx";
/// JSON-RPCアクション名
pub const ACTION_JSON_RPC_QUERY: &str = "json-rpc-query";
/// リレーラー情報取得アクション名
pub const ACTION_GET_SELF: &str = "get-self";

/// クレデンシャルのプロバイダー名（SDKのログ識別用）
const CREDENTIALS_PROVIDER_NAME: &str = "relayer-params";

/// イベントに含まれる一時クレデンシャル
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelayerCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl RelayerCredentials {
    /// クレデンシャルJSON文字列を解析
    pub fn parse(raw: &str) -> Result<Self, RelayError> {
        serde_json::from_str(raw).map_err(|e| RelayError::InvalidCredentials(e.to_string()))
    }
}

/// リレーラーARNからリージョンを取得
///
/// 形式: `arn:aws:lambda:<region>:<account>:function:<name>`
pub fn region_from_arn(arn: &str) -> Result<String, RelayError> {
    let parts: Vec<&str> = arn.split(':').collect();

    match parts.as_slice() {
        ["arn", _, "lambda", region, ..] if !region.is_empty() => Ok(region.to_string()),
        _ => Err(RelayError::InvalidRelayerArn(arn.to_string())),
    }
}

/// Lambda呼び出しペイロードを構築
pub fn build_invoke_payload(action: &str, payload: Value) -> Result<Vec<u8>, RelayError> {
    serde_json::to_vec(&json!({
        "action": action,
        "payload": payload,
    }))
    .map_err(|e| RelayError::Serialization(e.to_string()))
}

/// Lambda呼び出し結果を解析
///
/// 関数エラーまたは`errorMessage`を含むレスポンスはエラーとして扱う。
pub fn parse_invoke_response(
    function_error: Option<&str>,
    payload: &[u8],
) -> Result<Value, RelayError> {
    let value: Value = if payload.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(payload).map_err(|e| RelayError::InvalidResponse(e.to_string()))?
    };

    let error_message = value
        .get("errorMessage")
        .and_then(|m| m.as_str())
        .map(|m| m.to_string());

    if let Some(kind) = function_error {
        return Err(RelayError::FunctionError {
            kind: kind.to_string(),
            message: error_message.unwrap_or_else(|| value.to_string()),
        });
    }

    if let Some(message) = error_message {
        return Err(RelayError::Relayer(message));
    }

    Ok(value)
}

/// リレーラー情報レスポンスから送信元アドレスを取得
pub fn parse_relayer_address(response: &Value) -> Result<String, RelayError> {
    response
        .get("address")
        .and_then(|a| a.as_str())
        .filter(|a| !a.is_empty())
        .map(|a| a.to_string())
        .ok_or_else(|| RelayError::InvalidResponse(format!("missing relayer address: {}", response)))
}

/// eth_estimateGasのJSON-RPCリクエストを構築
///
/// `from`にはリレーラーのアドレスを指定する。
pub fn build_estimate_gas_query(from: &str, to: &str, data: &str) -> Value {
    json!({
        "method": "eth_estimateGas",
        "params": [{ "from": from, "to": to, "data": data }],
    })
}

/// eth_estimateGasのJSON-RPCレスポンスからガス量を取得
pub fn parse_gas_estimate(response: &Value) -> Result<u64, RelayError> {
    if let Some(error) = response.get("error") {
        return Err(RelayError::JsonRpc {
            code: error.get("code").and_then(|c| c.as_i64()).unwrap_or(0),
            message: error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    let result = response
        .get("result")
        .and_then(|r| r.as_str())
        .ok_or_else(|| RelayError::InvalidResponse(format!("missing result: {}", response)))?;

    let digits = result.strip_prefix("0x").unwrap_or(result);
    u64::from_str_radix(digits, 16)
        .map_err(|e| RelayError::InvalidResponse(format!("invalid gas estimate {}: {}", result, e)))
}

/// Lambdaリレーラーへの接続
#[derive(Debug, Clone, Default)]
pub struct LambdaRelayConnector;

impl LambdaRelayConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RelayConnector for LambdaRelayConnector {
    type Client = LambdaRelayClient;

    async fn connect(&self, params: &RelayerParams) -> Result<Self::Client, RelayError> {
        let region = region_from_arn(&params.relayer_arn)?;
        let credentials = RelayerCredentials::parse(&params.credentials)?;

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .credentials_provider(Credentials::new(
                credentials.access_key_id,
                credentials.secret_access_key,
                Some(credentials.session_token),
                None,
                CREDENTIALS_PROVIDER_NAME,
            ))
            .load()
            .await;

        debug!(relayer_arn = %params.relayer_arn, region = %region, "リレーラークライアント作成");

        Ok(LambdaRelayClient::new(
            LambdaClient::new(&sdk_config),
            params.relayer_arn.clone(),
        ))
    }
}

/// Lambdaリレーラークライアント
#[derive(Debug, Clone)]
pub struct LambdaRelayClient {
    client: LambdaClient,
    relayer_arn: String,
}

impl LambdaRelayClient {
    pub fn new(client: LambdaClient, relayer_arn: String) -> Self {
        Self {
            client,
            relayer_arn,
        }
    }

    pub fn relayer_arn(&self) -> &str {
        &self.relayer_arn
    }

    /// リレーラー関数を同期呼び出し
    async fn invoke(&self, action: &str, payload: Value) -> Result<Value, RelayError> {
        let body = build_invoke_payload(action, payload)?;

        let output = self
            .client
            .invoke()
            .function_name(&self.relayer_arn)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(body))
            .send()
            .await
            .map_err(|err| {
                let err = err.into_service_error();
                warn!(action = action, error = %err, "リレーラー呼び出しエラー");
                RelayError::Invoke(err.to_string())
            })?;

        let payload: &[u8] = output.payload().map(|blob| blob.as_ref()).unwrap_or_default();
        parse_invoke_response(output.function_error(), payload)
    }
}

#[async_trait]
impl RelayClient for LambdaRelayClient {
    async fn relayer_address(&self) -> Result<String, RelayError> {
        let response = self.invoke(ACTION_GET_SELF, json!({})).await?;

        parse_relayer_address(&response)
    }

    async fn estimate_gas(&self, from: &str, to: &str, data: &str) -> Result<u64, RelayError> {
        let response = self
            .invoke(ACTION_JSON_RPC_QUERY, build_estimate_gas_query(from, to, data))
            .await?;

        parse_gas_estimate(&response)
    }

    async fn send_transaction(
        &self,
        request: &RelayerTransactionRequest,
    ) -> Result<RelayerTransaction, RelayError> {
        let payload =
            serde_json::to_value(request).map_err(|e| RelayError::Serialization(e.to_string()))?;

        let response = self.invoke(ACTION_SEND_TX, payload).await?;

        serde_json::from_value(response).map_err(|e| RelayError::InvalidResponse(e.to_string()))
    }
}
