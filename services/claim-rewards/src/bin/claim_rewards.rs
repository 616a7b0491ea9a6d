/// 報酬請求アクション Lambda関数
///
/// 監視トリガーのイベントを受け取り、delegator scanner poolの報酬を
/// リレーラー経由でvaultにclaimする。
///
/// # 環境変数
/// - CONTRACT_ADDRESS_SECRET: vaultアドレスを保持するシークレット名（デフォルト: FORTA_VAULT_ADDRESS）
/// - RELAY_TX_SPEED: 送信速度（デフォルト: fast）
/// - CLAIM_GAS_LIMIT: 固定ガス上限（任意）
use claim_rewards::application::ClaimRewardsHandler;
use claim_rewards::domain::ActionEvent;
use claim_rewards::infrastructure::{
    init_logging, ActionConfig, LambdaRelayConnector, RelayConnector,
};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    let config = ActionConfig::from_env().inspect_err(|err| {
        error!(error = %err, "アクション設定読み込み失敗");
    })?;

    let handler = ClaimRewardsHandler::new(LambdaRelayConnector::new(), config);
    let handler = &handler;

    // Lambda関数を初期化して実行
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        function_handler(handler, event).await
    }))
    .await
}

/// Lambda関数のメインハンドラー
///
/// # 処理フロー
/// 1. ペイロードをActionEventにデシリアライズ
/// 2. ClaimRewardsHandlerで処理
/// 3. 送信したトランザクション、または対象外の場合はnullを返却
async fn function_handler<RC>(
    handler: &ClaimRewardsHandler<RC>,
    event: LambdaEvent<Value>,
) -> Result<Value, Error>
where
    RC: RelayConnector,
{
    let request_id = event.context.request_id.clone();

    let action_event: ActionEvent = serde_json::from_value(event.payload).map_err(|err| {
        error!(request_id = %request_id, error = %err, "イベントのデシリアライズ失敗");
        err
    })?;

    info!(
        request_id = %request_id,
        autotask_id = ?action_event.autotask_id,
        autotask_run_id = ?action_event.autotask_run_id,
        "トリガーイベントを受信"
    );

    match handler.handle(&action_event).await {
        Ok(Some(tx)) => Ok(serde_json::to_value(tx)?),
        Ok(None) => Ok(Value::Null),
        Err(err) => {
            error!(request_id = %request_id, error = %err, "報酬請求処理失敗");
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use claim_rewards::domain::RelayerParams;
    use claim_rewards::infrastructure::{
        RelayClient, RelayError, RelayerTransaction, RelayerTransactionRequest,
    };
    use lambda_runtime::Context;
    use serde_json::{json, Map};

    const VAULT: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    // 送信リクエストをそのまま受け付けるスタブリレーラー
    #[derive(Debug, Clone, Default)]
    struct StubRelay;

    #[async_trait]
    impl RelayClient for StubRelay {
        async fn relayer_address(&self) -> Result<String, RelayError> {
            Ok("0x0000000000000000000000000000000000000abc".to_string())
        }

        async fn estimate_gas(&self, _from: &str, _to: &str, _data: &str) -> Result<u64, RelayError> {
            Ok(100_000)
        }

        async fn send_transaction(
            &self,
            request: &RelayerTransactionRequest,
        ) -> Result<RelayerTransaction, RelayError> {
            Ok(RelayerTransaction {
                transaction_id: "tx-stub".to_string(),
                hash: None,
                to: Some(request.to.clone()),
                data: Some(request.data.clone()),
                speed: Some(request.speed.to_string()),
                nonce: None,
                status: Some("pending".to_string()),
                chain_id: None,
                extra: Map::new(),
            })
        }
    }

    #[async_trait]
    impl RelayConnector for StubRelay {
        type Client = StubRelay;

        async fn connect(&self, _params: &RelayerParams) -> Result<Self::Client, RelayError> {
            Ok(self.clone())
        }
    }

    fn lambda_event(subject_type: Value, secrets: Value) -> LambdaEvent<Value> {
        let payload = json!({
            "request": {
                "body": {
                    "matchReasons": [
                        {
                            "type": "event",
                            "params": { "subjectType": subject_type, "subject": "42", "epochNumber": "7" }
                        }
                    ]
                }
            },
            "secrets": secrets,
            "relayerARN": "arn:aws:lambda:us-west-2:123456789012:function:relayer",
            "credentials": "{}"
        });

        LambdaEvent::new(payload, Context::default())
    }

    fn stub_handler() -> ClaimRewardsHandler<StubRelay> {
        ClaimRewardsHandler::new(StubRelay, ActionConfig::default())
    }

    #[tokio::test]
    async fn test_claim_returns_transaction_json() {
        let handler = stub_handler();

        let result = function_handler(
            &handler,
            lambda_event(json!(3), json!({ "FORTA_VAULT_ADDRESS": VAULT })),
        )
        .await
        .unwrap();

        assert_eq!(result["transactionId"], json!("tx-stub"));
        assert_eq!(result["to"], json!(VAULT));
        assert_eq!(result["speed"], json!("fast"));
    }

    #[tokio::test]
    async fn test_other_subject_type_returns_null() {
        let handler = stub_handler();

        let result = function_handler(
            &handler,
            lambda_event(json!(1), json!({ "FORTA_VAULT_ADDRESS": VAULT })),
        )
        .await
        .unwrap();

        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_missing_secret_is_error() {
        let handler = stub_handler();

        let result = function_handler(&handler, lambda_event(json!(3), json!({}))).await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "No FORTA_VAULT_ADDRESS in secrets");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_error() {
        let handler = stub_handler();
        let event = LambdaEvent::new(json!({ "secrets": "not a map" }), Context::default());

        assert!(function_handler(&handler, event).await.is_err());
    }
}
