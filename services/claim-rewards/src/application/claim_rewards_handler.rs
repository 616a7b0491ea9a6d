/// 報酬請求ハンドラー
///
/// 監視トリガーのイベントを受け取り、サブジェクト種別が
/// delegator scanner poolの場合のみvaultのclaimRewardsをリレーラー経由で送信する。
use alloy::primitives::Address;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{ActionEvent, ClaimParams, ClaimRewardsCall, PayloadError};
use crate::infrastructure::{
    ActionConfig, RelayClient, RelayConnector, RelayError, RelayerTransaction,
    RelayerTransactionRequest,
};

/// 報酬請求ハンドラーのエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HandlerError {
    /// イベントペイロードの不備
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// コントラクトアドレスのシークレットが未設定
    #[error("No {0} in secrets")]
    MissingSecret(String),

    /// コントラクトアドレスの形式が不正
    #[error("Invalid contract address: {0}")]
    InvalidContractAddress(String),

    /// リレーラー操作エラー（変換せずにそのまま伝播）
    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// 報酬請求ハンドラー
pub struct ClaimRewardsHandler<RC>
where
    RC: RelayConnector,
{
    /// リレーラー接続
    connector: RC,
    config: ActionConfig,
}

impl<RC> ClaimRewardsHandler<RC>
where
    RC: RelayConnector,
{
    /// 新しいClaimRewardsHandlerを作成
    pub fn new(connector: RC, config: ActionConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// 送信すべき呼び出しを決定する（リレーラーには接続しない）
    ///
    /// # 処理フロー
    /// 1. 最初のマッチ理由からsubjectTypeを取得
    /// 2. シークレットからコントラクトアドレスを取得（未設定はエラー）
    /// 3. subjectTypeが3以外ならNone（subject, epochNumberは検証しない）
    /// 4. subject, epochNumberを解析
    ///
    /// # 戻り値
    /// * `Ok(Some(call))` - 送信対象の呼び出し
    /// * `Ok(None)` - 対象外のサブジェクト種別
    pub fn plan(&self, event: &ActionEvent) -> Result<Option<ClaimRewardsCall>, HandlerError> {
        let subject_type = event.subject_type()?;
        let vault = self.contract_address(event)?;

        if !subject_type.is_some_and(|t| t.claims_rewards()) {
            info!(
                subject_type = ?subject_type,
                "対象外のサブジェクト種別のためスキップ"
            );
            return Ok(None);
        }

        let params = ClaimParams::from_event(event)?;

        Ok(Some(ClaimRewardsCall::new(
            vault,
            params.subject,
            params.epoch_number,
        )))
    }

    /// トリガーイベントを処理
    ///
    /// # 処理フロー
    /// 1. `plan`で送信対象を決定
    /// 2. イベントのリレーラーパラメータで接続
    /// 3. ガス上限を決定（設定値、なければリレーラー経由で見積もり）
    /// 4. claimRewardsトランザクションを1件送信
    ///
    /// # 戻り値
    /// * `Ok(Some(tx))` - 送信したトランザクション
    /// * `Ok(None)` - 対象外のため何もしていない
    /// * `Err(HandlerError)` - ペイロード/設定/リレーラーのエラー（再試行しない）
    pub async fn handle(
        &self,
        event: &ActionEvent,
    ) -> Result<Option<RelayerTransaction>, HandlerError> {
        let Some(call) = self.plan(event)? else {
            return Ok(None);
        };

        let relayer_params = event
            .relayer_params()
            .ok_or(RelayError::MissingRelayerParams)?;
        let client = self.connector.connect(&relayer_params).await?;

        let request = self.build_request(&client, &call).await?;

        info!(
            to = %request.to,
            subject = %call.subject_id,
            epoch_number = %call.epoch_number,
            speed = %request.speed,
            gas_limit = request.gas_limit,
            "Attempt to Claim Rewards"
        );

        let tx = client.send_transaction(&request).await.inspect_err(|err| {
            warn!(error = %err, "claimRewards送信失敗");
        })?;

        info!(
            transaction_id = %tx.transaction_id,
            hash = ?tx.hash,
            "claimRewards送信完了"
        );

        Ok(Some(tx))
    }

    /// シークレットからコントラクトアドレスを取得
    fn contract_address(&self, event: &ActionEvent) -> Result<Address, HandlerError> {
        let key = self.config.contract_address_secret();
        let raw = event
            .secret(key)
            .ok_or_else(|| HandlerError::MissingSecret(key.to_string()))?;

        raw.trim()
            .parse::<Address>()
            .map_err(|_| HandlerError::InvalidContractAddress(raw.to_string()))
    }

    /// 送信リクエストを構築
    ///
    /// ガス見積もりはリレーラーのアドレスを送信元として行う。
    async fn build_request<C>(
        &self,
        client: &C,
        call: &ClaimRewardsCall,
    ) -> Result<RelayerTransactionRequest, RelayError>
    where
        C: RelayClient,
    {
        let to = call.to_hex();
        let data = call.calldata_hex();

        let gas_limit = match self.config.gas_limit() {
            Some(limit) => limit,
            None => {
                let from = client.relayer_address().await?;
                client.estimate_gas(&from, &to, &data).await?
            }
        };

        Ok(RelayerTransactionRequest {
            to,
            data,
            speed: self.config.speed(),
            gas_limit,
        })
    }
}
