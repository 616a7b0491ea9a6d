// アクション設定
//
// 環境変数からシークレット名、送信速度、ガス上限を読み込む

use thiserror::Error;

use super::relay_client::TxSpeed;

/// コントラクトアドレスを保持するシークレット名（デフォルト）
pub const DEFAULT_CONTRACT_ADDRESS_SECRET: &str = "FORTA_VAULT_ADDRESS";

const ENV_CONTRACT_ADDRESS_SECRET: &str = "CONTRACT_ADDRESS_SECRET";
const ENV_RELAY_TX_SPEED: &str = "RELAY_TX_SPEED";
const ENV_CLAIM_GAS_LIMIT: &str = "CLAIM_GAS_LIMIT";

/// アクション設定エラー
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// 環境変数の値が不正
    #[error("環境変数の値が不正です: {name}={value}")]
    InvalidEnvVar { name: String, value: String },
}

/// アクション設定
///
/// # フィールド
/// - `contract_address_secret`: vaultアドレスを保持するシークレット名
/// - `speed`: リレーラーの送信速度
/// - `gas_limit`: 固定ガス上限（未設定時はリレーラー経由で見積もる）
#[derive(Debug, Clone, PartialEq)]
pub struct ActionConfig {
    contract_address_secret: String,
    speed: TxSpeed,
    gas_limit: Option<u64>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            contract_address_secret: DEFAULT_CONTRACT_ADDRESS_SECRET.to_string(),
            speed: TxSpeed::Fast,
            gas_limit: None,
        }
    }
}

impl ActionConfig {
    pub fn new(
        contract_address_secret: impl Into<String>,
        speed: TxSpeed,
        gas_limit: Option<u64>,
    ) -> Self {
        Self {
            contract_address_secret: contract_address_secret.into(),
            speed,
            gas_limit,
        }
    }

    /// 環境変数から設定を読み込み
    ///
    /// # 環境変数
    /// - `CONTRACT_ADDRESS_SECRET`: シークレット名（デフォルト: FORTA_VAULT_ADDRESS）
    /// - `RELAY_TX_SPEED`: safeLow | average | fast | fastest（デフォルト: fast）
    /// - `CLAIM_GAS_LIMIT`: 固定ガス上限（任意）
    ///
    /// 空文字列は未設定として扱う。
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(secret) = non_empty_env(ENV_CONTRACT_ADDRESS_SECRET) {
            config.contract_address_secret = secret;
        }

        if let Some(speed) = non_empty_env(ENV_RELAY_TX_SPEED) {
            config.speed = speed.parse().map_err(|_| ConfigError::InvalidEnvVar {
                name: ENV_RELAY_TX_SPEED.to_string(),
                value: speed.clone(),
            })?;
        }

        if let Some(gas_limit) = non_empty_env(ENV_CLAIM_GAS_LIMIT) {
            let parsed = gas_limit
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or_else(|| ConfigError::InvalidEnvVar {
                    name: ENV_CLAIM_GAS_LIMIT.to_string(),
                    value: gas_limit.clone(),
                })?;
            config.gas_limit = Some(parsed);
        }

        Ok(config)
    }

    pub fn contract_address_secret(&self) -> &str {
        &self.contract_address_secret
    }

    pub fn speed(&self) -> TxSpeed {
        self.speed
    }

    pub fn gas_limit(&self) -> Option<u64> {
        self.gas_limit
    }

    /// 送信速度を上書き
    pub fn with_speed(mut self, speed: TxSpeed) -> Self {
        self.speed = speed;
        self
    }

    /// ガス上限を上書き
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
