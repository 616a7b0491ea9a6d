/// トリガーイベントのペイロード
///
/// 監視サービスから届くアクション呼び出しイベントをモデル化する。
/// ハンドラーが参照するのは最初のマッチ理由のパラメータ、シークレット、
/// リレーラー接続パラメータのみで、その他のフィールドはログ用に保持する。
use std::collections::HashMap;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::SubjectType;

/// マッチ理由パラメータ名: サブジェクト種別
pub const PARAM_SUBJECT_TYPE: &str = "subjectType";
/// マッチ理由パラメータ名: サブジェクトID
pub const PARAM_SUBJECT: &str = "subject";
/// マッチ理由パラメータ名: エポック番号
pub const PARAM_EPOCH_NUMBER: &str = "epochNumber";

/// ペイロード解析のエラー型
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PayloadError {
    /// request.body.matchReasonsが空または欠落
    #[error("Missing matchReasons in request body")]
    MissingMatchReason,

    /// 必須パラメータが欠落
    #[error("Missing match reason param: {0}")]
    MissingParam(&'static str),

    /// パラメータが符号なし整数として解釈できない
    #[error("Invalid match reason param {name}: {value}")]
    InvalidParam { name: &'static str, value: String },
}

/// アクション呼び出しイベント
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    /// トリガーリクエスト
    #[serde(default)]
    pub request: Option<ActionRequest>,

    /// アクションに登録されたシークレット
    #[serde(default)]
    pub secrets: HashMap<String, String>,

    /// 接続済みリレーラーのLambda ARN
    #[serde(default, rename = "relayerARN")]
    pub relayer_arn: Option<String>,

    /// リレーラー呼び出し用の一時クレデンシャル（JSON文字列）
    #[serde(default)]
    pub credentials: Option<String>,

    #[serde(default)]
    pub autotask_id: Option<String>,

    #[serde(default)]
    pub autotask_name: Option<String>,

    #[serde(default)]
    pub autotask_run_id: Option<String>,
}

/// トリガーリクエスト
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub body: Option<BlockTriggerEvent>,
}

/// ブロック監視トリガーのリクエストボディ
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTriggerEvent {
    /// トリガー元トランザクションハッシュ
    #[serde(default)]
    pub hash: Option<String>,

    /// ブロック番号（16進文字列または数値）
    #[serde(default)]
    pub block_number: Option<Value>,

    /// 条件にマッチした理由のリスト
    #[serde(default)]
    pub match_reasons: Vec<MatchReason>,
}

/// 条件マッチ理由
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MatchReason {
    /// マッチ種別（"event", "function"等）
    #[serde(rename = "type", default)]
    pub reason_type: String,

    /// マッチしたイベント/関数のシグネチャ
    #[serde(default)]
    pub signature: Option<String>,

    /// デコード済みパラメータ
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// リレーラー接続パラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct RelayerParams {
    pub relayer_arn: String,
    pub credentials: String,
}

/// claimRewardsの呼び出しに必要なパラメータ
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimParams {
    pub subject: U256,
    pub epoch_number: U256,
}

impl ActionEvent {
    /// 最初のマッチ理由を取得
    pub fn first_match_reason(&self) -> Option<&MatchReason> {
        self.request
            .as_ref()
            .and_then(|request| request.body.as_ref())
            .and_then(|body| body.match_reasons.first())
    }

    /// 最初のマッチ理由のサブジェクト種別を取得
    ///
    /// subjectTypeの存在は必須。数値として解釈できない値は`Ok(None)`
    /// （どの種別にも一致しない）となる。
    pub fn subject_type(&self) -> Result<Option<SubjectType>, PayloadError> {
        let reason = self
            .first_match_reason()
            .ok_or(PayloadError::MissingMatchReason)?;

        let value = reason
            .params
            .get(PARAM_SUBJECT_TYPE)
            .ok_or(PayloadError::MissingParam(PARAM_SUBJECT_TYPE))?;

        Ok(SubjectType::from_param(value))
    }

    /// シークレットを取得
    ///
    /// 空文字列は未設定として扱う。
    pub fn secret(&self, key: &str) -> Option<&str> {
        self.secrets
            .get(key)
            .map(|value| value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// リレーラー接続パラメータを取得
    ///
    /// ARNとクレデンシャルの両方が揃っている場合のみSomeを返す。
    pub fn relayer_params(&self) -> Option<RelayerParams> {
        match (&self.relayer_arn, &self.credentials) {
            (Some(arn), Some(credentials)) if !arn.is_empty() && !credentials.is_empty() => {
                Some(RelayerParams {
                    relayer_arn: arn.clone(),
                    credentials: credentials.clone(),
                })
            }
            _ => None,
        }
    }
}

impl ClaimParams {
    /// イベントの最初のマッチ理由からsubject, epochNumberを抽出
    ///
    /// 請求対象と判定された後にのみ呼び出す。対象外のイベントでは
    /// これらのパラメータは検証しない。
    pub fn from_event(event: &ActionEvent) -> Result<Self, PayloadError> {
        let reason = event
            .first_match_reason()
            .ok_or(PayloadError::MissingMatchReason)?;

        Ok(Self {
            subject: uint_param(&reason.params, PARAM_SUBJECT)?,
            epoch_number: uint_param(&reason.params, PARAM_EPOCH_NUMBER)?,
        })
    }
}

/// uint256パラメータを解析
///
/// JSONの符号なし整数、10進文字列、0x付き16進文字列を受け付ける。
/// 大きな数値は監視サービスから文字列で届く。
fn uint_param(params: &Map<String, Value>, name: &'static str) -> Result<U256, PayloadError> {
    let value = params.get(name).ok_or(PayloadError::MissingParam(name))?;

    let parsed = match value {
        Value::Number(n) => n.as_u64().map(U256::from),
        Value::String(s) => parse_uint_str(s),
        _ => None,
    };

    parsed.ok_or_else(|| PayloadError::InvalidParam {
        name,
        value: value.to_string(),
    })
}

/// 数字のみで構成された文字列をuint256として解析
///
/// 空文字列、`0x`のみ、区切り文字（`_`等）を含む文字列は拒否する。
fn parse_uint_str(raw: &str) -> Option<U256> {
    let raw = raw.trim();

    let (digits, radix) = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (raw, 10),
    };

    let valid = !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
    if !valid {
        return None;
    }

    U256::from_str_radix(digits, radix as u64).ok()
}
