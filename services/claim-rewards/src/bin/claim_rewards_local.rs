/// 報酬請求アクションのローカル実行
///
/// 保存したトリガーイベントJSONを読み込み、Lambdaと同じハンドラーで処理する。
/// `--dry-run`ではリレーラーに接続せず、送信予定のcalldataのみを表示する。
///
/// # ローカル実行
/// ```bash
/// # 判定とcalldataの確認のみ
/// cargo run --bin claim_rewards_local -- --event event.json --dry-run
///
/// # 実際に送信（イベントにrelayerARNとcredentialsが必要）
/// cargo run --bin claim_rewards_local -- --event event.json --speed fastest
/// ```
use std::path::PathBuf;

use clap::Parser;
use claim_rewards::application::ClaimRewardsHandler;
use claim_rewards::domain::{ActionEvent, ClaimRewardsCall};
use claim_rewards::infrastructure::{
    init_cli_logging, ActionConfig, LambdaRelayConnector, TxSpeed,
};
use serde_json::{json, Value};
use tracing::{error, info};

/// コマンドライン引数
#[derive(Parser, Debug)]
#[command(name = "claim_rewards_local")]
#[command(about = "トリガーイベントJSONから報酬請求アクションを実行")]
struct CliArgs {
    /// トリガーイベントJSONファイル
    #[arg(long, short = 'e')]
    event: PathBuf,

    /// リレーラーに接続せず判定結果のみ表示
    #[arg(long)]
    dry_run: bool,

    /// 送信速度（環境変数RELAY_TX_SPEEDより優先）
    #[arg(long, short = 's')]
    speed: Option<TxSpeed>,

    /// 固定ガス上限（環境変数CLAIM_GAS_LIMITより優先）
    #[arg(long, short = 'g')]
    gas_limit: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_cli_logging();

    let args = CliArgs::parse();

    let mut config = ActionConfig::from_env()?;
    if let Some(speed) = args.speed {
        config = config.with_speed(speed);
    }
    if let Some(gas_limit) = args.gas_limit {
        config = config.with_gas_limit(gas_limit);
    }

    let raw = std::fs::read_to_string(&args.event)?;
    let event: ActionEvent = serde_json::from_str(&raw)?;

    info!(event = %args.event.display(), dry_run = args.dry_run, "イベント読み込み完了");

    let handler = ClaimRewardsHandler::new(LambdaRelayConnector::new(), config);

    let output = if args.dry_run {
        let call = handler.plan(&event).inspect_err(|err| {
            error!(error = %err, "報酬請求判定失敗");
        })?;
        dry_run_output(call.as_ref())
    } else {
        let tx = handler.handle(&event).await.inspect_err(|err| {
            error!(error = %err, "報酬請求処理失敗");
        })?;
        serde_json::to_value(tx)?
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// dry-run結果のJSON
fn dry_run_output(call: Option<&ClaimRewardsCall>) -> Value {
    match call {
        Some(call) => json!({
            "claim": true,
            "to": call.to_hex(),
            "function": ClaimRewardsCall::signature(),
            "subjectId": call.subject_id.to_string(),
            "epochNumber": call.epoch_number.to_string(),
            "data": call.calldata_hex(),
        }),
        None => json!({ "claim": false }),
    }
}
