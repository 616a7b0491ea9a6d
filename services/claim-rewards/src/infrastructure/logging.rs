/// ログ基盤モジュール
///
/// Lambda環境向けの構造化ログ設定を提供する。
/// JSON形式で出力し、ローカル実行時は人間が読みやすい形式も選べる。
use std::sync::Once;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ログサブスクライバー初期化用の同期プリミティブ
static INIT: Once = Once::new();

/// 環境変数`RUST_LOG`が未設定の場合のフィルター
const DEFAULT_FILTER: &str = "info";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Lambda環境向けのログサブスクライバーを初期化する
///
/// JSON形式での構造化ログ出力を設定する。複数回呼び出しても
/// 最初の呼び出しのみ初期化を実行する。
pub fn init_logging() {
    INIT.call_once(|| {
        // JSON形式のログレイヤー（CloudWatch向け）
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .flatten_event(true)
            .with_current_span(false);

        tracing_subscriber::registry()
            .with(env_filter(DEFAULT_FILTER))
            .with(json_layer)
            .init();
    });
}

/// ローカル実行向けのログサブスクライバーを初期化する（人間が読みやすい形式）
///
/// 出力はstderrに送り、stdoutは実行結果のJSON専用にする。
pub fn init_cli_logging() {
    INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact();

        tracing_subscriber::registry()
            .with(env_filter(DEFAULT_FILTER))
            .with(fmt_layer)
            .init();
    });
}

/// テスト用のログサブスクライバーを初期化する
#[cfg(test)]
pub fn init_test_logging() {
    static TEST_INIT: Once = Once::new();

    TEST_INIT.call_once(|| {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(env_filter("debug"))
            .with(fmt_layer)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_idempotent() {
        init_test_logging();
        init_test_logging();
    }

    #[test]
    fn test_log_with_context() {
        init_test_logging();

        tracing::info!(
            autotask_run_id = "run-123",
            subject_type = 3,
            "報酬請求判定"
        );
    }

    #[test]
    fn test_json_logging_configuration() {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .flatten_event(true);

        let _subscriber = tracing_subscriber::registry()
            .with(EnvFilter::new("info"))
            .with(json_layer);
    }
}
