// Infrastructure layer modules
pub mod config;
pub mod lambda_relay_client;
pub mod logging;
pub mod relay_client;

// Re-exports
pub use config::{ActionConfig, ConfigError};
pub use lambda_relay_client::{LambdaRelayClient, LambdaRelayConnector, RelayerCredentials};
pub use logging::{init_cli_logging, init_logging};
pub use relay_client::{
    RelayClient, RelayConnector, RelayError, RelayerTransaction, RelayerTransactionRequest,
    TxSpeed,
};
