// Domain layer modules
pub mod action_event;
pub mod claim_call;
pub mod subject_type;

// Re-exports
pub use action_event::{ActionEvent, ClaimParams, MatchReason, PayloadError, RelayerParams};
pub use claim_call::ClaimRewardsCall;
pub use subject_type::{SubjectType, DELEGATOR_SCANNER_POOL_SUBJECT};
