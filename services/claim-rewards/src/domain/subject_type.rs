/// Forta staking subject type classification
///
/// The vault contract identifies the staked entity by a numeric discriminant.
/// Only delegated scanner pool stakes accrue claimable delegator rewards.
use serde_json::Value;

/// Raw discriminant of a delegator scanner pool subject
pub const DELEGATOR_SCANNER_POOL_SUBJECT: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectType {
    /// 0: scanner node
    Scanner,

    /// 1: detection bot
    Agent,

    /// 2: scanner pool (owner stake)
    ScannerPool,

    /// 3: scanner pool (delegator stake)
    DelegatorScannerPool,

    /// Any discriminant this action does not know about
    Unknown(u8),
}

impl SubjectType {
    /// Classify a raw discriminant
    pub fn classify(raw: u8) -> Self {
        match raw {
            0 => SubjectType::Scanner,
            1 => SubjectType::Agent,
            2 => SubjectType::ScannerPool,
            DELEGATOR_SCANNER_POOL_SUBJECT => SubjectType::DelegatorScannerPool,
            n => SubjectType::Unknown(n),
        }
    }

    /// Classify a match reason parameter value
    ///
    /// JSON numbers with an integral value are classified, so `3` and `3.0`
    /// both match. Strings such as `"3"` are not coerced and yield `None`,
    /// so they never match a subject type.
    pub fn from_param(value: &Value) -> Option<Self> {
        value
            .as_u64()
            .or_else(|| value.as_f64().and_then(integral_f64))
            .and_then(|n| u8::try_from(n).ok())
            .map(Self::classify)
    }

    /// Check if rewards should be claimed for this subject type
    pub fn claims_rewards(&self) -> bool {
        matches!(self, SubjectType::DelegatorScannerPool)
    }
}

fn integral_f64(n: f64) -> Option<u64> {
    (n.fract() == 0.0 && (0.0..=u8::MAX as f64).contains(&n)).then_some(n as u64)
}
