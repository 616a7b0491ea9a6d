//! Vault `claimRewards` call encoding

use alloy::primitives::{hex, Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

// Vault contract binding: a single nonpayable function with no outputs
sol! {
    #[allow(missing_docs)]
    interface IRewardsVault {
        function claimRewards(uint256 subjectId, uint256 epochNumber) external;
    }
}

/// A `claimRewards(subjectId, epochNumber)` call against a vault contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRewardsCall {
    pub vault: Address,
    pub subject_id: U256,
    pub epoch_number: U256,
}

impl ClaimRewardsCall {
    pub fn new(vault: Address, subject_id: U256, epoch_number: U256) -> Self {
        Self {
            vault,
            subject_id,
            epoch_number,
        }
    }

    /// Solidity function signature
    pub fn signature() -> &'static str {
        IRewardsVault::claimRewardsCall::SIGNATURE
    }

    /// 4-byte function selector
    pub fn selector() -> [u8; 4] {
        IRewardsVault::claimRewardsCall::SELECTOR
    }

    /// ABI-encoded calldata (selector followed by both arguments)
    pub fn calldata(&self) -> Vec<u8> {
        IRewardsVault::claimRewardsCall {
            subjectId: self.subject_id,
            epochNumber: self.epoch_number,
        }
        .abi_encode()
    }

    /// Calldata as a 0x-prefixed hex string, the form the relay expects
    pub fn calldata_hex(&self) -> String {
        hex::encode_prefixed(self.calldata())
    }

    /// Checksummed target address
    pub fn to_hex(&self) -> String {
        self.vault.to_checksum(None)
    }
}
