use ethereum_types::{Address, H256, U256};

/// Amount of wei per unit of a withdrawal amount (EIP-4895 amounts are in Gwei).
pub const GWEI_TO_WEI: u64 = 1_000_000_000;

/// The block context a transaction executes in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
    pub gas_limit: i64,
    pub coinbase: Address,
    pub prev_randao: H256,
    pub base_fee: U256,
}

/// A validator withdrawal credited at the end of the block (EIP-4895).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Withdrawal {
    pub index: u64,
    pub validator_index: u64,
    pub address: Address,
    pub amount: u64,
}

impl Withdrawal {
    /// The credited amount in wei.
    pub fn get_amount(&self) -> U256 {
        U256::from(self.amount) * U256::from(GWEI_TO_WEI)
    }
}
