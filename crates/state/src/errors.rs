use thiserror::Error;

/// Reasons a transaction is rejected before any state mutation.
/// The whole transition fails and no receipt is produced.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTransaction {
    #[error("priority gas price is greater than the fee cap")]
    TipGtFeeCap,
    #[error("transaction gas limit exceeds the block gas limit")]
    GasLimitReached,
    #[error("fee cap is less than the block base fee")]
    FeeCapLessThenBlocks,
    #[error("sender is not an externally owned account")]
    SenderNotEoa,
    #[error("sender nonce has the maximum value")]
    NonceHasMaxValue,
    #[error("init code size limit exceeded")]
    InitCodeSizeLimitExceeded,
    #[error("insufficient funds for the maximum transaction cost")]
    InsufficientFunds,
    #[error("intrinsic gas exceeds the gas limit")]
    IntrinsicGasTooLow,
}
