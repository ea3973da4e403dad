use bytes::Bytes;
use zond_rust_core::{
    types::{AccessStatus, TxStatus},
    Address, H256, U256,
};

use crate::metadata::Revision;

/// The kind of a message dispatched through the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Call,
    DelegateCall,
    CallCode,
    Create,
    Create2,
}

impl CallKind {
    pub fn is_create(&self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2)
    }
}

/// Execution outcome as reported by the VM or the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusCode {
    Success,
    Revert,
    Failure,
    OutOfGas,
    InvalidInstruction,
    UndefinedInstruction,
    StackOverflow,
    StackUnderflow,
    BadJumpDestination,
    StaticModeViolation,
    PrecompileFailure,
    InternalError,
}

impl StatusCode {
    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Success)
    }

    /// Collapses the detailed code into the outcome recorded in receipts.
    pub fn to_tx_status(self) -> TxStatus {
        match self {
            StatusCode::Success => TxStatus::Success,
            StatusCode::Revert => TxStatus::Revert,
            _ => TxStatus::Failure,
        }
    }
}

/// A call or create message passed between the host and the VM.
#[derive(Clone, Debug)]
pub struct Message {
    pub kind: CallKind,
    pub is_static: bool,
    pub depth: i32,
    pub gas: i64,
    pub recipient: Address,
    pub sender: Address,
    pub input_data: Bytes,
    pub value: U256,
    /// Only meaningful for Create2 messages.
    pub create2_salt: H256,
    /// The account whose code executes; differs from the recipient for
    /// DELEGATECALL and CALLCODE.
    pub code_address: Address,
}

/// The result of a message execution.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    pub status_code: StatusCode,
    pub gas_left: i64,
    pub gas_refund: i64,
    pub output_data: Bytes,
    /// The address of the deployed contract, set by the host on a
    /// successful create.
    pub create_address: Option<Address>,
}

impl ExecutionResult {
    pub fn success(gas_left: i64, gas_refund: i64, output_data: Bytes) -> Self {
        Self {
            status_code: StatusCode::Success,
            gas_left,
            gas_refund,
            output_data,
            create_address: None,
        }
    }

    /// A revert produced by the host itself: keeps the gas, returns no data.
    pub fn revert(gas_left: i64) -> Self {
        Self {
            status_code: StatusCode::Revert,
            gas_left,
            gas_refund: 0,
            output_data: Bytes::new(),
            create_address: None,
        }
    }
}

/// Per-transaction context handed to the VM.
#[derive(Clone, Copy, Debug)]
pub struct TxContext {
    /// The effective gas price: `base_fee + min(max_priority, max_gas_price - base_fee)`.
    pub gas_price: U256,
    pub origin: Address,
    pub coinbase: Address,
    pub block_number: u64,
    pub timestamp: u64,
    pub gas_limit: i64,
    pub prev_randao: H256,
    pub chain_id: U256,
    pub base_fee: U256,
}

/// Result of a storage modification, driving the caller's gas accounting
/// per EIP-2200/EIP-3529. The host itself does not charge gas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageStatus {
    /// The value of a storage item has been left unchanged: 0 -> 0 and X -> X.
    Assigned,
    /// A new storage item is added by changing: 0 -> X.
    Added,
    /// A storage item is deleted by changing: X -> 0.
    Deleted,
    /// A storage item is modified by changing: X -> Y.
    Modified,
    /// A storage item is deleted and then a new one is added: X -> 0 -> Z.
    DeletedAdded,
    /// A modified storage item is deleted: X -> Y -> 0.
    ModifiedDeleted,
    /// A deleted storage item is restored: X -> 0 -> X.
    DeletedRestored,
    /// An added storage item is deleted: 0 -> Y -> 0.
    AddedDeleted,
    /// A modified storage item is restored: X -> Y -> X.
    ModifiedRestored,
}

/// The callbacks the VM uses to observe and modify the world state.
/// The host never panics across this boundary for missing entries the VM
/// can legitimately probe (absent accounts, absent slots).
pub trait HostInterface {
    fn account_exists(&self, address: Address) -> bool;

    /// Returns zero for absent slots.
    fn get_storage(&self, address: Address, key: H256) -> U256;

    fn set_storage(&mut self, address: Address, key: H256, value: U256) -> StorageStatus;

    fn get_balance(&self, address: Address) -> U256;

    fn get_code_size(&self, address: Address) -> usize;

    /// Zero for absent or empty accounts (EIP-1052).
    fn get_code_hash(&self, address: Address) -> H256;

    /// Copies code starting at `code_offset` into `buffer`, returning the
    /// number of bytes copied.
    fn copy_code(&self, address: Address, code_offset: usize, buffer: &mut [u8]) -> usize;

    fn selfdestruct(&mut self, address: Address, beneficiary: Address);

    fn get_tx_context(&self) -> TxContext;

    fn get_block_hash(&self, block_number: u64) -> H256;

    fn emit_log(&mut self, address: Address, data: &[u8], topics: &[H256]);

    /// Returns the prior status and upgrades the account to Warm.
    fn access_account(&mut self, address: Address) -> AccessStatus;

    /// Returns the prior status and upgrades the storage slot to Warm.
    fn access_storage(&mut self, address: Address, key: H256) -> AccessStatus;

    /// Dispatches a nested CALL / DELEGATECALL / CALLCODE / CREATE / CREATE2.
    fn call(&mut self, msg: Message) -> ExecutionResult;
}

/// Handle to the externally loaded VM module.
/// The core never reads it from ambient storage; it is threaded through
/// explicitly as a collaborator.
pub trait Vm {
    fn execute(
        &self,
        host: &mut dyn HostInterface,
        rev: Revision,
        msg: &Message,
        code: &[u8],
    ) -> ExecutionResult;
}
