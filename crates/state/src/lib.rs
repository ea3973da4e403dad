pub mod errors;
pub mod host;
pub mod metadata;
pub mod state;
pub mod transition;
pub mod vm;

pub use errors::InvalidTransaction;
pub use host::{compute_new_account_address, Host, MAX_CODE_SIZE, MAX_INITCODE_SIZE};
pub use metadata::{
    instruction_metrics_table, instruction_names_table, InstructionMetrics, Revision,
};
pub use state::State;
pub use transition::{finalize, transition};
pub use vm::{
    CallKind, ExecutionResult, HostInterface, Message, StatusCode, StorageStatus, TxContext, Vm,
};
