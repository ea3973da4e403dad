use std::cmp::min;
use std::sync::Arc;

use tracing::debug;
use zond_rust_core::{
    types::{AccessListEntry, Account, BlockInfo, Receipt, Transaction, Withdrawal},
    H256, U256, U512,
};

use crate::{
    errors::InvalidTransaction,
    host::{Host, MAX_INITCODE_SIZE},
    metadata::Revision,
    state::State,
    vm::{CallKind, HostInterface, Message, Vm},
};

const CALL_TX_COST: i64 = 21000;
const CREATE_TX_COST: i64 = 53000;
const ZERO_BYTE_COST: i64 = 4;
const NONZERO_BYTE_COST: i64 = 16;
const ACCESS_LIST_STORAGE_KEY_COST: i64 = 1900;
const ACCESS_LIST_ADDRESS_COST: i64 = 2400;
const INITCODE_WORD_COST: i64 = 2;
const MAX_REFUND_QUOTIENT: i64 = 5;

fn num_words(size_in_bytes: usize) -> i64 {
    ((size_in_bytes + 31) / 32) as i64
}

fn compute_tx_data_cost(data: &[u8]) -> i64 {
    data.iter()
        .map(|byte| {
            if *byte == 0 {
                ZERO_BYTE_COST
            } else {
                NONZERO_BYTE_COST
            }
        })
        .sum()
}

fn compute_access_list_cost(access_list: &[AccessListEntry]) -> i64 {
    access_list
        .iter()
        .map(|(_, storage_keys)| {
            ACCESS_LIST_ADDRESS_COST + storage_keys.len() as i64 * ACCESS_LIST_STORAGE_KEY_COST
        })
        .sum()
}

/// Gas charged before any instruction executes (Yellow Paper section 6.2).
fn compute_tx_intrinsic_cost(tx: &Transaction) -> i64 {
    let tx_cost = if tx.is_create() {
        CREATE_TX_COST + INITCODE_WORD_COST * num_words(tx.data.len())
    } else {
        CALL_TX_COST
    };
    tx_cost + compute_tx_data_cost(&tx.data) + compute_access_list_cost(&tx.access_list)
}

/// Validates the transaction against its sender and the block.
/// Returns the execution gas limit (the amount of gas provided to the VM)
/// for a valid transaction. Never mutates state.
fn validate_transaction(
    sender_acc: &Account,
    block: &BlockInfo,
    tx: &Transaction,
) -> Result<i64, InvalidTransaction> {
    if tx.max_priority_gas_price > tx.max_gas_price {
        return Err(InvalidTransaction::TipGtFeeCap);
    }

    if tx.gas_limit > block.gas_limit {
        return Err(InvalidTransaction::GasLimitReached);
    }

    if tx.max_gas_price < block.base_fee {
        return Err(InvalidTransaction::FeeCapLessThenBlocks);
    }

    // Origin must not be a contract (EIP-3607).
    if !sender_acc.code.is_empty() {
        return Err(InvalidTransaction::SenderNotEoa);
    }

    if sender_acc.nonce == Account::NONCE_MAX {
        return Err(InvalidTransaction::NonceHasMaxValue);
    }

    // initcode size is limited by EIP-3860.
    if tx.is_create() && tx.data.len() > MAX_INITCODE_SIZE {
        return Err(InvalidTransaction::InitCodeSizeLimitExceeded);
    }

    // The theoretical maximum transaction cost can exceed 256 bits, so the
    // comparison is done with 512-bit precision.
    let tx_cost_limit_512 =
        U256::from(tx.gas_limit as u64).full_mul(tx.max_gas_price) + U512::from(tx.value);
    if U512::from(sender_acc.balance) < tx_cost_limit_512 {
        return Err(InvalidTransaction::InsufficientFunds);
    }

    let intrinsic_cost = compute_tx_intrinsic_cost(tx);
    if intrinsic_cost > tx.gas_limit {
        return Err(InvalidTransaction::IntrinsicGasTooLow);
    }

    Ok(tx.gas_limit - intrinsic_cost)
}

fn build_message(tx: &Transaction, execution_gas_limit: i64) -> Message {
    let recipient = tx.to.unwrap_or_default();
    Message {
        kind: if tx.is_create() {
            CallKind::Create
        } else {
            CallKind::Call
        },
        is_static: false,
        depth: 0,
        gas: execution_gas_limit,
        recipient,
        sender: tx.sender,
        input_data: tx.data.clone(),
        value: tx.value,
        create2_salt: H256::zero(),
        code_address: recipient,
    }
}

/// Executes one transaction against the state within the given block.
/// Produces a receipt on success; validation failures leave the state
/// untouched and produce no receipt.
pub fn transition(
    state: &mut State,
    block: &BlockInfo,
    tx: &Transaction,
    rev: Revision,
    vm: Arc<dyn Vm>,
) -> Result<Receipt, InvalidTransaction> {
    // Lifecycle flags are transaction-scoped; nothing may leak from a
    // previous execution over the same pre-state.
    state.clear_transient_flags();

    let sender_acc = state.get(tx.sender);
    let execution_gas_limit = validate_transaction(sender_acc, block, tx)?;

    let base_fee = block.base_fee;
    let priority_gas_price = min(tx.max_priority_gas_price, tx.max_gas_price - base_fee);
    let effective_gas_price = base_fee + priority_gas_price;
    let tx_max_cost = U256::from(tx.gas_limit as u64) * effective_gas_price;

    // Modify sender balance after all checks.
    state.get_mut(tx.sender).balance -= tx_max_cost;

    let mut host = Host::new(rev, vm, state, block, tx);

    // Tx sender is always warm.
    host.access_account(tx.sender);
    if let Some(to) = tx.to {
        host.access_account(to);
    }
    for (address, storage_keys) in &tx.access_list {
        host.access_account(*address);
        for key in storage_keys {
            host.access_storage(*address, *key);
        }
    }
    // EIP-3651: warm COINBASE. The account this may materialize stays
    // erasable and is reaped at finalization unless the fee credit below
    // makes it non-empty.
    host.access_account(block.coinbase);

    let result = host.call(build_message(tx, execution_gas_limit));
    let logs = host.take_logs();
    drop(host);

    let mut gas_used = tx.gas_limit - result.gas_left;

    let refund_limit = gas_used / MAX_REFUND_QUOTIENT;
    let refund = min(result.gas_refund, refund_limit);
    gas_used -= refund;

    state.get_mut(tx.sender).balance +=
        tx_max_cost - U256::from(gas_used as u64) * effective_gas_price;
    state.touch(block.coinbase).balance += U256::from(gas_used as u64) * priority_gas_price;

    // Apply destructs.
    state.remove_destructed();

    debug!(
        sender = ?tx.sender,
        gas_used,
        status = ?result.status_code,
        "transaction executed"
    );

    Ok(Receipt::new(
        tx.tx_type,
        result.status_code.to_tx_status(),
        gas_used as u64,
        logs,
    ))
}

/// End-of-block bookkeeping: reaps the touched-and-still-empty accounts
/// (EIP-161), then credits the withdrawals (EIP-4895).
pub fn finalize(state: &mut State, withdrawals: &[Withdrawal]) {
    state.remove_erasable_empty();

    for withdrawal in withdrawals {
        state.touch(withdrawal.address).balance += withdrawal.get_amount();
    }
}

/// Intrinsic cost of a transaction, exposed for gas-accounting checks.
pub fn intrinsic_cost(tx: &Transaction) -> i64 {
    compute_tx_intrinsic_cost(tx)
}
