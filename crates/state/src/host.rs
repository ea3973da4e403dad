use std::cmp::min;
use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use keccak_hash::keccak;
use tracing::trace;
use zond_rust_core::{
    types::{AccessStatus, Account, BlockInfo, Log, Transaction},
    Address, H256, U256,
};
use zond_rust_rlp::encode::RLPEncode;

use crate::{
    metadata::Revision,
    state::State,
    vm::{CallKind, ExecutionResult, HostInterface, Message, StatusCode, StorageStatus, TxContext, Vm},
};

pub const MAX_CODE_SIZE: usize = 0x6000;
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;

const MAX_CALL_DEPTH: i32 = 1024;
const CODE_DEPOSIT_COST: i64 = 200;

/// Precompiled contracts are always warm and never stored in the state.
fn is_precompile(address: Address) -> bool {
    let bytes = address.as_bytes();
    bytes[..19].iter().all(|byte| *byte == 0) && (1..=9).contains(&bytes[19])
}

/// Computes the address of a to-be-created contract.
///
/// With no salt the CREATE scheme applies:
/// `keccak(rlp([sender, sender_nonce]))[12..]`, where the nonce is the
/// sender's value before the increase. With a salt the CREATE2 scheme
/// applies: `keccak(0xff || sender || salt || keccak(init_code))[12..]`.
pub fn compute_new_account_address(
    sender: Address,
    sender_nonce: u64,
    salt: Option<H256>,
    init_code: &[u8],
) -> Address {
    let hash = match salt {
        None => {
            let mut encoded = Vec::new();
            (sender, sender_nonce).encode(&mut encoded);
            keccak(encoded)
        }
        Some(salt) => {
            let init_code_hash = keccak(init_code);
            keccak(
                [
                    &[0xff][..],
                    sender.as_bytes(),
                    salt.as_bytes(),
                    init_code_hash.as_bytes(),
                ]
                .concat(),
            )
        }
    };
    Address::from_slice(&hash.as_bytes()[12..])
}

struct Snapshot {
    accounts: BTreeMap<Address, Account>,
    logs_count: usize,
}

/// The VM's view of the world during one transaction.
/// Owns the log buffer and relays nested calls back into the VM.
pub struct Host<'a> {
    rev: Revision,
    vm: Arc<dyn Vm>,
    state: &'a mut State,
    block: &'a BlockInfo,
    tx: &'a Transaction,
    logs: Vec<Log>,
}

impl<'a> Host<'a> {
    pub fn new(
        rev: Revision,
        vm: Arc<dyn Vm>,
        state: &'a mut State,
        block: &'a BlockInfo,
        tx: &'a Transaction,
    ) -> Self {
        Self {
            rev,
            vm,
            state,
            block,
            tx,
            logs: Vec::new(),
        }
    }

    pub fn take_logs(&mut self) -> Vec<Log> {
        std::mem::take(&mut self.logs)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            accounts: self.state.snapshot(),
            logs_count: self.logs.len(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.state.restore(snapshot.accounts);
        self.logs.truncate(snapshot.logs_count);
    }

    /// Performs the sender-side checks of a message: call depth, value
    /// coverage, and for creations the nonce bump and new address
    /// derivation. State modifications made here are not reverted; in
    /// particular a failed creation keeps the sender's nonce increase.
    /// Returns `None` when the message must not execute.
    fn prepare_message(&mut self, mut msg: Message) -> Option<Message> {
        if msg.depth > MAX_CALL_DEPTH {
            return None;
        }

        if matches!(msg.kind, CallKind::Call | CallKind::CallCode) || msg.kind.is_create() {
            if self.state.get(msg.sender).balance < msg.value {
                trace!(sender = ?msg.sender, "not enough balance");
                return None;
            }
        }

        if msg.kind.is_create() {
            let sender = self.state.get_mut(msg.sender);
            if sender.nonce == Account::NONCE_MAX {
                return None;
            }
            let sender_nonce = sender.nonce;
            sender.nonce += 1;

            let salt = (msg.kind == CallKind::Create2).then_some(msg.create2_salt);
            let new_address =
                compute_new_account_address(msg.sender, sender_nonce, salt, &msg.input_data);
            msg.recipient = new_address;
            msg.code_address = new_address;
        }

        Some(msg)
    }

    fn execute_vm(&mut self, msg: &Message, code: &[u8]) -> ExecutionResult {
        let vm = Arc::clone(&self.vm);
        let rev = self.rev;
        vm.execute(self, rev, msg, code)
    }

    /// Handles CREATE / CREATE2 after `prepare_message` derived the new
    /// address and bumped the sender nonce.
    fn create(&mut self, msg: Message) -> ExecutionResult {
        let new_address = msg.recipient;

        // An account with a used nonce or existing code cannot be re-created.
        if let Some(existing) = self.state.find(new_address) {
            if existing.nonce != 0 || !existing.code.is_empty() {
                return ExecutionResult::revert(msg.gas);
            }
        }

        self.state.get_mut(msg.sender).balance -= msg.value;
        let account = self.state.touch(new_address);
        account.nonce = 1;
        account.balance += msg.value;
        account.destructed = false;
        account.erasable = true;
        account.access_status = AccessStatus::Warm;

        let init_code = msg.input_data.clone();
        let mut exec_msg = msg;
        exec_msg.input_data = Bytes::new();

        let mut result = self.execute_vm(&exec_msg, &init_code);

        if result.status_code == StatusCode::Success {
            let code = result.output_data.clone();
            let deposit_cost = CODE_DEPOSIT_COST * code.len() as i64;
            // EIP-3541 rejects code starting with 0xEF; oversized code and
            // an unpayable deposit demote the result to a revert.
            if code.len() > MAX_CODE_SIZE
                || code.first() == Some(&0xEF)
                || result.gas_left < deposit_cost
            {
                result.status_code = StatusCode::Revert;
            } else {
                result.gas_left -= deposit_cost;
                self.state.get_mut(new_address).code = code;
                result.create_address = Some(new_address);
            }
        }

        result
    }

    /// Handles CALL / CALLCODE / DELEGATECALL / STATICCALL.
    fn message_call(&mut self, msg: Message) -> ExecutionResult {
        // Value moves only on a plain CALL; DELEGATECALL and CALLCODE run
        // foreign code without transferring anything, STATICCALL carries no
        // value at all.
        if msg.kind == CallKind::Call {
            self.state.touch(msg.recipient);
            if !msg.value.is_zero() {
                self.state.get_mut(msg.sender).balance -= msg.value;
                self.state.get_mut(msg.recipient).balance += msg.value;
            }
        }

        let code = self
            .state
            .find(msg.code_address)
            .map(|account| account.code.clone())
            .unwrap_or_default();

        self.execute_vm(&msg, &code)
    }
}

impl HostInterface for Host<'_> {
    fn account_exists(&self, address: Address) -> bool {
        self.state.find(address).is_some()
    }

    fn get_storage(&self, address: Address, key: H256) -> U256 {
        self.state
            .find(address)
            .and_then(|account| account.storage.get(&key))
            .map(|value| value.current)
            .unwrap_or_default()
    }

    fn set_storage(&mut self, address: Address, key: H256, new_value: U256) -> StorageStatus {
        let account = self.state.get_mut(address);
        let value = account.storage.entry(key).or_default();

        let status = if value.current == new_value {
            StorageStatus::Assigned
        } else if value.original == value.current {
            // first write to this slot in the transaction
            if value.original.is_zero() {
                StorageStatus::Added
            } else if new_value.is_zero() {
                StorageStatus::Deleted
            } else {
                StorageStatus::Modified
            }
        } else if value.original.is_zero() {
            if new_value.is_zero() {
                StorageStatus::AddedDeleted
            } else {
                StorageStatus::Assigned
            }
        } else if value.current.is_zero() {
            if new_value == value.original {
                StorageStatus::DeletedRestored
            } else {
                StorageStatus::DeletedAdded
            }
        } else if new_value.is_zero() {
            StorageStatus::ModifiedDeleted
        } else if new_value == value.original {
            StorageStatus::ModifiedRestored
        } else {
            StorageStatus::Assigned
        };

        value.current = new_value;
        status
    }

    fn get_balance(&self, address: Address) -> U256 {
        self.state
            .find(address)
            .map(|account| account.balance)
            .unwrap_or_default()
    }

    fn get_code_size(&self, address: Address) -> usize {
        self.state
            .find(address)
            .map(|account| account.code.len())
            .unwrap_or_default()
    }

    fn get_code_hash(&self, address: Address) -> H256 {
        // Absent and empty accounts both report a zero hash (EIP-1052).
        self.state
            .find(address)
            .filter(|account| !account.is_empty())
            .map(|account| account.code_hash())
            .unwrap_or_default()
    }

    fn copy_code(&self, address: Address, code_offset: usize, buffer: &mut [u8]) -> usize {
        let Some(account) = self.state.find(address) else {
            return 0;
        };
        if code_offset >= account.code.len() {
            return 0;
        }
        let count = min(buffer.len(), account.code.len() - code_offset);
        buffer[..count].copy_from_slice(&account.code[code_offset..code_offset + count]);
        count
    }

    fn selfdestruct(&mut self, address: Address, beneficiary: Address) {
        let balance = self.state.get(address).balance;
        self.state.touch(beneficiary).balance += balance;
        let account = self.state.get_mut(address);
        // With itself as beneficiary the balance is burned.
        account.balance = U256::zero();
        account.destructed = true;
    }

    fn get_tx_context(&self) -> TxContext {
        let priority_gas_price = min(
            self.tx.max_priority_gas_price,
            self.tx.max_gas_price.saturating_sub(self.block.base_fee),
        );
        TxContext {
            gas_price: self.block.base_fee + priority_gas_price,
            origin: self.tx.sender,
            coinbase: self.block.coinbase,
            block_number: self.block.number,
            timestamp: self.block.timestamp,
            gas_limit: self.block.gas_limit,
            prev_randao: self.block.prev_randao,
            chain_id: U256::from(self.tx.chain_id),
            base_fee: self.block.base_fee,
        }
    }

    fn get_block_hash(&self, block_number: u64) -> H256 {
        // Synthetic ancestor hashes for the 256-block window.
        if block_number < self.block.number && self.block.number - block_number <= 256 {
            keccak(block_number.to_be_bytes())
        } else {
            H256::zero()
        }
    }

    fn emit_log(&mut self, address: Address, data: &[u8], topics: &[H256]) {
        self.logs.push(Log {
            address,
            topics: topics.to_vec(),
            data: Bytes::copy_from_slice(data),
        });
    }

    fn access_account(&mut self, address: Address) -> AccessStatus {
        if is_precompile(address) {
            return AccessStatus::Warm;
        }
        // Warming an absent account materializes it as empty and erasable,
        // so it disappears again at finalization unless credited.
        if self.state.find(address).is_none() {
            self.state.touch(address);
        }
        let account = self.state.get_mut(address);
        let status = account.access_status;
        account.access_status = AccessStatus::Warm;
        status
    }

    fn access_storage(&mut self, address: Address, key: H256) -> AccessStatus {
        let account = self.state.get_mut(address);
        let value = account.storage.entry(key).or_default();
        let status = value.access_status;
        value.access_status = AccessStatus::Warm;
        status
    }

    fn call(&mut self, msg: Message) -> ExecutionResult {
        trace!(kind = ?msg.kind, depth = msg.depth, "message dispatch");
        let gas = msg.gas;
        let Some(msg) = self.prepare_message(msg) else {
            return ExecutionResult::revert(gas);
        };

        let snapshot = self.snapshot();
        let mut result = if msg.kind.is_create() {
            self.create(msg)
        } else {
            self.message_call(msg)
        };

        if result.status_code != StatusCode::Success {
            self.restore(snapshot);
            result.gas_refund = 0;
            if result.status_code != StatusCode::Revert {
                result.gas_left = 0;
            }
        }
        result
    }
}

#[cfg(test)]
mod test {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn create_address_derivation() {
        // keccak(rlp([sender, nonce]))[12..]
        let sender = Address::from(hex!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"));
        assert_eq!(
            compute_new_account_address(sender, 0, None, &[]),
            Address::from(hex!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"))
        );
        assert_eq!(
            compute_new_account_address(sender, 1, None, &[]),
            Address::from(hex!("343c43a37d37dff08ae8c4a11544c718abb4fcf8"))
        );
    }

    #[test]
    fn create2_address_derivation() {
        // Example 1 of EIP-1014: zero sender, zero salt, empty init code.
        assert_eq!(
            compute_new_account_address(Address::zero(), 0, Some(H256::zero()), &[]),
            Address::from(hex!("e33c0c7f7df4809055c3eba6c09cfe4baf1bd9e0"))
        );
    }

    #[test]
    fn precompile_range() {
        assert!(is_precompile(Address::from_low_u64_be(1)));
        assert!(is_precompile(Address::from_low_u64_be(9)));
        assert!(!is_precompile(Address::from_low_u64_be(0)));
        assert!(!is_precompile(Address::from_low_u64_be(10)));
        assert!(!is_precompile(Address::from_low_u64_be(0x0101)));
    }

    mod storage_status {
        use zond_rust_core::types::{BlockInfo, StorageValue, Transaction};

        use crate::state::State;

        use super::*;

        struct HaltVm;

        impl Vm for HaltVm {
            fn execute(
                &self,
                _host: &mut dyn HostInterface,
                _rev: Revision,
                msg: &Message,
                _code: &[u8],
            ) -> ExecutionResult {
                ExecutionResult::success(msg.gas, 0, Bytes::new())
            }
        }

        fn with_slot(original: u64, current: u64) -> State {
            let mut account = Account::default();
            account.storage.insert(
                H256::zero(),
                StorageValue {
                    original: U256::from(original),
                    current: U256::from(current),
                    access_status: AccessStatus::Warm,
                },
            );
            State::from_iter([(Address::from_low_u64_be(0xc0), account)])
        }

        fn status_for(original: u64, current: u64, new_value: u64) -> StorageStatus {
            let mut state = with_slot(original, current);
            let block = BlockInfo::default();
            let tx = Transaction::default();
            let mut host = Host::new(Revision::Shanghai, Arc::new(HaltVm), &mut state, &block, &tx);
            host.set_storage(
                Address::from_low_u64_be(0xc0),
                H256::zero(),
                U256::from(new_value),
            )
        }

        #[test]
        fn all_nine_cases() {
            // no prior modification in this transaction
            assert_eq!(status_for(0, 0, 0), StorageStatus::Assigned);
            assert_eq!(status_for(5, 5, 5), StorageStatus::Assigned);
            assert_eq!(status_for(0, 0, 7), StorageStatus::Added);
            assert_eq!(status_for(5, 5, 0), StorageStatus::Deleted);
            assert_eq!(status_for(5, 5, 7), StorageStatus::Modified);
            // already dirty
            assert_eq!(status_for(0, 7, 0), StorageStatus::AddedDeleted);
            assert_eq!(status_for(0, 7, 8), StorageStatus::Assigned);
            assert_eq!(status_for(5, 0, 5), StorageStatus::DeletedRestored);
            assert_eq!(status_for(5, 0, 7), StorageStatus::DeletedAdded);
            assert_eq!(status_for(5, 7, 0), StorageStatus::ModifiedDeleted);
            assert_eq!(status_for(5, 7, 5), StorageStatus::ModifiedRestored);
            assert_eq!(status_for(5, 7, 8), StorageStatus::Assigned);
        }

        #[test]
        fn set_storage_updates_current_only() {
            let mut state = with_slot(5, 5);
            let block = BlockInfo::default();
            let tx = Transaction::default();
            let address = Address::from_low_u64_be(0xc0);
            let mut host = Host::new(Revision::Shanghai, Arc::new(HaltVm), &mut state, &block, &tx);
            host.set_storage(address, H256::zero(), U256::from(9));
            assert_eq!(host.get_storage(address, H256::zero()), U256::from(9));
            drop(host);
            let value = &state.get(address).storage[&H256::zero()];
            assert_eq!(value.original, U256::from(5));
        }
    }
}
