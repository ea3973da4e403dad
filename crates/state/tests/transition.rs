use std::sync::Arc;

use bytes::Bytes;
use zond_rust_core::{
    types::{AccessStatus, Account, BlockInfo, Transaction, TxStatus, Withdrawal},
    Address, Bloom, H256, U256,
};
use zond_rust_state::{
    compute_new_account_address, finalize, transition, transition::intrinsic_cost, CallKind,
    ExecutionResult, HostInterface, InvalidTransaction, Message, Revision, State, StatusCode, Vm,
};

fn sender() -> Address {
    Address::repeat_byte(0x11)
}

fn recipient() -> Address {
    Address::repeat_byte(0x22)
}

fn coinbase() -> Address {
    Address::repeat_byte(0xcc)
}

fn block() -> BlockInfo {
    BlockInfo {
        number: 1,
        timestamp: 1000,
        gas_limit: 30_000_000,
        coinbase: coinbase(),
        prev_randao: H256::zero(),
        base_fee: U256::from(7),
    }
}

fn transfer_tx(value: u64) -> Transaction {
    Transaction {
        to: Some(recipient()),
        gas_limit: 100_000,
        max_gas_price: U256::from(1000),
        max_priority_gas_price: U256::from(10),
        sender: sender(),
        value: U256::from(value),
        ..Default::default()
    }
}

fn funded_state() -> State {
    State::from_iter([
        (
            sender(),
            Account::default().with_balance(U256::from(10).pow(U256::from(18))),
        ),
        (recipient(), Account::default().with_balance(U256::from(5))),
    ])
}

fn balance_sum(state: &State) -> U256 {
    state
        .accounts()
        .values()
        .fold(U256::zero(), |sum, account| sum + account.balance)
}

/// A VM that does nothing and succeeds with all gas left.
struct NoopVm;

impl Vm for NoopVm {
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

/// A VM that returns a fixed result regardless of the message.
struct StubVm {
    status_code: StatusCode,
    gas_left_divisor: i64,
    gas_refund: i64,
    output_data: Bytes,
}

impl Vm for StubVm {
    fn execute(
        &self,
        _host: &mut dyn HostInterface,
        _rev: Revision,
        msg: &Message,
        _code: &[u8],
    ) -> ExecutionResult {
        ExecutionResult {
            status_code: self.status_code,
            gas_left: if self.status_code == StatusCode::Failure {
                0
            } else {
                msg.gas / self.gas_left_divisor
            },
            gas_refund: self.gas_refund,
            output_data: self.output_data.clone(),
            create_address: None,
        }
    }
}

#[test]
fn transfer_updates_balances_and_receipt() {
    let mut state = funded_state();
    let block = block();
    let tx = transfer_tx(100);
    let sum_before = balance_sum(&state);

    let receipt = transition(&mut state, &block, &tx, Revision::Shanghai, Arc::new(NoopVm)).unwrap();

    assert_eq!(receipt.status, TxStatus::Success);
    assert_eq!(receipt.gas_used, 21000);
    assert!(receipt.logs.is_empty());

    // effective gas price = 7 + min(10, 1000 - 7) = 17, priority part = 10
    let initial = U256::from(10).pow(U256::from(18));
    assert_eq!(
        state.get(sender()).balance,
        initial - U256::from(100) - U256::from(21000 * 17)
    );
    assert_eq!(state.get(recipient()).balance, U256::from(105));
    assert_eq!(state.get(coinbase()).balance, U256::from(21000 * 10));

    // The base fee share is burned.
    let sum_after = balance_sum(&state);
    assert_eq!(sum_before - sum_after, U256::from(21000 * 7));
}

#[test]
fn gas_used_stays_within_bounds() {
    let mut state = funded_state();
    let block = block();
    let tx = transfer_tx(0);

    let receipt = transition(&mut state, &block, &tx, Revision::Shanghai, Arc::new(NoopVm)).unwrap();

    assert!(receipt.gas_used >= intrinsic_cost(&tx) as u64);
    assert!(receipt.gas_used <= tx.gas_limit as u64);
}

#[test]
fn tip_greater_than_fee_cap_is_rejected() {
    let mut state = funded_state();
    let mut tx = transfer_tx(0);
    tx.max_priority_gas_price = U256::from(2000);

    let root_before = state.state_root();
    let result = transition(&mut state, &block(), &tx, Revision::Shanghai, Arc::new(NoopVm));
    assert_eq!(result.unwrap_err(), InvalidTransaction::TipGtFeeCap);
    // Failed validation leaves the state untouched.
    assert_eq!(state.state_root(), root_before);
}

#[test]
fn block_gas_limit_boundary() {
    let block = block();

    let mut tx = transfer_tx(0);
    tx.gas_limit = block.gas_limit;
    let mut state = funded_state();
    assert!(transition(&mut state, &block, &tx, Revision::Shanghai, Arc::new(NoopVm)).is_ok());

    tx.gas_limit = block.gas_limit + 1;
    let mut state = funded_state();
    assert_eq!(
        transition(&mut state, &block, &tx, Revision::Shanghai, Arc::new(NoopVm)).unwrap_err(),
        InvalidTransaction::GasLimitReached
    );
}

#[test]
fn fee_cap_below_base_fee_is_rejected() {
    let mut state = funded_state();
    let mut tx = transfer_tx(0);
    tx.max_gas_price = U256::from(3);
    tx.max_priority_gas_price = U256::zero();

    assert_eq!(
        transition(&mut state, &block(), &tx, Revision::Shanghai, Arc::new(NoopVm)).unwrap_err(),
        InvalidTransaction::FeeCapLessThenBlocks
    );
}

#[test]
fn sender_with_code_is_rejected() {
    let mut state = funded_state();
    state.get_mut(sender()).code = Bytes::from_static(&[0x00]);

    assert_eq!(
        transition(&mut state, &block(), &transfer_tx(0), Revision::Shanghai, Arc::new(NoopVm))
            .unwrap_err(),
        InvalidTransaction::SenderNotEoa
    );
}

#[test]
fn sender_with_max_nonce_is_rejected() {
    let mut state = funded_state();
    state.get_mut(sender()).nonce = Account::NONCE_MAX;

    assert_eq!(
        transition(&mut state, &block(), &transfer_tx(0), Revision::Shanghai, Arc::new(NoopVm))
            .unwrap_err(),
        InvalidTransaction::NonceHasMaxValue
    );
}

#[test]
fn initcode_size_boundary() {
    let block = block();
    let max_initcode_size = 2 * 0x6000;

    let mut tx = transfer_tx(0);
    tx.to = None;
    tx.gas_limit = 1_000_000;
    tx.data = Bytes::from(vec![0u8; max_initcode_size]);
    let mut state = funded_state();
    assert!(transition(&mut state, &block, &tx, Revision::Shanghai, Arc::new(NoopVm)).is_ok());

    tx.data = Bytes::from(vec![0u8; max_initcode_size + 1]);
    let mut state = funded_state();
    assert_eq!(
        transition(&mut state, &block, &tx, Revision::Shanghai, Arc::new(NoopVm)).unwrap_err(),
        InvalidTransaction::InitCodeSizeLimitExceeded
    );
}

#[test]
fn balance_boundary_for_maximum_cost() {
    let block = block();
    let tx = transfer_tx(55);
    let exact = U256::from(tx.gas_limit as u64) * tx.max_gas_price + tx.value;

    let mut state = funded_state();
    state.get_mut(sender()).balance = exact;
    assert!(transition(&mut state, &block, &tx, Revision::Shanghai, Arc::new(NoopVm)).is_ok());

    let mut state = funded_state();
    state.get_mut(sender()).balance = exact - 1;
    assert_eq!(
        transition(&mut state, &block, &tx, Revision::Shanghai, Arc::new(NoopVm)).unwrap_err(),
        InvalidTransaction::InsufficientFunds
    );
}

#[test]
fn gas_limit_below_intrinsic_cost_is_rejected() {
    let mut state = funded_state();
    let mut tx = transfer_tx(0);
    tx.gas_limit = 20_999;

    assert_eq!(
        transition(&mut state, &block(), &tx, Revision::Shanghai, Arc::new(NoopVm)).unwrap_err(),
        InvalidTransaction::IntrinsicGasTooLow
    );
}

#[test]
fn refund_is_clamped_to_a_fifth_of_gas_used() {
    let mut state = funded_state();
    let vm = StubVm {
        status_code: StatusCode::Success,
        gas_left_divisor: 1,
        gas_refund: 1_000_000,
        output_data: Bytes::new(),
    };

    let receipt = transition(&mut state, &block(), &transfer_tx(0), Revision::Shanghai, Arc::new(vm))
        .unwrap();

    // 21000 gas used before the refund, clamped refund = 21000 / 5
    assert_eq!(receipt.gas_used, 21000 - 21000 / 5);
}

#[test]
fn revert_restores_state_and_keeps_remaining_gas() {
    let mut state = funded_state();
    let vm = StubVm {
        status_code: StatusCode::Revert,
        gas_left_divisor: 2,
        gas_refund: 0,
        output_data: Bytes::new(),
    };

    let receipt = transition(&mut state, &block(), &transfer_tx(100), Revision::Shanghai, Arc::new(vm))
        .unwrap();

    assert_eq!(receipt.status, TxStatus::Revert);
    // execution gas limit = 100000 - 21000 = 79000, half is returned
    let gas_used = 100_000 - 79_000 / 2;
    assert_eq!(receipt.gas_used, gas_used);

    // The value transfer was rolled back, the gas was not.
    assert_eq!(state.get(recipient()).balance, U256::from(5));
    let initial = U256::from(10).pow(U256::from(18));
    assert_eq!(
        state.get(sender()).balance,
        initial - U256::from(gas_used * 17)
    );
}

#[test]
fn failure_consumes_all_gas() {
    let mut state = funded_state();
    let vm = StubVm {
        status_code: StatusCode::Failure,
        gas_left_divisor: 1,
        gas_refund: 0,
        output_data: Bytes::new(),
    };

    let receipt = transition(&mut state, &block(), &transfer_tx(0), Revision::Shanghai, Arc::new(vm))
        .unwrap();

    assert_eq!(receipt.status, TxStatus::Failure);
    assert_eq!(receipt.gas_used, 100_000);
}

#[test]
fn create_transaction_deploys_code() {
    let mut state = funded_state();
    let deployed_code = Bytes::from(vec![0x00; 10]);
    let vm = StubVm {
        status_code: StatusCode::Success,
        gas_left_divisor: 1,
        gas_refund: 0,
        output_data: deployed_code.clone(),
    };

    let mut tx = transfer_tx(0);
    tx.to = None;
    tx.gas_limit = 200_000;
    tx.data = Bytes::from_static(&[0xfe]);

    let new_address = compute_new_account_address(sender(), 0, None, &tx.data);
    let receipt = transition(&mut state, &block(), &tx, Revision::Shanghai, Arc::new(vm)).unwrap();

    assert_eq!(receipt.status, TxStatus::Success);
    // intrinsic create cost + the 200-per-byte code deposit
    assert_eq!(receipt.gas_used, (53000 + 16 + 2) + 200 * 10);

    let account = state.get(new_address);
    assert_eq!(account.nonce, 1);
    assert_eq!(account.code, deployed_code);
    assert_eq!(state.get(sender()).nonce, 1);
}

#[test]
fn create_rejects_code_with_ef_prefix() {
    let mut state = funded_state();
    let vm = StubVm {
        status_code: StatusCode::Success,
        gas_left_divisor: 1,
        gas_refund: 0,
        output_data: Bytes::from_static(&[0xEF, 0x00]),
    };

    let mut tx = transfer_tx(0);
    tx.to = None;
    tx.gas_limit = 200_000;
    tx.data = Bytes::from_static(&[0xfe]);

    let new_address = compute_new_account_address(sender(), 0, None, &tx.data);
    let receipt = transition(&mut state, &block(), &tx, Revision::Shanghai, Arc::new(vm)).unwrap();

    assert_eq!(receipt.status, TxStatus::Revert);
    assert!(state.find(new_address).is_none());
    // The nonce increase of a failed creation is kept.
    assert_eq!(state.get(sender()).nonce, 1);
}

#[test]
fn create_rejects_oversized_code() {
    let mut state = funded_state();
    let vm = StubVm {
        status_code: StatusCode::Success,
        gas_left_divisor: 1,
        gas_refund: 0,
        output_data: Bytes::from(vec![0x00; 0x6000 + 1]),
    };

    let mut tx = transfer_tx(0);
    tx.to = None;
    tx.gas_limit = 200_000;

    let receipt = transition(&mut state, &block(), &tx, Revision::Shanghai, Arc::new(vm)).unwrap();
    assert_eq!(receipt.status, TxStatus::Revert);
}

#[test]
fn create_collision_reverts() {
    let mut state = funded_state();
    let mut tx = transfer_tx(0);
    tx.to = None;
    tx.gas_limit = 200_000;

    let new_address = compute_new_account_address(sender(), 0, None, &tx.data);
    state.insert(new_address, Account::default().with_nonce(1));

    let receipt =
        transition(&mut state, &block(), &tx, Revision::Shanghai, Arc::new(NoopVm)).unwrap();
    assert_eq!(receipt.status, TxStatus::Revert);
    assert_eq!(state.get(new_address).code, Bytes::new());
    assert_eq!(state.get(sender()).nonce, 1);
}

/// Asserts the warm set the moment execution starts: the access list and
/// the transaction parties are already warm, everything else is cold.
struct WarmSetProbeVm {
    listed_account: Address,
    listed_key: H256,
    unrelated: Address,
}

impl Vm for WarmSetProbeVm {
    fn execute(
        &self,
        host: &mut dyn HostInterface,
        _rev: Revision,
        msg: &Message,
        _code: &[u8],
    ) -> ExecutionResult {
        assert_eq!(host.access_account(msg.sender), AccessStatus::Warm);
        assert_eq!(host.access_account(msg.recipient), AccessStatus::Warm);
        assert_eq!(host.access_account(self.listed_account), AccessStatus::Warm);
        assert_eq!(
            host.access_storage(self.listed_account, self.listed_key),
            AccessStatus::Warm
        );
        assert_eq!(
            host.access_storage(self.listed_account, H256::from_low_u64_be(0xdead)),
            AccessStatus::Cold
        );
        assert_eq!(host.access_account(self.unrelated), AccessStatus::Cold);
        ExecutionResult::success(msg.gas, 0, Bytes::new())
    }
}

#[test]
fn access_list_is_warmed_before_execution() {
    let listed_account = Address::repeat_byte(0xab);
    let listed_key = H256::from_low_u64_be(42);

    let mut state = funded_state();
    let mut tx = transfer_tx(0);
    tx.access_list = vec![
        (listed_account, vec![listed_key]),
        (recipient(), vec![]),
    ];

    let vm = WarmSetProbeVm {
        listed_account,
        listed_key,
        unrelated: Address::repeat_byte(0xee),
    };

    let receipt = transition(&mut state, &block(), &tx, Revision::Shanghai, Arc::new(vm)).unwrap();
    assert_eq!(receipt.status, TxStatus::Success);
}

/// Destroys the executing contract, crediting a beneficiary.
struct SelfdestructVm {
    beneficiary: Address,
}

impl Vm for SelfdestructVm {
    fn execute(
        &self,
        host: &mut dyn HostInterface,
        _rev: Revision,
        msg: &Message,
        _code: &[u8],
    ) -> ExecutionResult {
        host.selfdestruct(msg.recipient, self.beneficiary);
        ExecutionResult::success(msg.gas, 0, Bytes::new())
    }
}

#[test]
fn destructed_account_does_not_survive_transition() {
    let contract = Address::repeat_byte(0x77);
    let beneficiary = Address::repeat_byte(0x88);

    let mut state = funded_state();
    state.insert(
        contract,
        Account::default()
            .with_balance(U256::from(50))
            .with_code(Bytes::from_static(&[0x00])),
    );

    let mut tx = transfer_tx(0);
    tx.to = Some(contract);

    let receipt = transition(
        &mut state,
        &block(),
        &tx,
        Revision::Shanghai,
        Arc::new(SelfdestructVm { beneficiary }),
    )
    .unwrap();

    assert_eq!(receipt.status, TxStatus::Success);
    assert!(state.find(contract).is_none());
    assert_eq!(state.get(beneficiary).balance, U256::from(50));
}

/// Emits one log from the executing contract.
struct LogVm;

impl Vm for LogVm {
    fn execute(
        &self,
        host: &mut dyn HostInterface,
        _rev: Revision,
        msg: &Message,
        _code: &[u8],
    ) -> ExecutionResult {
        host.emit_log(msg.recipient, &[0x01, 0x02], &[H256::from_low_u64_be(9)]);
        ExecutionResult::success(msg.gas, 0, Bytes::new())
    }
}

#[test]
fn logs_are_collected_into_the_receipt() {
    let mut state = funded_state();
    let receipt = transition(
        &mut state,
        &block(),
        &transfer_tx(0),
        Revision::Shanghai,
        Arc::new(LogVm),
    )
    .unwrap();

    assert_eq!(receipt.logs.len(), 1);
    assert_eq!(receipt.logs[0].address, recipient());
    assert_eq!(receipt.logs[0].topics, vec![H256::from_low_u64_be(9)]);
    assert_ne!(receipt.bloom, Bloom::default());
}

/// Issues a nested call over the depth limit.
struct DepthProbeVm;

impl Vm for DepthProbeVm {
    fn execute(
        &self,
        host: &mut dyn HostInterface,
        _rev: Revision,
        msg: &Message,
        _code: &[u8],
    ) -> ExecutionResult {
        let nested = Message {
            kind: CallKind::Call,
            is_static: false,
            depth: 1025,
            gas: 1000,
            recipient: msg.recipient,
            sender: msg.recipient,
            input_data: Bytes::new(),
            value: U256::zero(),
            create2_salt: H256::zero(),
            code_address: msg.recipient,
        };
        let result = host.call(nested);
        assert_eq!(result.status_code, StatusCode::Revert);
        assert_eq!(result.gas_left, 1000);
        assert_eq!(result.gas_refund, 0);
        ExecutionResult::success(msg.gas, 0, Bytes::new())
    }
}

#[test]
fn call_depth_limit_is_enforced() {
    let mut state = funded_state();
    let receipt = transition(
        &mut state,
        &block(),
        &transfer_tx(0),
        Revision::Shanghai,
        Arc::new(DepthProbeVm),
    )
    .unwrap();
    assert_eq!(receipt.status, TxStatus::Success);
}

#[test]
fn empty_coinbase_is_reaped_at_finalization() {
    let mut state = funded_state();
    let mut tx = transfer_tx(0);
    // No tip, so the warmed coinbase account stays empty.
    tx.max_priority_gas_price = U256::zero();

    transition(&mut state, &block(), &tx, Revision::Shanghai, Arc::new(NoopVm)).unwrap();
    assert!(state.find(coinbase()).is_some());

    finalize(&mut state, &[]);
    assert!(state.find(coinbase()).is_none());
}

#[test]
fn finalize_credits_withdrawals() {
    let mut state = funded_state();
    let validator = Address::repeat_byte(0x99);
    let withdrawals = [Withdrawal {
        index: 0,
        validator_index: 3,
        address: validator,
        amount: 2,
    }];

    finalize(&mut state, &withdrawals);
    assert_eq!(
        state.get(validator).balance,
        U256::from(2_000_000_000u64)
    );
}

#[test]
fn no_account_is_both_erasable_and_empty_after_finalize() {
    let mut state = funded_state();
    transition(&mut state, &block(), &transfer_tx(0), Revision::Shanghai, Arc::new(NoopVm)).unwrap();
    finalize(&mut state, &[]);

    for account in state.accounts().values() {
        assert!(!(account.erasable && account.is_empty()));
    }
}
