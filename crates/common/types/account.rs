use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use sha3::{Digest as _, Keccak256};
use zond_rust_trie::Trie;

use zond_rust_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};

use lazy_static::lazy_static;

lazy_static! {
    // Keccak256(""), represents the code hash for an account without code
    pub static ref EMPTY_KECCACK_HASH: H256 = H256::from_slice(&hex::decode("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470").unwrap());
}

/// EIP-2929 access status of an account or storage slot.
/// The first access within a transaction is Cold, later ones are Warm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessStatus {
    #[default]
    Cold,
    Warm,
}

/// The representation of an account storage slot within a transaction.
/// A slot first seen in a transaction starts Cold with `current == original`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StorageValue {
    pub current: U256,
    pub original: U256,
    pub access_status: AccessStatus,
}

impl StorageValue {
    pub fn new(value: U256) -> Self {
        Self {
            current: value,
            original: value,
            access_status: AccessStatus::Cold,
        }
    }
}

/// The state account.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub storage: HashMap<H256, StorageValue>,
    pub code: Bytes,
    /// The account has been destructed and is removed at the end of the transaction.
    pub destructed: bool,
    /// The account is removed at the end of the transaction if still empty.
    /// Set when the account has been "touched" as defined in EIP-161
    /// or when it is a newly created temporary account.
    pub erasable: bool,
    pub access_status: AccessStatus,
}

impl Account {
    /// The maximum allowed nonce value.
    pub const NONCE_MAX: u64 = u64::MAX;

    /// Empty as defined in EIP-161: no code, zero nonce, zero balance.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.nonce == 0 && self.balance.is_zero()
    }

    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    pub fn code_hash(&self) -> H256 {
        code_hash(&self.code)
    }

    /// Root of the account's storage trie, skipping zero-valued slots.
    pub fn storage_root(&self) -> H256 {
        compute_storage_root(&self.storage)
    }

    pub fn with_balance(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_code(mut self, code: Bytes) -> Self {
        self.code = code;
        self
    }

    pub fn with_storage(mut self, storage: impl IntoIterator<Item = (H256, U256)>) -> Self {
        self.storage = storage
            .into_iter()
            .map(|(key, value)| (key, StorageValue::new(value)))
            .collect();
        self
    }
}

/// The account fields committed to the state trie.
#[derive(Debug, PartialEq)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
}

impl From<&Account> for AccountState {
    fn from(account: &Account) -> Self {
        AccountState {
            nonce: account.nonce,
            balance: account.balance,
            storage_root: account.storage_root(),
            code_hash: account.code_hash(),
        }
    }
}

impl RLPEncode for AccountState {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.balance)
            .encode_field(&self.storage_root)
            .encode_field(&self.code_hash)
            .finish();
    }
}

impl RLPDecode for AccountState {
    fn decode_unfinished(rlp: &[u8]) -> Result<(AccountState, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (balance, decoder) = decoder.decode_field("balance")?;
        let (storage_root, decoder) = decoder.decode_field("storage_root")?;
        let (code_hash, decoder) = decoder.decode_field("code_hash")?;
        let state = AccountState {
            nonce,
            balance,
            storage_root,
            code_hash,
        };
        Ok((state, decoder.finish()?))
    }
}

pub fn code_hash(code: &Bytes) -> H256 {
    keccak_hash::keccak(code.as_ref())
}

/// Computes the storage trie root: keys are hashed slot keys, values the
/// RLP of the current value in its shortest form. Zero-valued slots are
/// treated as deleted and skipped.
pub fn compute_storage_root(storage: &HashMap<H256, StorageValue>) -> H256 {
    let iter = storage.iter().filter_map(|(key, value)| {
        (!value.current.is_zero())
            .then(|| (Keccak256::digest(key).to_vec(), value.current.encode_to_vec()))
    });
    Trie::compute_hash_from_unsorted_iter(iter)
}

/// Computes the state trie root over all accounts.
pub fn compute_state_root(accounts: &BTreeMap<Address, Account>) -> H256 {
    let iter = accounts.iter().map(|(address, account)| {
        (
            Keccak256::digest(address).to_vec(),
            AccountState::from(account).encode_to_vec(),
        )
    });
    Trie::compute_hash_from_unsorted_iter(iter)
}
