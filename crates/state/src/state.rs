use std::collections::BTreeMap;

use zond_rust_core::{
    types::{compute_state_root, AccessStatus, Account},
    Address, H256,
};

/// The world state of one in-flight transition: an ordered map of accounts.
/// A missing account on [`State::get`] is a malformed pre-state, which is a
/// programmer error rather than a runtime condition.
#[derive(Clone, Debug, Default)]
pub struct State {
    accounts: BTreeMap<Address, Account>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the account at the given address, which must exist.
    pub fn get(&self, address: Address) -> &Account {
        self.accounts
            .get(&address)
            .expect("account does not exist")
    }

    /// Mutable variant of [`State::get`].
    pub fn get_mut(&mut self, address: Address) -> &mut Account {
        self.accounts
            .get_mut(&address)
            .expect("account does not exist")
    }

    /// Lookup without insertion.
    pub fn find(&self, address: Address) -> Option<&Account> {
        self.accounts.get(&address)
    }

    pub fn find_mut(&mut self, address: Address) -> Option<&mut Account> {
        self.accounts.get_mut(&address)
    }

    pub fn insert(&mut self, address: Address, account: Account) {
        self.accounts.insert(address, account);
    }

    /// Insert-or-fetch with EIP-161 touch semantics: a missing account is
    /// created empty and marked erasable, an existing empty account is
    /// marked erasable.
    pub fn touch(&mut self, address: Address) -> &mut Account {
        let account = self.accounts.entry(address).or_insert_with(|| Account {
            erasable: true,
            ..Default::default()
        });
        if account.is_empty() {
            account.erasable = true;
        }
        account
    }

    pub fn accounts(&self) -> &BTreeMap<Address, Account> {
        &self.accounts
    }

    /// Removes every account marked destructed during execution.
    pub fn remove_destructed(&mut self) {
        self.accounts.retain(|_, account| !account.destructed);
    }

    /// Removes every touched account that ended up empty (EIP-161 reaping).
    pub fn remove_erasable_empty(&mut self) {
        self.accounts
            .retain(|_, account| !(account.erasable && account.is_empty()));
    }

    /// Resets the transaction-scoped lifecycle flags and re-bases storage
    /// originals. Runs at the start of every transition so nothing leaks
    /// across transactions reusing a pre-state.
    pub fn clear_transient_flags(&mut self) {
        for account in self.accounts.values_mut() {
            account.destructed = false;
            account.erasable = false;
            account.access_status = AccessStatus::Cold;
            for value in account.storage.values_mut() {
                value.access_status = AccessStatus::Cold;
                value.original = value.current;
            }
        }
    }

    /// Root of the state trie over all accounts.
    pub fn state_root(&self) -> H256 {
        compute_state_root(&self.accounts)
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<Address, Account> {
        self.accounts.clone()
    }

    pub(crate) fn restore(&mut self, snapshot: BTreeMap<Address, Account>) {
        self.accounts = snapshot;
    }
}

impl FromIterator<(Address, Account)> for State {
    fn from_iter<T: IntoIterator<Item = (Address, Account)>>(iter: T) -> Self {
        Self {
            accounts: iter.into_iter().collect(),
        }
    }
}
