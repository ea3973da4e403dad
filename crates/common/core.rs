pub mod types;

pub use ethereum_types::{Address, Bloom, H256, U256, U512};
