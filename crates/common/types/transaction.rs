use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use zond_rust_rlp::{encode::RLPEncode, error::RLPDecodeError, structs::Encoder};
use zond_rust_trie::Trie;

/// Transaction type marker.
/// Zond only carries EIP-1559 dynamic-fee transactions (type 2).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum TxType {
    #[default]
    EIP1559 = 0x02,
}

impl TxType {
    /// Splits the type byte off an encoded transaction or receipt.
    pub fn decode_prefix(rlp: &[u8]) -> Result<(TxType, &[u8]), RLPDecodeError> {
        match rlp.first() {
            Some(0x02) => Ok((TxType::EIP1559, &rlp[1..])),
            Some(ty) if *ty < 0x7f => {
                Err(RLPDecodeError::Custom(format!("wrong transaction type: {ty}")))
            }
            _ => Err(RLPDecodeError::Custom("wrong transaction type".to_string())),
        }
    }
}

/// An address with the storage keys the transaction pre-declares as warm (EIP-2930).
pub type AccessListEntry = (Address, Vec<H256>);

/// A signed EIP-1559 transaction.
/// Signature verification happens upstream; the sender is trusted input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    pub tx_type: TxType,
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_gas_price: U256,
    pub max_gas_price: U256,
    pub gas_limit: i64,
    /// The recipient of the transaction. `None` means contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub access_list: Vec<AccessListEntry>,
    pub sender: Address,
    pub public_key: Bytes,
    pub signature: Bytes,
}

impl Transaction {
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }

    /// Canonical encoding: the type byte followed by the RLP list
    /// [chain_id, nonce, max_priority_gas_price, max_gas_price, gas_limit,
    ///  to, value, data, access_list, public_key, signature].
    pub fn encode_canonical(&self, buf: &mut dyn bytes::BufMut) {
        buf.put_u8(self.tx_type as u8);
        let encoder = Encoder::new(buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.max_priority_gas_price)
            .encode_field(&self.max_gas_price)
            .encode_field(&(self.gas_limit as u64));
        // An absent recipient encodes as the empty string.
        let encoder = match &self.to {
            Some(to) => encoder.encode_field(to),
            None => encoder.encode_bytes(&[]),
        };
        encoder
            .encode_field(&self.value)
            .encode_field(&self.data)
            .encode_field(&self.access_list)
            .encode_field(&self.public_key)
            .encode_field(&self.signature)
            .finish();
    }

    pub fn encode_canonical_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_canonical(&mut buf);
        buf
    }
}

/// Computes the transactions trie root: key RLP(index), value the canonical
/// transaction encoding.
pub fn compute_transactions_root(transactions: &[Transaction]) -> H256 {
    let iter = transactions
        .iter()
        .enumerate()
        .map(|(idx, tx)| (idx.encode_to_vec(), tx.encode_canonical_to_vec()));
    Trie::compute_hash_from_unsorted_iter(iter)
}
