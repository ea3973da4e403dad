use bytes::Bytes;
use ethereum_types::{Address, Bloom, BloomInput, H256};
use zond_rust_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use zond_rust_trie::Trie;

use super::TxType;

/// Outcome of a transaction as recorded in its receipt.
/// Only success is visible on the wire; the revert/failure split is kept for
/// callers inspecting the result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Revert,
    #[default]
    Failure,
}

impl TxStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TxStatus::Success)
    }
}

/// Result of a transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_type: TxType,
    pub status: TxStatus,
    pub gas_used: u64,
    pub logs: Vec<Log>,
    pub bloom: Bloom,
}

impl Receipt {
    pub fn new(tx_type: TxType, status: TxStatus, gas_used: u64, logs: Vec<Log>) -> Self {
        Self {
            tx_type,
            status,
            gas_used,
            bloom: bloom_from_logs(&logs),
            logs,
        }
    }
}

/// 2048-bit log bloom over the address and every topic of each log.
pub fn bloom_from_logs(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::zero();
    for log in logs {
        bloom.accrue(BloomInput::Raw(log.address.as_ref()));
        for topic in log.topics.iter() {
            bloom.accrue(BloomInput::Raw(topic.as_ref()));
        }
    }
    bloom
}

impl RLPEncode for Receipt {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        // tx_type || RLP([status, gas_used, bloom, logs])
        buf.put_u8(self.tx_type as u8);
        Encoder::new(buf)
            .encode_field(&self.status.is_success())
            .encode_field(&self.gas_used)
            .encode_field(&self.bloom)
            .encode_field(&self.logs)
            .finish();
    }
}

impl RLPDecode for Receipt {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (tx_type, rlp) = TxType::decode_prefix(rlp)?;
        let decoder = Decoder::new(rlp)?;
        let (succeeded, decoder): (bool, _) = decoder.decode_field("status")?;
        let (gas_used, decoder) = decoder.decode_field("gas_used")?;
        let (bloom, decoder) = decoder.decode_field("bloom")?;
        let (logs, decoder) = decoder.decode_field("logs")?;
        let receipt = Receipt {
            tx_type,
            // The wire format only keeps the success bit.
            status: if succeeded {
                TxStatus::Success
            } else {
                TxStatus::Failure
            },
            gas_used,
            bloom,
            logs,
        };
        Ok((receipt, decoder.finish()?))
    }
}

/// Data record produced during the execution of a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

impl RLPEncode for Log {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.topics)
            .encode_field(&self.data)
            .finish();
    }
}

impl RLPDecode for Log {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (topics, decoder) = decoder.decode_field("topics")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let log = Log {
            address,
            topics,
            data,
        };
        Ok((log, decoder.finish()?))
    }
}

/// Computes the receipts trie root: key RLP(index), value the canonical
/// receipt encoding.
pub fn compute_receipts_root(receipts: &[Receipt]) -> H256 {
    let iter = receipts
        .iter()
        .enumerate()
        .map(|(idx, receipt)| (idx.encode_to_vec(), receipt.encode_to_vec()));
    Trie::compute_hash_from_unsorted_iter(iter)
}
