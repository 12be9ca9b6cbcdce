use alloy::primitives::Address;
use alloy::rpc::types::Log;

use crate::abi::ERC20;
use crate::types::TransferEvent;

/// Zero address, the counterparty of mints and burns.
pub const ZERO_ADDRESS: Address = Address::ZERO;

/// Attempt to decode a log as an ERC-20 `Transfer` event.
///
/// Pending logs (no block number or transaction hash yet) are skipped, as are
/// ERC-721 transfers whose token id sits in a fourth topic.
pub fn decode_transfer_log(log: &Log) -> Option<TransferEvent> {
    let block_number = log.block_number?;
    let transaction_hash = log.transaction_hash?;

    let decoded = log.log_decode::<ERC20::Transfer>().ok()?;
    let d = decoded.inner.data;

    Some(TransferEvent {
        contract: log.address(),
        from: d.from,
        to: d.to,
        value: d.value,
        block_number,
        transaction_hash,
    })
}
