use crate::client::ChainClient;
use crate::error::AdminError;
use crate::tx::{DispatchOutcome, DispatchStrategy, TxBatch};
use crate::types::Address;

/// The multisig account holding administrative capabilities after the
/// migration away from the single-key admin.
/// Hex form: 0x1226a80ef40bd2e70c6a285b045b9b5d29915a2c5a2d57a2d3032cbdd89a8d5c
pub const MULTI_SIG_ADDRESS: Address = Address::new([
    0x12, 0x26, 0xa8, 0x0e, 0xf4, 0x0b, 0xd2, 0xe7, 0x0c, 0x6a, 0x28, 0x5b, 0x04, 0x5b, 0x9b,
    0x5d, 0x29, 0x91, 0x5a, 0x2c, 0x5a, 0x2d, 0x57, 0xa2, 0xd3, 0x03, 0x2c, 0xbd, 0xd8, 0x9a,
    0x8d, 0x5c,
]);

/// Encode a batch for out-of-band signature collection by the multisig
/// signers. The batch leaves here unsigned, with the multisig account
/// declared as sender.
pub fn build_multisig_tx(
    batch: &mut TxBatch,
    client: &dyn ChainClient,
) -> Result<String, AdminError> {
    match batch.dispatch(DispatchStrategy::External(MULTI_SIG_ADDRESS), client)? {
        DispatchOutcome::Encoded(b64) => Ok(b64),
        DispatchOutcome::Executed(_) => unreachable!("external dispatch always encodes"),
    }
}
