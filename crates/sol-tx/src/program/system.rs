//! System Program instruction builders.

use crate::address::Address;
use crate::error::TxError;
use crate::instruction::{AccountMeta, Instruction};

/// The System Program address: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: Address = Address::new([0u8; 32]);

/// System Program `Transfer` instruction index (little-endian u32).
const TRANSFER_IX_INDEX: u32 = 2;

/// Build a native transfer of `lamports` from `from` to `to`.
///
/// Instruction data is a u32 LE instruction index followed by a u64 LE
/// lamport amount, 12 bytes total.
pub fn transfer(from: Address, to: Address, lamports: u64) -> Result<Instruction, TxError> {
    if lamports == 0 {
        return Err(TxError::InstructionBuildError(
            "lamports must be > 0".into(),
        ));
    }

    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    Ok(Instruction::new(
        SYSTEM_PROGRAM_ID,
        vec![
            AccountMeta::writable(from, true),
            AccountMeta::writable(to, false),
        ],
        data,
    ))
}
