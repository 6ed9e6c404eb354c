//! Message compilation and the binary message codec.
//!
//! A message is the signed payload of a transaction. Its wire layout:
//!
//! ```text
//! num_required_sigs     u8
//! num_readonly_signed   u8
//! num_readonly_unsigned u8
//! num_accounts          compact-u16
//! account_keys          32 bytes * num_accounts
//! recent_blockhash      32 bytes
//! num_instructions      compact-u16
//! instructions[]        (program index u8,
//!                        compact-u16 count + u8 account indices,
//!                        compact-u16 len + data bytes)
//! ```
//!
//! The account list is ordered into four partitions: writable signers,
//! read-only signers, writable non-signers, read-only non-signers. Within a
//! partition, first-seen order from the input instruction list is kept.
//! Signature slots and instruction indices both depend on this ordering, so
//! any deviation produces transactions that fail remote verification.

use std::fmt;
use std::str::FromStr;

use crate::address::{Address, ADDRESS_LEN};
use crate::compact::{decode_compact_u16, encode_compact_u16};
use crate::error::TxError;
use crate::instruction::Instruction;

/// Length of a blockhash in bytes.
pub const BLOCKHASH_LEN: usize = 32;

/// Account indices are u8, so a message can reference at most 255 accounts.
pub const MAX_ACCOUNTS: usize = u8::MAX as usize;

/// A recent blockhash: a short-lived network checkpoint bounding transaction
/// validity. Base58 text form, same rules as [`Address`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Blockhash([u8; BLOCKHASH_LEN]);

impl Blockhash {
    pub const fn new(bytes: [u8; BLOCKHASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; BLOCKHASH_LEN] {
        &self.0
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({self})")
    }
}

impl FromStr for Blockhash {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TxError::MalformedEncoding(format!("blockhash decode failed: {e}")))?;

        let arr: [u8; BLOCKHASH_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            TxError::MalformedEncoding(format!(
                "blockhash must be {BLOCKHASH_LEN} bytes, got {}",
                v.len()
            ))
        })?;

        Ok(Self(arr))
    }
}

/// The three leading count bytes of a serialized message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    /// Total signers; the first N accounts must supply signatures.
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,
}

/// An instruction with account references replaced by u8 indices into the
/// message's account list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A compiled, immutable message. Produced once per compilation; changing
/// the instruction set means compiling a new message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Address>,
    pub recent_blockhash: Blockhash,
    pub instructions: Vec<CompiledInstruction>,
}

struct AccountEntry {
    address: Address,
    is_signer: bool,
    is_writable: bool,
}

/// Merge an account reference into the running list, OR-ing flags on
/// duplicates. Linear scan: instruction account lists are tiny.
fn upsert(entries: &mut Vec<AccountEntry>, address: Address, is_signer: bool, is_writable: bool) {
    if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
        entry.is_signer |= is_signer;
        entry.is_writable |= is_writable;
    } else {
        entries.push(AccountEntry {
            address,
            is_signer,
            is_writable,
        });
    }
}

impl Message {
    /// Compile instructions into a canonical message.
    ///
    /// The fee payer is always included first and flagged signer + writable.
    /// An empty instruction list compiles to a valid (if useless) message;
    /// rejecting it is caller policy.
    pub fn compile(
        fee_payer: Address,
        instructions: &[Instruction],
        recent_blockhash: Blockhash,
    ) -> Result<Self, TxError> {
        let mut entries: Vec<AccountEntry> = Vec::new();

        upsert(&mut entries, fee_payer, true, true);

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(&mut entries, meta.address, meta.is_signer, meta.is_writable);
            }
            // Program ids join as non-signer, read-only accounts.
            upsert(&mut entries, ix.program, false, false);
        }

        if entries.len() > MAX_ACCOUNTS {
            return Err(TxError::TooManyAccounts(entries.len()));
        }

        // Partition rank: writable signers, read-only signers, writable
        // non-signers, read-only non-signers. The sort is stable, so
        // first-seen order survives within each partition and the fee payer
        // (inserted first, rank 0) lands at index 0.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        let header = MessageHeader {
            num_required_signatures: entries.iter().filter(|e| e.is_signer).count() as u8,
            num_readonly_signed: entries
                .iter()
                .filter(|e| e.is_signer && !e.is_writable)
                .count() as u8,
            num_readonly_unsigned: entries
                .iter()
                .filter(|e| !e.is_signer && !e.is_writable)
                .count() as u8,
        };

        let account_keys: Vec<Address> = entries.iter().map(|e| e.address).collect();

        let position = |address: &Address| -> Result<u8, TxError> {
            account_keys
                .iter()
                .position(|k| k == address)
                .map(|i| i as u8)
                .ok_or_else(|| {
                    TxError::InstructionBuildError(format!("{address} missing from account list"))
                })
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let program_index = position(&ix.program)?;
            let account_indices = ix
                .accounts
                .iter()
                .map(|meta| position(&meta.address))
                .collect::<Result<Vec<u8>, TxError>>()?;

            compiled.push(CompiledInstruction {
                program_index,
                account_indices,
                data: ix.data.clone(),
            });
        }

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    pub fn num_required_signatures(&self) -> usize {
        self.header.num_required_signatures as usize
    }

    /// The signer prefix of the account list, in signature-slot order.
    pub fn signer_addresses(&self) -> &[Address] {
        &self.account_keys[..self.num_required_signatures()]
    }

    /// Signature slot index for `address`, if it is a required signer.
    pub fn signer_position(&self, address: &Address) -> Option<usize> {
        self.signer_addresses().iter().position(|a| a == address)
    }

    /// Serialize to the exact signed byte layout. Deterministic: the same
    /// message always produces identical bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);

        buf.push(self.header.num_required_signatures);
        buf.push(self.header.num_readonly_signed);
        buf.push(self.header.num_readonly_unsigned);

        buf.extend_from_slice(&encode_compact_u16(self.account_keys.len() as u16));
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(self.recent_blockhash.as_bytes());

        buf.extend_from_slice(&encode_compact_u16(self.instructions.len() as u16));
        for ix in &self.instructions {
            buf.push(ix.program_index);

            buf.extend_from_slice(&encode_compact_u16(ix.account_indices.len() as u16));
            buf.extend_from_slice(&ix.account_indices);

            buf.extend_from_slice(&encode_compact_u16(ix.data.len() as u16));
            buf.extend_from_slice(&ix.data);
        }

        buf
    }

    /// Parse a serialized message, consuming the whole slice.
    ///
    /// Validates header counts against the account list and every
    /// instruction index against the account count, so a parsed message
    /// upholds the same invariants as a compiled one.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, TxError> {
        let mut cursor = 0usize;

        let header_bytes = take(bytes, &mut cursor, 3, "message header")?;
        let header = MessageHeader {
            num_required_signatures: header_bytes[0],
            num_readonly_signed: header_bytes[1],
            num_readonly_unsigned: header_bytes[2],
        };

        let (num_accounts, used) = decode_compact_u16(&bytes[cursor..])?;
        cursor += used;
        let num_accounts = num_accounts as usize;

        if num_accounts > MAX_ACCOUNTS {
            return Err(TxError::TooManyAccounts(num_accounts));
        }
        let signers = header.num_required_signatures as usize;
        if signers > num_accounts
            || header.num_readonly_signed as usize > signers
            || header.num_readonly_unsigned as usize > num_accounts - signers
        {
            return Err(TxError::MalformedEncoding(
                "message header counts exceed account list".into(),
            ));
        }

        let mut account_keys = Vec::with_capacity(num_accounts);
        for _ in 0..num_accounts {
            let key = take(bytes, &mut cursor, ADDRESS_LEN, "account key")?;
            let arr: [u8; ADDRESS_LEN] = key
                .try_into()
                .map_err(|_| TxError::MalformedEncoding("short account key".into()))?;
            account_keys.push(Address::new(arr));
        }

        let hash = take(bytes, &mut cursor, BLOCKHASH_LEN, "recent blockhash")?;
        let hash_arr: [u8; BLOCKHASH_LEN] = hash
            .try_into()
            .map_err(|_| TxError::MalformedEncoding("short blockhash".into()))?;
        let recent_blockhash = Blockhash::new(hash_arr);

        let (num_instructions, used) = decode_compact_u16(&bytes[cursor..])?;
        cursor += used;

        let mut instructions = Vec::with_capacity(num_instructions as usize);
        for _ in 0..num_instructions {
            let program_index = take(bytes, &mut cursor, 1, "program index")?[0];
            if program_index as usize >= num_accounts {
                return Err(TxError::MalformedEncoding(
                    "program index out of range".into(),
                ));
            }

            let (num_indices, used) = decode_compact_u16(&bytes[cursor..])?;
            cursor += used;
            let indices = take(bytes, &mut cursor, num_indices as usize, "account indices")?;
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= num_accounts) {
                return Err(TxError::MalformedEncoding(format!(
                    "account index {bad} out of range"
                )));
            }
            let account_indices = indices.to_vec();

            let (data_len, used) = decode_compact_u16(&bytes[cursor..])?;
            cursor += used;
            let data = take(bytes, &mut cursor, data_len as usize, "instruction data")?.to_vec();

            instructions.push(CompiledInstruction {
                program_index,
                account_indices,
                data,
            });
        }

        if cursor != bytes.len() {
            return Err(TxError::MalformedEncoding(format!(
                "{} trailing bytes after message",
                bytes.len() - cursor
            )));
        }

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }
}

fn take<'a>(
    bytes: &'a [u8],
    cursor: &mut usize,
    n: usize,
    what: &str,
) -> Result<&'a [u8], TxError> {
    let end = cursor
        .checked_add(n)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| TxError::MalformedEncoding(format!("message truncated reading {what}")))?;
    let slice = &bytes[*cursor..end];
    *cursor = end;
    Ok(slice)
}
