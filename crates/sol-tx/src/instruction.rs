//! Instructions as callers describe them, before compilation into a message.

use crate::address::Address;

/// A single account reference within an instruction.
///
/// The same address may appear in several instructions with different flags;
/// the message compiler merges them with a logical OR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: false,
        }
    }
}

/// A single on-chain call: program, ordered account references, and opaque
/// instruction data. Account order is significant and preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

impl Instruction {
    pub fn new(program: Address, accounts: Vec<AccountMeta>, data: Vec<u8>) -> Self {
        Self {
            program,
            accounts,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_meta_constructors() {
        let addr = Address::new([1u8; 32]);

        let w = AccountMeta::writable(addr, true);
        assert!(w.is_signer);
        assert!(w.is_writable);

        let r = AccountMeta::readonly(addr, false);
        assert!(!r.is_signer);
        assert!(!r.is_writable);
    }

    #[test]
    fn instruction_preserves_account_order() {
        let program = Address::new([9u8; 32]);
        let a = Address::new([1u8; 32]);
        let b = Address::new([2u8; 32]);

        let ix = Instruction::new(
            program,
            vec![
                AccountMeta::writable(b, false),
                AccountMeta::readonly(a, true),
            ],
            vec![0xde, 0xad],
        );

        assert_eq!(ix.accounts[0].address, b);
        assert_eq!(ix.accounts[1].address, a);
        assert_eq!(ix.data, vec![0xde, 0xad]);
    }
}
