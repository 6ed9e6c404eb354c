//! Cross-module integration tests exercising the full construction pipeline:
//! build instructions -> compile message -> sign -> serialize -> verify.

use sol_tx::program::{system, token};
use sol_tx::*;

fn addr(byte: u8) -> Address {
    Address::new([byte; 32])
}

#[test]
fn native_transfer_end_to_end() {
    let payer = Keypair::from_seed(&[0x42u8; 32]);
    let recipient = addr(0xbb);
    let blockhash = Blockhash::new([0xcc; 32]);

    // One instruction: fee payer (signer, writable) and a recipient
    // (non-signer, writable). With the program id that makes 3 accounts,
    // and a header of (1, 0, 1).
    let ix = system::transfer(payer.address(), recipient, 1_000_000).unwrap();
    let msg = Message::compile(payer.address(), &[ix], blockhash).unwrap();

    assert_eq!(msg.account_keys.len(), 3);
    assert_eq!(msg.account_keys[0], payer.address());
    assert_eq!(msg.header.num_required_signatures, 1);
    assert_eq!(msg.header.num_readonly_signed, 0);
    assert_eq!(msg.header.num_readonly_unsigned, 1); // the System Program

    let mut tx = Transaction::new(msg);
    tx.sign(&[&payer]).unwrap();

    let wire = tx.serialize();

    // Wire layout: compact-u16(1), 64-byte signature, message bytes.
    assert_eq!(wire[0], 0x01);
    let sig = Signature::new(wire[1..65].try_into().unwrap());
    assert!(sig.verify(&payer.address(), &wire[65..]));

    // And the whole thing parses back to an identical transaction.
    let parsed = Transaction::deserialize(&wire).unwrap();
    assert_eq!(parsed, tx);
    parsed.verify_signatures().unwrap();
}

#[test]
fn spl_transfer_between_derived_accounts() {
    let owner = Keypair::from_seed(&[0x07u8; 32]);
    let mint = addr(0x33);
    let recipient_wallet = addr(0x44);

    let source = token::derive_associated_token_address(&owner.address(), &mint).unwrap();
    let destination = token::derive_associated_token_address(&recipient_wallet, &mint).unwrap();
    assert_ne!(source, destination);

    let ix = token::transfer(source, destination, owner.address(), &[], 250_000).unwrap();
    let msg = Message::compile(owner.address(), &[ix], Blockhash::new([0x01; 32])).unwrap();

    // Owner pays fees and signs; both token accounts are writable
    // non-signers; token program id is read-only.
    assert_eq!(msg.header.num_required_signatures, 1);
    assert_eq!(msg.header.num_readonly_unsigned, 1);
    assert_eq!(msg.account_keys.len(), 4);

    let mut tx = Transaction::new(msg);
    tx.sign(&[&owner]).unwrap();
    assert!(tx.is_fully_signed());
}

#[test]
fn multi_instruction_message_shares_accounts() {
    let payer = Keypair::from_seed(&[0x10u8; 32]);
    let a = addr(0x51);
    let b = addr(0x52);

    // The same recipient appears in both instructions; it must occupy a
    // single slot in the compiled account list.
    let ix1 = system::transfer(payer.address(), a, 10).unwrap();
    let ix2 = system::transfer(payer.address(), a, 20).unwrap();
    let ix3 = system::transfer(payer.address(), b, 30).unwrap();

    let msg =
        Message::compile(payer.address(), &[ix1, ix2, ix3], Blockhash::new([0; 32])).unwrap();

    // payer, a, b, system program.
    assert_eq!(msg.account_keys.len(), 4);
    assert_eq!(msg.instructions.len(), 3);

    // First two instructions reference identical slots.
    assert_eq!(
        msg.instructions[0].account_indices,
        msg.instructions[1].account_indices
    );
}

#[test]
fn recompiling_yields_identical_bytes() {
    let payer = Keypair::from_seed(&[0x77u8; 32]);
    let ix = system::transfer(payer.address(), addr(0x99), 5).unwrap();
    let blockhash = Blockhash::new([0xee; 32]);

    let first = Message::compile(payer.address(), &[ix.clone()], blockhash).unwrap();
    let second = Message::compile(payer.address(), &[ix], blockhash).unwrap();

    assert_eq!(hex::encode(first.serialize()), hex::encode(second.serialize()));
}

#[test]
fn self_transfer_deduplicates_accounts() {
    let payer = Keypair::from_seed(&[0xaau8; 32]);
    let ix = system::transfer(payer.address(), payer.address(), 100).unwrap();
    let msg = Message::compile(payer.address(), &[ix], Blockhash::new([0; 32])).unwrap();

    // Sender and recipient are the same key: one slot plus the program id.
    assert_eq!(msg.account_keys.len(), 2);
    assert_eq!(msg.header.num_required_signatures, 1);
}
