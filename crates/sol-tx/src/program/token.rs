//! SPL Token instruction builders and associated token account derivation.
//!
//! Data layouts follow the token program's instruction enum: a single-byte
//! instruction index, then a u64 LE amount where one applies, then a u8
//! decimals for the checked variants. Optional authorities are packed
//! fixed-width as a one-byte flag plus 32 key bytes.
//!
//! Owner accounts support multisig: with an empty `signers` list the owner
//! itself signs; otherwise the owner is a read-only non-signer and each
//! listed signer is a read-only signer.

use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::TxError;
use crate::instruction::{AccountMeta, Instruction};

/// SPL Token Program: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Address = Address::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
]);

/// Associated Token Account Program: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Address = Address::new([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
]);

/// Rent sysvar: `SysvarRent111111111111111111111111111111111`. The
/// initialize instructions read it to check rent exemption.
pub const RENT_SYSVAR_ID: Address = Address::new([
    0x06, 0xa7, 0xd5, 0x17, 0x19, 0x2c, 0x5c, 0x51, 0x21, 0x8c, 0xc9, 0x4c, 0x3d, 0x4a, 0xf1,
    0x7f, 0x58, 0xda, 0xee, 0x08, 0x9b, 0xa1, 0xfd, 0x44, 0xe3, 0xdb, 0xd9, 0x8a, 0x00, 0x00,
    0x00, 0x00,
]);

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// A multisig account holds at most this many signer keys.
const MAX_MULTISIG_SIGNERS: usize = 11;

/// Instruction indices from the token program's instruction enum.
#[derive(Clone, Copy)]
#[repr(u8)]
enum TokenInstruction {
    InitializeMint = 0,
    InitializeAccount = 1,
    InitializeMultisig = 2,
    Transfer = 3,
    Approve = 4,
    Revoke = 5,
    SetAuthority = 6,
    MintTo = 7,
    Burn = 8,
    CloseAccount = 9,
    FreezeAccount = 10,
    ThawAccount = 11,
    TransferChecked = 12,
}

/// Which authority of a mint or token account a `SetAuthority` replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuthorityType {
    MintTokens = 0,
    FreezeAccount = 1,
    AccountOwner = 2,
    CloseAccount = 3,
}

fn amount_data(index: TokenInstruction, amount: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(9);
    data.push(index as u8);
    data.extend_from_slice(&amount.to_le_bytes());
    data
}

fn require_nonzero(amount: u64) -> Result<(), TxError> {
    if amount == 0 {
        return Err(TxError::InstructionBuildError(
            "token amount must be > 0".into(),
        ));
    }
    Ok(())
}

/// Push the owner (or multisig owner + signer set) onto an account list.
fn push_owner(accounts: &mut Vec<AccountMeta>, owner: Address, signers: &[Address]) {
    if signers.is_empty() {
        accounts.push(AccountMeta::readonly(owner, true));
    } else {
        accounts.push(AccountMeta::readonly(owner, false));
        for signer in signers {
            accounts.push(AccountMeta::readonly(*signer, true));
        }
    }
}

/// Append an optional authority as a one-byte flag plus a fixed 32-byte
/// key, zeroed when absent. The layout is fixed-width either way.
fn push_optional_authority(data: &mut Vec<u8>, authority: Option<&Address>) {
    match authority {
        Some(address) => {
            data.push(1);
            data.extend_from_slice(address.as_bytes());
        }
        None => {
            data.push(0);
            data.extend_from_slice(&[0u8; 32]);
        }
    }
}

/// Initialize a newly created mint account.
///
/// Requires no signers, but must ride in the same transaction as the
/// System Program account creation, or another party can claim the
/// uninitialized account.
pub fn initialize_mint(
    mint: Address,
    decimals: u8,
    mint_authority: Address,
    freeze_authority: Option<Address>,
) -> Instruction {
    let mut data = Vec::with_capacity(67);
    data.push(TokenInstruction::InitializeMint as u8);
    data.push(decimals);
    data.extend_from_slice(mint_authority.as_bytes());
    push_optional_authority(&mut data, freeze_authority.as_ref());

    Instruction::new(
        TOKEN_PROGRAM_ID,
        vec![
            AccountMeta::writable(mint, false),
            AccountMeta::readonly(RENT_SYSVAR_ID, false),
        ],
        data,
    )
}

/// Initialize a newly created account to hold tokens of `mint`, owned by
/// `owner`. Same transaction-ordering caveat as [`initialize_mint`].
pub fn initialize_account(account: Address, mint: Address, owner: Address) -> Instruction {
    Instruction::new(
        TOKEN_PROGRAM_ID,
        vec![
            AccountMeta::writable(account, false),
            AccountMeta::readonly(mint, false),
            AccountMeta::readonly(owner, false),
            AccountMeta::readonly(RENT_SYSVAR_ID, false),
        ],
        vec![TokenInstruction::InitializeAccount as u8],
    )
}

/// Initialize a multisig account requiring `m` of the listed signers.
pub fn initialize_multisig(
    multisig: Address,
    signers: &[Address],
    m: u8,
) -> Result<Instruction, TxError> {
    if signers.is_empty() || signers.len() > MAX_MULTISIG_SIGNERS {
        return Err(TxError::InstructionBuildError(format!(
            "multisig takes 1..={MAX_MULTISIG_SIGNERS} signer keys, got {}",
            signers.len()
        )));
    }
    if m == 0 || m as usize > signers.len() {
        return Err(TxError::InstructionBuildError(format!(
            "required signer count {m} outside 1..={}",
            signers.len()
        )));
    }

    let mut accounts = vec![
        AccountMeta::writable(multisig, false),
        AccountMeta::readonly(RENT_SYSVAR_ID, false),
    ];
    for signer in signers {
        accounts.push(AccountMeta::readonly(*signer, false));
    }

    Ok(Instruction::new(
        TOKEN_PROGRAM_ID,
        accounts,
        vec![TokenInstruction::InitializeMultisig as u8, m],
    ))
}

/// Replace (or clear, with `None`) one of the authorities of a mint or
/// token account.
pub fn set_authority(
    account: Address,
    current_authority: Address,
    authority_type: AuthorityType,
    new_authority: Option<Address>,
    signers: &[Address],
) -> Instruction {
    let mut data = Vec::with_capacity(35);
    data.push(TokenInstruction::SetAuthority as u8);
    data.push(authority_type as u8);
    push_optional_authority(&mut data, new_authority.as_ref());

    let mut accounts = vec![AccountMeta::writable(account, false)];
    push_owner(&mut accounts, current_authority, signers);

    Instruction::new(TOKEN_PROGRAM_ID, accounts, data)
}

fn freeze_or_thaw(
    index: TokenInstruction,
    account: Address,
    mint: Address,
    freeze_authority: Address,
    signers: &[Address],
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::writable(account, false),
        AccountMeta::readonly(mint, false),
    ];
    push_owner(&mut accounts, freeze_authority, signers);

    Instruction::new(TOKEN_PROGRAM_ID, accounts, vec![index as u8])
}

/// Freeze `account` using the mint's freeze authority.
pub fn freeze_account(
    account: Address,
    mint: Address,
    freeze_authority: Address,
    signers: &[Address],
) -> Instruction {
    freeze_or_thaw(
        TokenInstruction::FreezeAccount,
        account,
        mint,
        freeze_authority,
        signers,
    )
}

/// Thaw a frozen `account` using the mint's freeze authority.
pub fn thaw_account(
    account: Address,
    mint: Address,
    freeze_authority: Address,
    signers: &[Address],
) -> Instruction {
    freeze_or_thaw(
        TokenInstruction::ThawAccount,
        account,
        mint,
        freeze_authority,
        signers,
    )
}

/// Transfer `amount` base units between token accounts.
pub fn transfer(
    source: Address,
    destination: Address,
    owner: Address,
    signers: &[Address],
    amount: u64,
) -> Result<Instruction, TxError> {
    require_nonzero(amount)?;

    let mut accounts = vec![
        AccountMeta::writable(source, false),
        AccountMeta::writable(destination, false),
    ];
    push_owner(&mut accounts, owner, signers);

    Ok(Instruction::new(
        TOKEN_PROGRAM_ID,
        accounts,
        amount_data(TokenInstruction::Transfer, amount),
    ))
}

/// Transfer with on-chain decimals validation against the mint.
pub fn transfer_checked(
    source: Address,
    mint: Address,
    destination: Address,
    owner: Address,
    signers: &[Address],
    amount: u64,
    decimals: u8,
) -> Result<Instruction, TxError> {
    require_nonzero(amount)?;

    let mut data = amount_data(TokenInstruction::TransferChecked, amount);
    data.push(decimals);

    let mut accounts = vec![
        AccountMeta::writable(source, false),
        AccountMeta::readonly(mint, false),
        AccountMeta::writable(destination, false),
    ];
    push_owner(&mut accounts, owner, signers);

    Ok(Instruction::new(TOKEN_PROGRAM_ID, accounts, data))
}

/// Approve a delegate to spend up to `amount` from `source`.
pub fn approve(
    source: Address,
    delegate: Address,
    owner: Address,
    signers: &[Address],
    amount: u64,
) -> Result<Instruction, TxError> {
    require_nonzero(amount)?;

    let mut accounts = vec![
        AccountMeta::writable(source, false),
        AccountMeta::readonly(delegate, false),
    ];
    push_owner(&mut accounts, owner, signers);

    Ok(Instruction::new(
        TOKEN_PROGRAM_ID,
        accounts,
        amount_data(TokenInstruction::Approve, amount),
    ))
}

/// Revoke a previously approved delegate.
pub fn revoke(source: Address, owner: Address, signers: &[Address]) -> Instruction {
    let mut accounts = vec![AccountMeta::writable(source, false)];
    push_owner(&mut accounts, owner, signers);

    Instruction::new(
        TOKEN_PROGRAM_ID,
        accounts,
        vec![TokenInstruction::Revoke as u8],
    )
}

/// Mint `amount` new base units to `destination`.
pub fn mint_to(
    mint: Address,
    destination: Address,
    mint_authority: Address,
    signers: &[Address],
    amount: u64,
) -> Result<Instruction, TxError> {
    require_nonzero(amount)?;

    let mut accounts = vec![
        AccountMeta::writable(mint, false),
        AccountMeta::writable(destination, false),
    ];
    push_owner(&mut accounts, mint_authority, signers);

    Ok(Instruction::new(
        TOKEN_PROGRAM_ID,
        accounts,
        amount_data(TokenInstruction::MintTo, amount),
    ))
}

/// Burn `amount` base units from `account`.
pub fn burn(
    account: Address,
    mint: Address,
    owner: Address,
    signers: &[Address],
    amount: u64,
) -> Result<Instruction, TxError> {
    require_nonzero(amount)?;

    let mut accounts = vec![
        AccountMeta::writable(account, false),
        AccountMeta::writable(mint, false),
    ];
    push_owner(&mut accounts, owner, signers);

    Ok(Instruction::new(
        TOKEN_PROGRAM_ID,
        accounts,
        amount_data(TokenInstruction::Burn, amount),
    ))
}

/// Close `account`, sending its remaining lamports to `destination`.
pub fn close_account(
    account: Address,
    destination: Address,
    owner: Address,
    signers: &[Address],
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::writable(account, false),
        AccountMeta::writable(destination, false),
    ];
    push_owner(&mut accounts, owner, signers);

    Instruction::new(
        TOKEN_PROGRAM_ID,
        accounts,
        vec![TokenInstruction::CloseAccount as u8],
    )
}

/// Derive the associated token account for a wallet + mint pair.
///
/// The ATA is a program derived address with seeds
/// `[wallet, token_program_id, mint]` under the ATA program.
pub fn derive_associated_token_address(
    wallet: &Address,
    mint: &Address,
) -> Result<Address, TxError> {
    find_program_address(
        &[
            wallet.as_ref(),
            TOKEN_PROGRAM_ID.as_ref(),
            mint.as_ref(),
        ],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Find a valid program derived address for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0, computing
/// `SHA-256(seed_0 || ... || bump || program_id || "ProgramDerivedAddress")`
/// and returning the first digest that is NOT a valid Ed25519 point.
pub fn find_program_address(
    seeds: &[&[u8]],
    program: &Address,
) -> Result<(Address, u8), TxError> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, &[bump], program) {
            return Ok((address, bump));
        }
    }

    Err(TxError::InvalidAddress(
        "could not find valid PDA bump seed".into(),
    ))
}

/// Returns `Some(address)` if the derived point is OFF the Ed25519 curve,
/// `None` if it falls on the curve (invalid PDA, try the next bump).
fn try_create_program_address(
    seeds: &[&[u8]],
    bump_seed: &[u8],
    program: &Address,
) -> Option<Address> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program.as_bytes());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(Address::new(hash))
}

/// Whether 32 bytes decompress to a valid Ed25519 curve point.
fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}
