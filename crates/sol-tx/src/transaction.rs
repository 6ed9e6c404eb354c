//! Transactions: a message plus one signature slot per required signer.
//!
//! Wire layout:
//!
//! ```text
//! num_signatures   compact-u16
//! signatures       64 bytes * num_signatures
//! message          (see message.rs)
//! ```
//!
//! Slots are filled in the order of the message's signer prefix. Partial
//! signing is a supported intermediate state for multi-party transactions:
//! serialize a partially signed transaction, hand it to the next party, and
//! let them fill their slot.

use crate::address::Address;
use crate::compact::{decode_compact_u16, encode_compact_u16};
use crate::error::TxError;
use crate::message::Message;
use crate::signer::{Keypair, Signature, SIGNATURE_LEN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub message: Message,
    /// One slot per required signer, in signer-prefix order. Unsigned slots
    /// hold the all-zero placeholder.
    pub signatures: Vec<Signature>,
}

impl Transaction {
    /// Wrap a compiled message with empty signature slots.
    pub fn new(message: Message) -> Self {
        let slots = message.num_required_signatures();
        Self {
            signatures: vec![Signature::PLACEHOLDER; slots],
            message,
        }
    }

    /// Sign with the given keypairs, leaving other slots untouched.
    ///
    /// Each keypair must correspond to a required signer of the message;
    /// an unknown signer aborts without modifying any slot.
    pub fn partial_sign(&mut self, keypairs: &[&Keypair]) -> Result<(), TxError> {
        let mut slots = Vec::with_capacity(keypairs.len());
        for keypair in keypairs {
            let address = keypair.address();
            let slot = self.message.signer_position(&address).ok_or_else(|| {
                TxError::SigningError(format!("{address} is not a required signer"))
            })?;
            slots.push(slot);
        }

        let message_bytes = self.message.serialize();
        for (keypair, slot) in keypairs.iter().zip(slots) {
            self.signatures[slot] = keypair.sign_message(&message_bytes);
        }
        Ok(())
    }

    /// Sign and require the transaction to end up fully signed.
    pub fn sign(&mut self, keypairs: &[&Keypair]) -> Result<(), TxError> {
        self.partial_sign(keypairs)?;
        if !self.is_fully_signed() {
            return Err(TxError::SigningError(format!(
                "{} signer slot(s) still unsigned",
                self.missing_signers().len()
            )));
        }
        Ok(())
    }

    /// True once every required signer slot holds a real signature.
    pub fn is_fully_signed(&self) -> bool {
        !self.signatures.is_empty() && self.signatures.iter().all(|s| !s.is_placeholder())
    }

    /// Signer addresses whose slots are still empty.
    pub fn missing_signers(&self) -> Vec<Address> {
        self.message
            .signer_addresses()
            .iter()
            .zip(&self.signatures)
            .filter(|(_, sig)| sig.is_placeholder())
            .map(|(addr, _)| *addr)
            .collect()
    }

    /// The transaction id: the fee payer's signature, once present.
    pub fn signature(&self) -> Option<&Signature> {
        self.signatures.first().filter(|s| !s.is_placeholder())
    }

    /// Verify every filled slot against the serialized message bytes.
    pub fn verify_signatures(&self) -> Result<(), TxError> {
        let message_bytes = self.message.serialize();
        for (address, sig) in self.message.signer_addresses().iter().zip(&self.signatures) {
            if sig.is_placeholder() {
                continue;
            }
            if !sig.verify(address, &message_bytes) {
                return Err(TxError::SigningError(format!(
                    "signature for {address} does not verify"
                )));
            }
        }
        Ok(())
    }

    /// Serialize to wire format. Works for partially signed transactions;
    /// submission readiness is checked by the caller via
    /// [`Transaction::is_fully_signed`].
    pub fn serialize(&self) -> Vec<u8> {
        let message_bytes = self.message.serialize();
        let mut wire =
            Vec::with_capacity(3 + self.signatures.len() * SIGNATURE_LEN + message_bytes.len());

        wire.extend_from_slice(&encode_compact_u16(self.signatures.len() as u16));
        for sig in &self.signatures {
            wire.extend_from_slice(sig.as_bytes());
        }
        wire.extend_from_slice(&message_bytes);

        wire
    }

    /// Parse a wire-format transaction, e.g. one built elsewhere that still
    /// needs our signature.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, TxError> {
        let (num_sigs, consumed) = decode_compact_u16(bytes)?;

        let sigs_end = consumed + num_sigs as usize * SIGNATURE_LEN;
        if sigs_end > bytes.len() {
            return Err(TxError::MalformedEncoding(
                "transaction too short for signature slots".into(),
            ));
        }

        let signatures: Vec<Signature> = bytes[consumed..sigs_end]
            .chunks_exact(SIGNATURE_LEN)
            .map(|chunk| {
                let arr: [u8; SIGNATURE_LEN] = chunk
                    .try_into()
                    .map_err(|_| TxError::MalformedEncoding("short signature".into()))?;
                Ok(Signature::new(arr))
            })
            .collect::<Result<_, TxError>>()?;

        let message = Message::deserialize(&bytes[sigs_end..])?;

        if message.num_required_signatures() != signatures.len() {
            return Err(TxError::MalformedEncoding(format!(
                "{} signature slots but message requires {}",
                signatures.len(),
                message.num_required_signatures()
            )));
        }

        Ok(Self {
            message,
            signatures,
        })
    }
}
