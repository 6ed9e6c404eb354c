use thiserror::Error;

/// Transaction construction and signing errors.
///
/// Every variant here is a caller-side problem: nothing in this crate talks
/// to the network, so none of these are ever worth retrying.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("too many accounts: {0} exceeds the 255-account message limit")]
    TooManyAccounts(usize),

    #[error("instruction build error: {0}")]
    InstructionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_address() {
        let err = TxError::InvalidAddress("bad decode".into());
        assert_eq!(err.to_string(), "invalid address: bad decode");
    }

    #[test]
    fn display_malformed_encoding() {
        let err = TxError::MalformedEncoding("compact-u16 overflow".into());
        assert_eq!(err.to_string(), "malformed encoding: compact-u16 overflow");
    }

    #[test]
    fn display_too_many_accounts() {
        let err = TxError::TooManyAccounts(300);
        assert_eq!(
            err.to_string(),
            "too many accounts: 300 exceeds the 255-account message limit"
        );
    }

    #[test]
    fn display_signing_error() {
        let err = TxError::SigningError("ed25519 failed".into());
        assert_eq!(err.to_string(), "signing error: ed25519 failed");
    }

    #[test]
    fn error_trait_is_implemented() {
        let err: Box<dyn std::error::Error> = Box::new(TxError::InvalidAddress("test".into()));
        assert!(err.to_string().contains("test"));
    }
}
