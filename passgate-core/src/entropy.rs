//! Random values for challenges and authorization codes.

use ring::rand::{SecureRandom, SystemRandom};

use crate::encoding::base64url_encode;
use crate::error::{PassgateError, Result};

/// Challenge size in bytes (256 bits).
pub const CHALLENGE_BYTES: usize = 32;

/// Authorization code size in bytes (128 bits).
pub const CODE_BYTES: usize = 16;

fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|e| PassgateError::Entropy(e.to_string()))?;
    Ok(buf)
}

/// Fresh ceremony challenge, base64url encoded as it appears in `clientDataJSON`.
pub fn new_challenge() -> Result<String> {
    Ok(base64url_encode(random_bytes::<CHALLENGE_BYTES>()?))
}

/// Fresh authorization code, lowercase hex.
pub fn new_code() -> Result<String> {
    Ok(hex::encode(random_bytes::<CODE_BYTES>()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::base64url_decode;

    #[test]
    fn test_challenge_is_32_bytes() {
        let challenge = new_challenge().unwrap();
        assert_eq!(base64url_decode(&challenge).unwrap().len(), CHALLENGE_BYTES);
    }

    #[test]
    fn test_codes_are_hex_and_distinct() {
        let a = new_code().unwrap();
        let b = new_code().unwrap();
        assert_eq!(a.len(), CODE_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
