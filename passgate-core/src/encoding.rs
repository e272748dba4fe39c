use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

/// Base64url encode bytes without padding.
pub fn base64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Base64url decode, tolerating trailing `=` padding some clients emit.
pub fn base64url_decode(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(value.trim_end_matches('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_accepts_padding() {
        assert_eq!(base64url_decode("YWI=").unwrap(), b"ab");
        assert_eq!(base64url_decode("YWI").unwrap(), b"ab");
    }

    #[test]
    fn test_decode_rejects_standard_alphabet() {
        assert!(base64url_decode("+/+/").is_err());
    }
}
