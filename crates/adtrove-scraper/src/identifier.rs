use std::fmt::Write as _;

use sha2::{Digest, Sha256};

/// Derives the per-batch identifier for a creative.
///
/// Format is `{sha256(image_ref) as lowercase hex}-{ordinal}`, where
/// `ordinal` is the creative's 1-based position in the collected output.
#[must_use]
pub fn derive_ad_identifier(image_ref: &str, ordinal: usize) -> String {
    let digest = Sha256::digest(image_ref.as_bytes());
    let mut id = String::with_capacity(digest.len() * 2 + 8);
    for byte in digest {
        let _ = write!(id, "{byte:02x}");
    }
    let _ = write!(id, "-{ordinal}");
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_yields_same_identifier() {
        assert_eq!(
            derive_ad_identifier("https://cdn.example.com/a.jpg", 1),
            derive_ad_identifier("https://cdn.example.com/a.jpg", 1)
        );
    }

    #[test]
    fn ordinal_and_image_ref_both_change_the_identifier() {
        let base = derive_ad_identifier("x", 1);
        assert_ne!(base, derive_ad_identifier("x", 2));
        assert_ne!(base, derive_ad_identifier("y", 1));
    }

    #[test]
    fn identifier_is_lowercase_hex_digest_with_ordinal_suffix() {
        // sha256("abc")
        assert_eq!(
            derive_ad_identifier("abc", 3),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad-3"
        );
    }
}
