//! Tests for [`SignatureVerifier`] and [`sign`].

use super::*;

const GOLDEN_SECRET: &str = "test_webhook_secret_value";
const GOLDEN_BODY: &[u8] =
    br#"{"repository":{"full_name":"me/repo"},"ref":"refs/heads/main","commits":[]}"#;
const GOLDEN_SIGNATURE: &str =
    "sha256=8aee2013b14d786a366440c4e3011562547fb2fdba5062152720ca0bfdffa51a";

fn verifier(secret: &str) -> SignatureVerifier {
    SignatureVerifier::new(WebhookSecret::new(secret))
}

#[test]
fn test_sign_matches_golden_fixture() {
    let signature = sign(&WebhookSecret::new(GOLDEN_SECRET), GOLDEN_BODY);

    assert_eq!(signature, GOLDEN_SIGNATURE);
}

#[test]
fn test_golden_signature_verifies() {
    assert!(verifier(GOLDEN_SECRET).verify(GOLDEN_BODY, Some(GOLDEN_SIGNATURE)));
}

#[test]
fn test_signature_for_known_vector() {
    let signature = sign(&WebhookSecret::new("my-test-secret"), b"hello world");

    assert_eq!(
        signature,
        "sha256=83ee27b630be096c247a87134d53fb69ce5ebcd2cda2f03664982d09b0f8614b"
    );
}

#[test]
fn test_any_single_bit_flip_in_body_is_rejected() {
    let verifier = verifier(GOLDEN_SECRET);

    for byte in 0..GOLDEN_BODY.len() {
        for bit in 0..8 {
            let mut tampered = GOLDEN_BODY.to_vec();
            tampered[byte] ^= 1 << bit;
            assert!(
                !verifier.verify(&tampered, Some(GOLDEN_SIGNATURE)),
                "flipping bit {} of byte {} should invalidate the signature",
                bit,
                byte
            );
        }
    }
}

#[test]
fn test_signature_from_different_secret_rejected() {
    let signature = sign(&WebhookSecret::new("some-other-secret"), GOLDEN_BODY);

    assert!(!verifier(GOLDEN_SECRET).verify(GOLDEN_BODY, Some(&signature)));
}

#[test]
fn test_header_without_prefix_rejected() {
    let bare_hex = GOLDEN_SIGNATURE.strip_prefix(SIGNATURE_PREFIX).unwrap();

    assert!(!verifier(GOLDEN_SECRET).verify(GOLDEN_BODY, Some(bare_hex)));
}

#[test]
fn test_header_with_other_algorithm_prefix_rejected() {
    let sha1_style = GOLDEN_SIGNATURE.replacen("sha256=", "sha1=", 1);

    assert!(!verifier(GOLDEN_SECRET).verify(GOLDEN_BODY, Some(&sha1_style)));
}

#[test]
fn test_absent_header_rejected() {
    assert!(!verifier(GOLDEN_SECRET).verify(GOLDEN_BODY, None));
}

#[test]
fn test_empty_header_rejected() {
    assert!(!verifier(GOLDEN_SECRET).verify(GOLDEN_BODY, Some("")));
}

#[test]
fn test_prefix_only_header_rejected() {
    assert!(!verifier(GOLDEN_SECRET).verify(GOLDEN_BODY, Some("sha256=")));
}

#[test]
fn test_empty_secret_rejects_even_matching_signature() {
    let empty = WebhookSecret::new("");
    let signature = sign(&empty, GOLDEN_BODY);

    assert!(!SignatureVerifier::new(empty).verify(GOLDEN_BODY, Some(&signature)));
}

#[test]
fn test_uppercase_hex_digest_rejected() {
    let upper = format!(
        "sha256={}",
        GOLDEN_SIGNATURE
            .strip_prefix(SIGNATURE_PREFIX)
            .unwrap()
            .to_uppercase()
    );

    assert!(!verifier(GOLDEN_SECRET).verify(GOLDEN_BODY, Some(&upper)));
}

#[test]
fn test_empty_body_signs_and_verifies() {
    let secret = WebhookSecret::new("empty-payload-secret");
    let signature = sign(&secret, b"");

    assert!(SignatureVerifier::new(secret).verify(b"", Some(&signature)));
}

#[test]
fn test_reformatted_json_body_rejected() {
    // Same JSON document, different bytes.
    let reformatted =
        br#"{"repository": {"full_name": "me/repo"}, "ref": "refs/heads/main", "commits": []}"#;

    assert!(!verifier(GOLDEN_SECRET).verify(reformatted, Some(GOLDEN_SIGNATURE)));
}
