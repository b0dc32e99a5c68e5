// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::signature_header;

// RFC 4231 test case 2.
#[test]
fn known_vector() {
    let sig = signature_header("Jefe", b"what do ya want for nothing?");
    assert_eq!(
        sig,
        "sha256=5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
    );
}

#[test]
fn format_is_sha256_prefixed_lowercase_hex() {
    let sig = signature_header("secret", b"payload");
    let hex = sig.strip_prefix("sha256=");
    assert!(hex.is_some_and(|h| h.len() == 64
        && h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())));
}

#[test]
fn signature_depends_on_secret_and_payload() {
    let base = signature_header("secret", b"payload");
    assert_ne!(signature_header("other", b"payload"), base);
    assert_ne!(signature_header("secret", b"different"), base);
    assert_eq!(signature_header("secret", b"payload"), base);
}
