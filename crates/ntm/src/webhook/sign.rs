// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HMAC-SHA256 payload signing.

use std::fmt::Write;

use ring::hmac;

/// Signature header value for `payload`: `sha256=<lowercase hex>`.
///
/// The MAC covers the exact bytes that go on the wire, template or not.
pub fn signature_header(secret: &str, payload: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, payload);
    let mut out = String::with_capacity(7 + tag.as_ref().len() * 2);
    out.push_str("sha256=");
    for byte in tag.as_ref() {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
#[path = "sign_tests.rs"]
mod tests;
