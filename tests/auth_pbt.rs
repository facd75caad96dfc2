//! Property-Based Tests for the stateless JWT layer
//!
//! Tests the following invariants:
//! - Round-Trip: sign_jwt_for_user -> verify_token preserves the identity claims
//! - Tamper-Evidence: changing any single character of a token invalidates it
//! - Expiry parsing: digit+unit strings map to the right millisecond values,
//!   unknown units and non-positive amounts are rejected

use proptest::prelude::*;

use tisa_backend_rust::auth::{parse_expires_in_ms, sign_jwt_for_user, verify_token};

fn arb_claim() -> impl Strategy<Value = String> {
    "[A-Za-z0-9@._-]{1,32}"
}

const TOKEN_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

fn set_test_secret() {
    std::env::set_var("JWT_SECRET", "pbt-secret");
    std::env::set_var("JWT_EXPIRES_IN", "7d");
}

proptest! {
    #[test]
    fn prop_sign_verify_round_trip(
        id in arb_claim(),
        email in arb_claim(),
        role in arb_claim(),
    ) {
        set_test_secret();

        let token = sign_jwt_for_user(&id, &email, &role).unwrap();
        let user = verify_token(&token).unwrap();

        prop_assert_eq!(user.id, id);
        prop_assert_eq!(user.email, email);
        prop_assert_eq!(user.role, role);
    }

    #[test]
    fn prop_tampered_token_rejected(
        id in arb_claim(),
        email in arb_claim(),
        role in arb_claim(),
        position in any::<prop::sample::Index>(),
        replacement in any::<prop::sample::Index>(),
    ) {
        set_test_secret();

        let token = sign_jwt_for_user(&id, &email, &role).unwrap();
        let mut bytes = token.clone().into_bytes();
        let at = position.index(bytes.len());
        let substitute = TOKEN_ALPHABET[replacement.index(TOKEN_ALPHABET.len())];
        prop_assume!(bytes[at] != substitute);
        bytes[at] = substitute;
        let tampered = String::from_utf8(bytes).unwrap();

        prop_assert!(verify_token(&tampered).is_err());
    }

    #[test]
    fn prop_truncated_token_rejected(
        id in arb_claim(),
        email in arb_claim(),
        role in arb_claim(),
        keep in any::<prop::sample::Index>(),
    ) {
        set_test_secret();

        let token = sign_jwt_for_user(&id, &email, &role).unwrap();
        let cut = keep.index(token.len());
        prop_assume!(cut < token.len());

        prop_assert!(verify_token(&token[..cut]).is_err());
    }

    #[test]
    fn prop_expires_in_unit_math(amount in 1i64..=10_000) {
        prop_assert_eq!(parse_expires_in_ms(&format!("{amount}s")).unwrap(), amount * 1000);
        prop_assert_eq!(parse_expires_in_ms(&format!("{amount}m")).unwrap(), amount * 60 * 1000);
        prop_assert_eq!(parse_expires_in_ms(&format!("{amount}h")).unwrap(), amount * 60 * 60 * 1000);
        prop_assert_eq!(parse_expires_in_ms(&format!("{amount}d")).unwrap(), amount * 24 * 60 * 60 * 1000);
    }

    #[test]
    fn prop_expires_in_rejects_unknown_units(
        amount in 1i64..=10_000,
        unit in "[a-ce-gi-ln-rt-z]",
    ) {
        let input = format!("{amount}{unit}");
        prop_assert!(parse_expires_in_ms(&input).is_err());
    }

    #[test]
    fn prop_expires_in_rejects_non_positive(amount in -10_000i64..=0) {
        let input = format!("{amount}d");
        prop_assert!(parse_expires_in_ms(&input).is_err());
    }
}
