//! Pool sizing from the environment.
//!
//! These tests modify process environment variables and are serialised with
//! `serial_test`.

use serial_test::serial;
use server::db::get_max_connections;

const VAR: &str = "PJ_PG_MAX_CONNECTIONS";

fn with_env<F: FnOnce()>(value: Option<&str>, f: F) {
    let original = std::env::var(VAR).ok();
    // SAFETY: every test touching this variable is #[serial].
    unsafe {
        match value {
            Some(v) => std::env::set_var(VAR, v),
            None => std::env::remove_var(VAR),
        }
    }
    f();
    // SAFETY: as above.
    unsafe {
        match original {
            Some(v) => std::env::set_var(VAR, v),
            None => std::env::remove_var(VAR),
        }
    }
}

#[test]
#[serial]
fn test_pool_respects_env_var() {
    with_env(Some("25"), || assert_eq!(get_max_connections(), 25));
}

#[test]
#[serial]
fn test_pool_default_when_unset() {
    with_env(None, || assert_eq!(get_max_connections(), 20));
}

#[test]
#[serial]
fn test_pool_default_on_garbage_or_zero() {
    with_env(Some("lots"), || assert_eq!(get_max_connections(), 20));
    with_env(Some("0"), || assert_eq!(get_max_connections(), 20));
}
