//! Keychain storage for the GitHub access token.
//!
//! Uses the system keychain (macOS Keychain, Linux Secret Service, Windows Credential Manager).

use crate::{Error, ErrorCode, Result};
use keyring::Entry;
use serde_json::Value;

const SERVICE_NAME: &str = "infragen";

fn keyring_error(e: keyring::Error) -> Error {
    Error::new(
        ErrorCode::InternalUnexpected,
        format!("Keychain error: {}", e),
        Value::Null,
    )
}

fn entry(scope: &str, name: &str) -> Result<Entry> {
    Entry::new(SERVICE_NAME, &format!("{}:{}", scope, name)).map_err(keyring_error)
}

/// Stores a secret under `<scope>:<name>`.
pub fn store(scope: &str, name: &str, value: &str) -> Result<()> {
    entry(scope, name)?
        .set_password(value)
        .map_err(keyring_error)
}

/// Returns `None` if the key doesn't exist.
pub fn get(scope: &str, name: &str) -> Result<Option<String>> {
    match entry(scope, name)?.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(keyring_error(e)),
    }
}

/// Removing a key that was never stored is not an error.
pub fn delete(scope: &str, name: &str) -> Result<()> {
    match entry(scope, name)?.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(keyring_error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // On the supported desktop platforms the default credential must come from
    // a real store; keyring's mock backend forgets everything on drop.
    #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
    #[test]
    fn default_backend_is_a_platform_store() {
        let entry = entry("test", "backend").unwrap();
        let mock = entry
            .get_credential()
            .downcast_ref::<keyring::mock::MockCredential>();
        assert!(mock.is_none(), "keyring resolved to the in-memory mock store");
    }

    // Requires a running keychain service; run with: cargo test keychain -- --ignored
    #[test]
    #[ignore]
    fn store_get_delete_round_trip() {
        store("test", "token", "secret_value_123").unwrap();
        assert_eq!(get("test", "token").unwrap(), Some("secret_value_123".to_string()));

        delete("test", "token").unwrap();
        assert_eq!(get("test", "token").unwrap(), None);
    }
}
