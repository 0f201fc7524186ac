//! Key encoding for the `RocksDB` backend.

/// Create an inventory key from an account name.
///
/// Names are stored verbatim; the inventory is keyed case-sensitively.
#[must_use]
pub fn account_key(account_name: &str) -> Vec<u8> {
    account_name.as_bytes().to_vec()
}
