/// Wallet identity and balance, plus the deposit/withdraw rules.
/// A balance changes only by applying the event returned from handling a command.
pub mod wallet;

/// Validated mutation requests that later are handled by [`wallet`].
pub mod command;

/// Record returned for an applied mutation.
pub mod transaction;

/// Durable wallet storage and the locked "read, mutate, save" primitive,
/// with an in-memory and a Postgres implementation.
pub mod store;

/// Operation entry points. Turns requests into commands, runs them under the
/// store's lock and maps failures onto [`processor::LedgerError`].
pub mod processor;

/// Environment configuration for the binary and store constructors.
pub mod config;

/// CSV batch driver behind the binary. Lives in the library so integration
/// tests can drive it with in-memory input and output.
pub mod bin_utils;
