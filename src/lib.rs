/// Participants and their roles. Roles gate batch decisions only.
pub mod account;

/// Production batches and the approval gate that authorizes issuance.
pub mod batch;

/// The credit lot state machine.
/// State is modified using events, which are created by handling commands
pub mod lot;

/// Validates raw input into typed mint/transfer/retire commands that later
/// are executed by [`engine`].
pub mod command;

/// The append-only transaction log record and retirement receipts.
pub mod record;

/// Ledger store interface, plus "in memory" implementation.
/// Single source of truth for accounts, batches, lots and the log;
/// mutations are versioned compare-and-swap, paired atomically with their
/// log append.
pub mod store;

/// Issuance, transfer and retirement engines on top of [`store`].
pub mod engine;

/// Out-of-band drift reporting against the external token-supply oracle.
/// Never in the write path.
pub mod reconcile;

/// Ideally, this module should exists on its own crate, as a way to
/// bootstrap core logic. However, I want to use it for integration test
/// so I put it here.
pub mod bin_utils;
