/// Response ledger built on top of the room store.
pub mod ledger;
/// Database model definitions.
pub mod models;
/// Retry policy applied to storage writes.
pub mod retry;
/// Room persistence backends.
pub mod room_store;
/// Storage abstraction layer for database operations.
pub mod storage;
