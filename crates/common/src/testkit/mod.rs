/// In-memory adapters for exercising the orchestrator without a network.
///
/// The ledger and store share an [`EventLog`], so a test can assert the order
/// in which side effects happened across both.
///
/// # Example
///
/// ```rust,ignore
/// use common::testkit::{EventLog, MemoryLedger, MemoryStore, MockWallet};
///
/// #[tokio::test]
/// async fn test_upload() {
///     let events = EventLog::default();
///     let wallet = MockWallet::new(["0xabc"]);
///     let ledger = MemoryLedger::new(events.clone());
///     let store = MemoryStore::new(events.clone());
///     // build a WalletSessionAdapter and an Orchestrator from these
/// }
/// ```
mod events;
mod ledger;
mod store;
mod wallet;

pub use events::{Event, EventLog};
pub use ledger::MemoryLedger;
pub use store::MemoryStore;
pub use wallet::MockWallet;
