/**
 * Filtering and display helpers for the
 *  uploaded files view.
 */
pub mod catalog;
/**
 * User-facing error taxonomy shared by
 *  every adapter.
 */
pub mod error;
/**
 * On-chain file registry. Registers uploads
 *  and downloads, and reads records back.
 */
pub mod ledger;
/**
 * Sequences wallet, ledger and content store
 *  into upload and download flows.
 */
pub mod orchestrator;
/**
 * Minimal JSON-RPC 2.0 client used by the
 *  wallet provider and the ledger.
 */
pub mod rpc;
/**
 * Content-addressed storage behind a pinning
 *  service and a public gateway.
 */
pub mod store;
pub mod tasks;
/**
 * In-memory wallet, ledger and store for
 *  exercising the orchestrator without a
 *  network.
 */
pub mod testkit;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;
/**
 * Wallet session: connect, restore, follow
 *  account changes, persist.
 */
pub mod wallet;

pub mod prelude {
    pub use crate::error::{Classify, ErrorKind};
    pub use crate::ledger::{EvmLedger, EvmLedgerConfig, FileRecord, Ledger, LedgerError};
    pub use crate::orchestrator::{DownloadOutcome, Orchestrator, State, UploadOutcome};
    pub use crate::store::{ContentStore, FileMetadata, LocalFile, PinataConfig, PinataStore};
    pub use crate::tasks::TaskHandle;
    pub use crate::version::build_info;
    pub use crate::wallet::{
        FileSessionStore, RpcWalletProvider, SessionStore, WalletProvider, WalletSession,
        WalletSessionAdapter,
    };
}
