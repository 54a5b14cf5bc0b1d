//! Shared test utilities for orchestrator and session integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use common::orchestrator::{BannerDurations, Orchestrator, State};
use common::testkit::{EventLog, MemoryLedger, MemoryStore, MockWallet};
use common::wallet::{MemorySessionStore, WalletSession, WalletSessionAdapter};
use tokio::sync::watch;

pub const ALICE: &str = "0x1111111111111111111111111111111111111111";
pub const BOB: &str = "0x2222222222222222222222222222222222222222";

pub struct TestEnv {
    pub orchestrator: Arc<Orchestrator>,
    pub wallet: MockWallet,
    pub ledger: MemoryLedger,
    pub store: MemoryStore,
    pub storage: MemorySessionStore,
    pub events: EventLog,
}

/// Orchestrator over in-memory adapters with ALICE already connected
pub async fn setup_test_env() -> TestEnv {
    setup_with(true, true).await
}

pub async fn setup_with(connected: bool, with_ledger: bool) -> TestEnv {
    let events = EventLog::default();
    let wallet = MockWallet::new([ALICE]);
    let ledger = MemoryLedger::new(events.clone());
    let store = MemoryStore::new(events.clone());
    let storage = MemorySessionStore::new();

    let adapter = WalletSessionAdapter::init(Some(Arc::new(wallet.clone())), Arc::new(storage.clone())).await;
    if connected {
        adapter.connect().await.unwrap();
    }

    let ledger_handle: Option<Arc<dyn common::ledger::Ledger>> = if with_ledger {
        Some(Arc::new(ledger.clone()))
    } else {
        None
    };
    let orchestrator = Orchestrator::new(Arc::new(adapter), ledger_handle, Arc::new(store.clone()))
        .with_banners(BannerDurations::default());

    TestEnv {
        orchestrator: Arc::new(orchestrator),
        wallet,
        ledger,
        store,
        storage,
        events,
    }
}

pub fn connected(address: &str) -> WalletSession {
    WalletSession::connected(address).unwrap()
}

/// Wait until the state satisfies `predicate`, or panic after `limit`
pub async fn wait_for_state(
    rx: &mut watch::Receiver<State>,
    limit: Duration,
    predicate: impl Fn(&State) -> bool,
) -> State {
    tokio::time::timeout(limit, rx.wait_for(|s| predicate(s)))
        .await
        .expect("timed out waiting for state")
        .expect("state channel closed")
        .clone()
}
