//! Integration tests for the wallet session lifecycle

mod common;

use std::sync::Arc;

use ::common::error::{Classify, ErrorKind};
use ::common::testkit::MockWallet;
use ::common::wallet::{
    FileSessionStore, MemorySessionStore, SessionChange, SessionStore, WalletError,
    WalletSessionAdapter,
};
use crate::common::{connected, ALICE, BOB};

async fn adapter_with(wallet: &MockWallet, storage: &MemorySessionStore) -> WalletSessionAdapter {
    WalletSessionAdapter::init(Some(Arc::new(wallet.clone())), Arc::new(storage.clone())).await
}

#[tokio::test]
async fn test_connect_persists_session() {
    let wallet = MockWallet::new([ALICE]);
    let storage = MemorySessionStore::new();
    let adapter = adapter_with(&wallet, &storage).await;
    assert!(!adapter.session().is_connected());

    let session = adapter.connect().await.unwrap();
    assert!(session.is_connected());
    assert_eq!(session.address(), ALICE);
    assert_eq!(storage.peek(), Some(connected(ALICE)));
    assert_eq!(adapter.signer().unwrap().address(), ALICE);
}

#[tokio::test]
async fn test_connect_lowercases_address() {
    let wallet = MockWallet::new(["0xABCDEF0000000000000000000000000000000001"]);
    let storage = MemorySessionStore::new();
    let adapter = adapter_with(&wallet, &storage).await;

    let session = adapter.connect().await.unwrap();
    assert_eq!(session.address(), "0xabcdef0000000000000000000000000000000001");
}

#[tokio::test]
async fn test_connect_without_provider() {
    let storage = MemorySessionStore::new();
    let adapter = WalletSessionAdapter::init(None, Arc::new(storage)).await;

    let err = adapter.connect().await.unwrap_err();
    assert!(matches!(err, WalletError::Unavailable));
    assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    assert_eq!(
        err.kind().default_message(),
        "Please install MetaMask or another Web3 wallet!"
    );
    assert!(!adapter.session().is_connected());
}

#[tokio::test]
async fn test_connect_rejected_keeps_session() {
    let wallet = MockWallet::new([ALICE]);
    wallet.set_reject(true);
    let storage = MemorySessionStore::new();
    let adapter = adapter_with(&wallet, &storage).await;

    let err = adapter.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UserRejected);
    assert!(!adapter.session().is_connected());
    assert_eq!(storage.peek(), None);
}

#[tokio::test]
async fn test_connect_with_no_accounts() {
    let wallet = MockWallet::new(Vec::<String>::new());
    let storage = MemorySessionStore::new();
    let adapter = adapter_with(&wallet, &storage).await;

    let err = adapter.connect().await.unwrap_err();
    assert!(matches!(err, WalletError::NoAccounts));
    assert!(!adapter.session().is_connected());
}

#[tokio::test]
async fn test_disconnect_clears_storage() {
    let wallet = MockWallet::new([ALICE]);
    wallet.set_balance(1_000);
    let storage = MemorySessionStore::new();
    let adapter = adapter_with(&wallet, &storage).await;
    adapter.connect().await.unwrap();
    assert_eq!(adapter.refresh_balance().await, Some(1_000));

    adapter.disconnect();
    assert!(!adapter.session().is_connected());
    assert_eq!(adapter.session().address(), "");
    assert!(adapter.signer().is_none());
    assert_eq!(adapter.balance(), None);
    assert_eq!(storage.peek(), None);

    // disconnecting twice is harmless
    adapter.disconnect();
    assert!(!adapter.session().is_connected());
}

#[tokio::test]
async fn test_no_auto_login_without_persisted_session() {
    // the wallet already approved this client, but nothing was persisted
    let wallet = MockWallet::new([ALICE]).approved();
    let storage = MemorySessionStore::new();
    let adapter = adapter_with(&wallet, &storage).await;

    assert!(!adapter.session().is_connected());
    assert_eq!(wallet.requests(), 0);
}

#[tokio::test]
async fn test_restore_persisted_session() {
    let wallet = MockWallet::new([BOB, ALICE]).approved();
    let storage = MemorySessionStore::with_session(connected(ALICE));
    let adapter = adapter_with(&wallet, &storage).await;

    // the persisted account is still approved, so it wins over the first one
    assert_eq!(adapter.session(), connected(ALICE));
    assert_eq!(wallet.requests(), 0);
}

#[tokio::test]
async fn test_restore_falls_back_to_first_account() {
    let wallet = MockWallet::new([BOB]).approved();
    let storage = MemorySessionStore::with_session(connected(ALICE));
    let adapter = adapter_with(&wallet, &storage).await;

    assert_eq!(adapter.session(), connected(BOB));
    assert_eq!(storage.peek(), Some(connected(BOB)));
}

#[tokio::test]
async fn test_restore_without_approval_clears_storage() {
    let wallet = MockWallet::new([ALICE]);
    let storage = MemorySessionStore::with_session(connected(ALICE));
    let adapter = adapter_with(&wallet, &storage).await;

    assert!(!adapter.session().is_connected());
    assert_eq!(storage.peek(), None);
}

#[tokio::test]
async fn test_restore_with_unreachable_provider_keeps_storage() {
    let wallet = MockWallet::new([ALICE]).approved();
    wallet.set_unreachable(true);
    let storage = MemorySessionStore::with_session(connected(ALICE));
    let adapter = adapter_with(&wallet, &storage).await;

    assert!(!adapter.session().is_connected());
    assert_eq!(storage.peek(), Some(connected(ALICE)));
}

#[tokio::test]
async fn test_restore_with_revoked_access_clears_storage() {
    let wallet = MockWallet::new([ALICE]).approved();
    wallet.set_revoked(true);
    let storage = MemorySessionStore::with_session(connected(ALICE));
    let adapter = adapter_with(&wallet, &storage).await;

    assert!(!adapter.session().is_connected());
    assert_eq!(storage.peek(), None);
}

#[tokio::test]
async fn test_account_changes() {
    let wallet = MockWallet::new([ALICE]);
    let storage = MemorySessionStore::new();
    let adapter = adapter_with(&wallet, &storage).await;

    // ignored while disconnected
    assert_eq!(
        adapter.handle_accounts_changed(&[BOB.to_string()]),
        SessionChange::Unchanged
    );
    assert!(!adapter.session().is_connected());

    adapter.connect().await.unwrap();
    assert_eq!(
        adapter.handle_accounts_changed(&[ALICE.to_uppercase().replace("0X", "0x")]),
        SessionChange::Unchanged
    );

    let change = adapter.handle_accounts_changed(&[BOB.to_string()]);
    assert_eq!(
        change,
        SessionChange::Switched {
            from: ALICE.to_string(),
            to: BOB.to_string(),
        }
    );
    assert_eq!(adapter.session(), connected(BOB));
    assert_eq!(storage.peek(), Some(connected(BOB)));

    assert_eq!(adapter.handle_accounts_changed(&[]), SessionChange::Reset);
    assert!(!adapter.session().is_connected());
    assert_eq!(storage.peek(), None);
}

#[tokio::test]
async fn test_session_survives_file_store_reload() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("storage.json");
    let wallet = MockWallet::new([ALICE]);

    let adapter = WalletSessionAdapter::init(
        Some(Arc::new(wallet.clone())),
        Arc::new(FileSessionStore::new(&path)),
    )
    .await;
    adapter.connect().await?;
    drop(adapter);

    let reloaded = WalletSessionAdapter::init(
        Some(Arc::new(wallet.clone())),
        Arc::new(FileSessionStore::new(&path)),
    )
    .await;
    assert_eq!(reloaded.session(), connected(ALICE));

    reloaded.disconnect();
    assert_eq!(FileSessionStore::new(&path).load()?, None);
    Ok(())
}
