//! Sequences wallet, ledger and content store into the upload and download
//! flows, and keeps the files view fresh.
//!
//! The ledger entry gates storage: `registerUpload` must be confirmed before
//! any content reaches the store. Every failure ends in a [`State`]; nothing
//! escapes as an error.

mod state;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

pub use state::{
    DownloadOutcome, DownloadStep, Failure, State, UploadOutcome, UploadStep, BUSY_MESSAGE,
    CANCELLED_BANNER, CONNECT_FIRST_MESSAGE, PRECONDITIONS_MESSAGE, SUCCESS_BANNER,
};

use crate::error::Classify;
use crate::ledger::{Ledger, LedgerError, Receipt};
use crate::store::{ContentStore, FileMetadata, LocalFile};
use crate::tasks::TaskHandle;
use crate::wallet::{SessionChange, Signer, WalletSessionAdapter};

/// Default period of the background list refresh
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);
/// Default period of the background balance refresh
pub const BALANCE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct BannerDurations {
    pub success: Duration,
    pub cancelled: Duration,
}

impl Default for BannerDurations {
    fn default() -> Self {
        Self {
            success: SUCCESS_BANNER,
            cancelled: CANCELLED_BANNER,
        }
    }
}

/// State channel plus a generation counter, so a delayed auto-clear never
///  wipes a state that replaced the one it was scheduled for
#[derive(Debug)]
struct StateCell {
    tx: watch::Sender<State>,
    generation: Mutex<u64>,
}

impl StateCell {
    fn new() -> Self {
        Self {
            tx: watch::Sender::new(State::Idle),
            generation: Mutex::new(0),
        }
    }

    fn set(&self, next: State) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        tracing::debug!(state = %next, "transfer state");
        self.tx.send_replace(next);
        *generation
    }

    /// Enter a busy state unless a transfer is already running
    fn begin(&self, next: State) -> bool {
        let mut generation = self.generation.lock();
        if self.tx.borrow().is_busy() {
            return false;
        }
        *generation += 1;
        tracing::debug!(state = %next, "transfer state");
        self.tx.send_replace(next);
        true
    }

    /// Enter `next` unless a transfer is running, applying `commit` under
    ///  the same lock so a concurrent `begin` cannot interleave
    fn select(&self, next: State, commit: impl FnOnce()) -> bool {
        let mut generation = self.generation.lock();
        if self.tx.borrow().is_busy() {
            return false;
        }
        commit();
        *generation += 1;
        tracing::debug!(state = %next, "transfer state");
        self.tx.send_replace(next);
        true
    }

    /// Back to idle, but only from `FileSelected`
    fn deselect(&self, commit: impl FnOnce()) {
        let mut generation = self.generation.lock();
        commit();
        if matches!(*self.tx.borrow(), State::FileSelected { .. }) {
            *generation += 1;
            self.tx.send_replace(State::Idle);
        }
    }

    fn reset_if(&self, expected: u64) {
        let mut generation = self.generation.lock();
        if *generation == expected {
            *generation += 1;
            self.tx.send_replace(State::Idle);
        }
    }

    fn get(&self) -> State {
        self.tx.borrow().clone()
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    wallet: Arc<WalletSessionAdapter>,
    ledger: Option<Arc<dyn Ledger>>,
    store: Arc<dyn ContentStore>,
    state: Arc<StateCell>,
    files: watch::Sender<Vec<FileMetadata>>,
    selected: Mutex<Option<LocalFile>>,
    banners: BannerDurations,
}

impl Orchestrator {
    /// `ledger` is optional; without one uploads go straight to the store
    pub fn new(
        wallet: Arc<WalletSessionAdapter>,
        ledger: Option<Arc<dyn Ledger>>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            wallet,
            ledger,
            store,
            state: Arc::new(StateCell::new()),
            files: watch::Sender::new(Vec::new()),
            selected: Mutex::new(None),
            banners: BannerDurations::default(),
        }
    }

    pub fn with_banners(mut self, banners: BannerDurations) -> Self {
        self.banners = banners;
        self
    }

    pub fn wallet(&self) -> &Arc<WalletSessionAdapter> {
        &self.wallet
    }

    pub fn ledger(&self) -> Option<&Arc<dyn Ledger>> {
        self.ledger.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn state(&self) -> State {
        self.state.get()
    }

    pub fn watch_state(&self) -> watch::Receiver<State> {
        self.state.tx.subscribe()
    }

    /// The uploaded files view as of the last refresh
    pub fn files(&self) -> Vec<FileMetadata> {
        self.files.borrow().clone()
    }

    pub fn watch_files(&self) -> watch::Receiver<Vec<FileMetadata>> {
        self.files.subscribe()
    }

    pub fn selected_file(&self) -> Option<LocalFile> {
        self.selected.lock().clone()
    }

    /// Pick a file for upload. Refused while a transfer is running.
    pub fn select_file(&self, file: LocalFile) -> bool {
        let next = State::FileSelected {
            name: file.name.clone(),
            size: file.size(),
        };
        self.state.select(next, || *self.selected.lock() = Some(file))
    }

    pub fn clear_selection(&self) {
        self.state.deselect(|| {
            self.selected.lock().take();
        });
    }

    /// Dismiss a failure banner
    pub fn dismiss(&self) {
        if self.state.get().is_terminal() {
            self.state.set(State::Idle);
        }
    }

    /// Replace the files view with whatever the store lists now
    pub async fn refresh(&self) -> Vec<FileMetadata> {
        let files = self.store.list().await;
        self.files.send_replace(files.clone());
        files
    }

    pub async fn upload(&self) -> UploadOutcome {
        let session = self.wallet.session();
        let Some(file) = self.selected_file() else {
            return UploadOutcome::Rejected(PRECONDITIONS_MESSAGE);
        };
        if !session.is_connected() {
            return UploadOutcome::Rejected(PRECONDITIONS_MESSAGE);
        }

        let first_step = match self.ledger {
            Some(_) => UploadStep::AwaitingLedger,
            None => UploadStep::AwaitingStore,
        };
        if !self.state.begin(State::Uploading(first_step)) {
            return UploadOutcome::Rejected(BUSY_MESSAGE);
        }
        tracing::info!(name = %file.name, size = file.size(), owner = session.address(), "upload started");

        let mut registered = None;
        if let Some(ledger) = &self.ledger {
            let content_id = match self.store.content_id(&file) {
                Ok(cid) => cid,
                Err(e) => return UploadOutcome::Failed(self.fail(Failure::from_error(&e))),
            };

            let confirmed = register_upload(
                ledger.as_ref(),
                session.signer().as_ref(),
                &content_id,
                &file,
            )
            .await;
            match confirmed {
                Ok(receipt) => {
                    tracing::info!(cid = %content_id, tx_hash = %receipt.tx_hash, "upload registered on ledger");
                }
                Err(e) if e.kind().is_cancellation() => {
                    self.cancel();
                    return UploadOutcome::Cancelled;
                }
                Err(e) => return UploadOutcome::Failed(self.fail(Failure::from_error(&e))),
            }
            registered = Some(content_id);
            self.state.set(State::Uploading(UploadStep::AwaitingStore));
        }

        match self.store.store(&file, session.address()).await {
            Ok(metadata) => {
                if let Some(expected) = registered.filter(|cid| *cid != metadata.cid) {
                    tracing::warn!(registered = %expected, stored = %metadata.cid, "store assigned a different cid than the one registered");
                }
                self.succeed(format!("File uploaded successfully: {}", metadata.cid));
                self.refresh().await;
                UploadOutcome::Stored(metadata)
            }
            Err(e) => UploadOutcome::Failed(self.fail(Failure::from_error(&e))),
        }
    }

    pub async fn download(&self, cid: &str) -> DownloadOutcome {
        let session = self.wallet.session();
        if self.ledger.is_some() && !session.is_connected() {
            return DownloadOutcome::Rejected(CONNECT_FIRST_MESSAGE);
        }

        let first_step = match self.ledger {
            Some(_) => DownloadStep::AwaitingLedger,
            None => DownloadStep::AwaitingGateway,
        };
        let started = self.state.begin(State::Downloading {
            cid: cid.to_string(),
            step: first_step,
        });
        if !started {
            return DownloadOutcome::Rejected(BUSY_MESSAGE);
        }

        if let Some(ledger) = &self.ledger {
            match register_download(ledger.as_ref(), session.signer().as_ref(), cid).await {
                Ok(receipt) => {
                    tracing::info!(cid, tx_hash = %receipt.tx_hash, "download registered on ledger");
                }
                Err(e) if e.kind().is_cancellation() => {
                    self.cancel();
                    return DownloadOutcome::Cancelled;
                }
                Err(e) => return DownloadOutcome::Failed(self.fail(Failure::from_error(&e))),
            }
            self.state.set(State::Downloading {
                cid: cid.to_string(),
                step: DownloadStep::AwaitingGateway,
            });
        }

        match self.store.download(cid).await {
            Ok(bytes) => {
                self.succeed(format!("File downloaded: {}", cid));
                DownloadOutcome::Fetched {
                    cid: cid.to_string(),
                    bytes,
                }
            }
            Err(e) => DownloadOutcome::Failed(self.fail(Failure::from_error(&e))),
        }
    }

    /// Apply an account change from the wallet; a reset also drops the
    ///  file selection
    pub fn handle_accounts_changed(&self, accounts: &[String]) -> SessionChange {
        let change = self.wallet.handle_accounts_changed(accounts);
        if change == SessionChange::Reset {
            self.clear_selection();
        }
        change
    }

    /// Follow the wallet's account notifications until stopped
    pub fn spawn_account_listener(self: &Arc<Self>) -> Option<TaskHandle> {
        let mut subscription = self.wallet.subscribe_accounts()?;
        let orchestrator = self.clone();
        Some(TaskHandle::spawn("accounts-listener", move |mut shutdown| async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    next = subscription.changed() => match next {
                        Some(accounts) => {
                            orchestrator.handle_accounts_changed(&accounts);
                        }
                        None => break,
                    },
                }
            }
        }))
    }

    pub fn spawn_refresher(self: &Arc<Self>, period: Duration) -> TaskHandle {
        let orchestrator = self.clone();
        TaskHandle::periodic("files-refresh", period, move || {
            let orchestrator = orchestrator.clone();
            async move {
                orchestrator.refresh().await;
            }
        })
    }

    pub fn spawn_balance_poller(self: &Arc<Self>, period: Duration) -> TaskHandle {
        let wallet = self.wallet.clone();
        TaskHandle::periodic("balance-refresh", period, move || {
            let wallet = wallet.clone();
            async move {
                wallet.refresh_balance().await;
            }
        })
    }

    fn end_transfer(&self, state: State) -> u64 {
        // the same file can be picked again right away
        self.selected.lock().take();
        self.state.set(state)
    }

    fn schedule_reset(&self, generation: u64, after: Duration) {
        let cell = self.state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            cell.reset_if(generation);
        });
    }

    fn succeed(&self, message: String) {
        tracing::info!("{}", message);
        let generation = self.end_transfer(State::Success(message));
        self.schedule_reset(generation, self.banners.success);
    }

    fn cancel(&self) {
        tracing::info!("transaction cancelled by user");
        let generation = self.end_transfer(State::Cancelled);
        self.schedule_reset(generation, self.banners.cancelled);
    }

    fn fail(&self, failure: Failure) -> Failure {
        tracing::error!(kind = %failure.kind, "{}", failure.message);
        self.end_transfer(State::Failed(failure.clone()));
        failure
    }
}

async fn register_upload(
    ledger: &dyn Ledger,
    signer: Option<&Signer>,
    cid: &str,
    file: &LocalFile,
) -> Result<Receipt, LedgerError> {
    let tx = ledger
        .register_upload(signer, cid, &file.name, &file.mime_type, file.size())
        .await?;
    ledger.confirm(&tx).await
}

async fn register_download(
    ledger: &dyn Ledger,
    signer: Option<&Signer>,
    cid: &str,
) -> Result<Receipt, LedgerError> {
    let tx = ledger.register_download(signer, cid).await?;
    ledger.confirm(&tx).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected() -> State {
        State::FileSelected {
            name: "demo.txt".into(),
            size: 2048,
        }
    }

    #[test]
    fn test_select_refused_while_busy() {
        let cell = StateCell::new();
        assert!(cell.begin(State::Uploading(UploadStep::AwaitingLedger)));

        let mut committed = false;
        assert!(!cell.select(selected(), || committed = true));
        assert!(!committed);
        assert_eq!(cell.get(), State::Uploading(UploadStep::AwaitingLedger));
    }

    #[test]
    fn test_select_then_begin() {
        let cell = StateCell::new();
        let mut committed = false;
        assert!(cell.select(selected(), || committed = true));
        assert!(committed);
        assert!(cell.begin(State::Uploading(UploadStep::AwaitingStore)));

        // deselect leaves a running transfer alone
        cell.deselect(|| {});
        assert_eq!(cell.get(), State::Uploading(UploadStep::AwaitingStore));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_select_never_overwrites_transfer() {
        for _ in 0..200 {
            let cell = Arc::new(StateCell::new());
            let picker = {
                let cell = cell.clone();
                tokio::spawn(async move { cell.select(selected(), || {}) })
            };
            let started = {
                let cell = cell.clone();
                tokio::spawn(async move { cell.begin(State::Uploading(UploadStep::AwaitingLedger)) })
            };
            let _ = picker.await.unwrap();
            let started = started.await.unwrap();
            assert!(started);
            assert_eq!(cell.get(), State::Uploading(UploadStep::AwaitingLedger));
        }
    }
}
