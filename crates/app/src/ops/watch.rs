use std::time::Duration;

use clap::Args;
use common::catalog::short_address;
use common::orchestrator::State;
use common::wallet::format_ether;

use crate::logging::report_build_info;
use crate::services::ServicesError;

/// Follow wallet, balance and the files list until interrupted
#[derive(Args, Debug, Clone)]
pub struct Watch;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error(transparent)]
    Services(#[from] ServicesError),
}

#[async_trait::async_trait]
impl crate::op::Op for Watch {
    type Error = WatchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        report_build_info();
        let services = ctx.services().await?;
        let refresh = &services.state.config.refresh;
        let orchestrator = &services.orchestrator;

        let mut session = orchestrator.wallet().watch();
        let mut balance = orchestrator.wallet().watch_balance();
        let mut files = orchestrator.watch_files();
        let mut state = orchestrator.watch_state();

        let listener = orchestrator.spawn_account_listener();
        let refresher = orchestrator.spawn_refresher(Duration::from_secs(refresh.interval_secs.max(1)));
        let balance_poller = orchestrator
            .spawn_balance_poller(Duration::from_secs(refresh.balance_interval_secs.max(1)));

        println!("{}", describe_session(&session.borrow_and_update()));
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                Ok(()) = session.changed() => {
                    println!("{}", describe_session(&session.borrow_and_update()));
                }
                Ok(()) = balance.changed() => {
                    if let Some(wei) = *balance.borrow_and_update() {
                        println!("balance: {}", format_ether(wei));
                    }
                }
                Ok(()) = files.changed() => {
                    let count = files.borrow_and_update().len();
                    println!("files: {} pinned", count);
                }
                Ok(()) = state.changed() => {
                    let current = state.borrow_and_update().clone();
                    if current != State::Idle {
                        println!("{}", current);
                    }
                }
            }
        }

        if let Some(listener) = listener {
            listener.stop().await;
        }
        refresher.stop().await;
        balance_poller.stop().await;
        Ok("stopped".to_string())
    }
}

fn describe_session(session: &common::wallet::WalletSession) -> String {
    if session.is_connected() {
        format!("wallet: {}", short_address(session.address()))
    } else {
        "wallet: not connected".to_string()
    }
}
