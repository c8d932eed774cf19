use eyre::Result;
use tokio::sync::mpsc;
use tracing::{error, info};

pub mod cosmos;
pub mod ethereum;

pub use cosmos::CosmosWatcher;
pub use ethereum::EthereumWatcher;

/// Manages both chain watchers
pub struct WatcherManager {
    ethereum_watcher: EthereumWatcher,
    cosmos_watcher: CosmosWatcher,
}

impl WatcherManager {
    pub fn new(ethereum_watcher: EthereumWatcher, cosmos_watcher: CosmosWatcher) -> Self {
        Self {
            ethereum_watcher,
            cosmos_watcher,
        }
    }

    /// Run all watchers concurrently
    /// Returns when any watcher fails or shutdown signal received
    pub async fn run(self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        let mut join_set = tokio::task::JoinSet::new();

        let ethereum_watcher = self.ethereum_watcher;
        join_set.spawn(async move { ethereum_watcher.run().await });
        let cosmos_watcher = self.cosmos_watcher;
        join_set.spawn(async move { cosmos_watcher.run().await });

        info!("Watcher manager started");

        tokio::select! {
            _ = shutdown.recv() => {
                info!("Shutdown signal received, stopping watchers");
                join_set.abort_all();
                Ok(())
            }
            maybe_done = join_set.join_next() => {
                match maybe_done {
                    Some(Ok(Ok(()))) => {
                        error!("A watcher exited unexpectedly without error");
                        Err(eyre::eyre!("watcher exited unexpectedly"))
                    }
                    Some(Ok(Err(e))) => {
                        error!("A watcher stopped with error: {:?}", e);
                        Err(e)
                    }
                    Some(Err(e)) => {
                        error!("A watcher task panicked: {:?}", e);
                        Err(eyre::eyre!("watcher task panicked: {}", e))
                    }
                    None => {
                        error!("All watcher tasks exited unexpectedly");
                        Err(eyre::eyre!("all watcher tasks exited unexpectedly"))
                    }
                }
            }
        }
    }
}
