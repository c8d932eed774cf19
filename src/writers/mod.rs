use eyre::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

pub mod cosmos;
pub mod ethereum;
pub mod retry;

pub use cosmos::CosmosWriter;
pub use ethereum::{EthereumSubmission, EthereumWriter};
pub use retry::{classify_error, RetryConfig};

/// Circuit breaker configuration for writers
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before pausing
    pub threshold: u32,
    /// How long to pause when circuit breaker trips
    pub pause_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 10,
            pause_duration: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// Manages the claim submitters for both destination chains.
///
/// Each writer drains its own channel on its own task; submission
/// ordering is per chain, never across chains.
pub struct WriterManager {
    cosmos_writer: CosmosWriter,
    ethereum_writer: EthereumWriter,
}

impl WriterManager {
    pub fn new(cosmos_writer: CosmosWriter, ethereum_writer: EthereumWriter) -> Self {
        Self {
            cosmos_writer,
            ethereum_writer,
        }
    }

    /// Run both writers concurrently.
    /// Returns when any writer fails or shutdown signal received
    pub async fn run(self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        let mut join_set = tokio::task::JoinSet::new();

        let cosmos_writer = self.cosmos_writer;
        join_set.spawn(async move { cosmos_writer.run().await });
        let ethereum_writer = self.ethereum_writer;
        join_set.spawn(async move { ethereum_writer.run().await });

        tokio::select! {
            _ = shutdown.recv() => {
                info!("Shutdown signal received, stopping writers");
                join_set.abort_all();
                Ok(())
            }
            maybe_done = join_set.join_next() => {
                match maybe_done {
                    Some(Ok(Ok(()))) => {
                        info!("A writer finished after its channel closed");
                        Ok(())
                    }
                    Some(Ok(Err(e))) => {
                        error!("A writer stopped with error: {:?}", e);
                        Err(e)
                    }
                    Some(Err(e)) => {
                        error!("A writer task panicked: {:?}", e);
                        Err(eyre::eyre!("writer task panicked: {}", e))
                    }
                    None => {
                        error!("All writer tasks exited unexpectedly");
                        Err(eyre::eyre!("all writer tasks exited unexpectedly"))
                    }
                }
            }
        }
    }
}
