use anyhow::{Context, Error as Anyhow};
use clap::Parser;
use lib::source::{HttpSource, DEFAULT_URL};
use tracing::{info, instrument};

/// Checks whether the relay service is operational.
#[derive(Debug, Parser)]
#[clap(disable_help_flag = true, disable_version_flag = true)]
pub struct Health {
    /// The address of the service that relays requests to the models.
    #[clap(short, long, env = "LLM_CHESS_API_URL", default_value = DEFAULT_URL)]
    url: String,
}

impl Health {
    #[instrument(level = "trace", skip(self), err)]
    pub async fn execute(self) -> Result<(), Anyhow> {
        let source = HttpSource::new(self.url);
        let health = source
            .health()
            .await
            .with_context(|| format!("{} is unreachable", source.url()))?;

        info!(url = source.url(), status = %health.status, "{}", health.message);
        println!("{}", health.status);

        Ok(())
    }
}
