use anyhow::Error as Anyhow;
use clap::Parser;
use lib::roster::ROSTER;
use tracing::instrument;

/// Lists the models known to the relay service.
#[derive(Debug, Default, Parser)]
#[clap(disable_help_flag = true, disable_version_flag = true)]
pub struct Models {}

impl Models {
    #[instrument(level = "trace", skip(self), err)]
    pub async fn execute(self) -> Result<(), Anyhow> {
        for model in ROSTER {
            println!("{model}");
        }

        Ok(())
    }
}
