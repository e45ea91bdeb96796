use anyhow::Error as Anyhow;
use clap::Subcommand;
use derive_more::From;

mod health;
mod models;
mod play;

#[derive(From, Subcommand)]
pub enum Applet {
    Health(health::Health),
    Models(models::Models),
    Play(play::Play),
}

impl Default for Applet {
    fn default() -> Self {
        models::Models::default().into()
    }
}

impl Applet {
    pub async fn execute(self) -> Result<(), Anyhow> {
        match self {
            Applet::Health(a) => Ok(a.execute().await?),
            Applet::Models(a) => Ok(a.execute().await?),
            Applet::Play(a) => Ok(a.execute().await?),
        }
    }
}
