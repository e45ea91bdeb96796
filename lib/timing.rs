use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Formatter};
use std::{str::FromStr, time::Duration};

#[cfg(test)]
use proptest::prelude::*;

/// How the controller paces a game.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
#[serde(deny_unknown_fields, default)]
pub struct Timing {
    /// How long to wait before automatically starting the next turn.
    #[cfg_attr(test, strategy((0u64..100_000).prop_map(Duration::from_millis)))]
    #[serde(with = "humantime_serde")]
    pub advance: Duration,

    /// How often streamed reasoning is made visible.
    #[cfg_attr(test, strategy((1u64..10_000).prop_map(Duration::from_millis)))]
    #[serde(with = "humantime_serde")]
    pub flush: Duration,

    /// How long a warning about an invalid move stays visible.
    #[cfg_attr(test, strategy((0u64..100_000).prop_map(Duration::from_millis)))]
    #[serde(with = "humantime_serde")]
    pub notice: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            advance: Duration::from_secs(1),
            flush: Duration::from_millis(50),
            notice: Duration::from_secs(3),
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&ron::ser::to_string(self).map_err(|_| fmt::Error)?)
    }
}

/// The reason why parsing [`Timing`] failed.
#[derive(Debug, Display, Eq, PartialEq, Error, From)]
#[display(fmt = "failed to parse timing configuration")]
pub struct ParseTimingError(ron::de::SpannedError);

impl FromStr for Timing {
    type Err = ParseTimingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ron::de::from_str(s)?)
    }
}
