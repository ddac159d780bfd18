// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Setup of the tracing subscriber.

use std::{fs::File, path::PathBuf, sync::Mutex};

use serde::{Deserialize, Serialize};
use tracing::Dispatch;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// Configurations of the logging.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The maximum level of events, eg. `info`.
    #[serde(with = "level")]
    pub level: LevelFilter,
    /// Directives which override the level for some targets, eg.
    /// `xayn_kg_discovery::candidates=trace`.
    pub directives: Vec<String>,
    /// A file which receives the events in addition to stdout.
    pub file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            directives: Vec::new(),
            file: None,
        }
    }
}

mod level {
    use std::borrow::Cow;

    use serde::{de, Deserialize, Deserializer, Serializer};
    use tracing_subscriber::filter::LevelFilter;

    #[allow(clippy::trivially_copy_pass_by_ref)] // signature of serde(with)
    pub(super) fn serialize<S>(level: &LevelFilter, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(level)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
    where
        D: Deserializer<'de>,
    {
        Cow::<'de, str>::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

impl Config {
    /// Combines the level and the directives, invalid directives are skipped.
    fn filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(self.level.into())
            .parse_lossy(self.directives.join(","))
    }
}

/// Initializes the global subscriber.
///
/// Fails if a global subscriber has already been set.
pub fn initialize_global(config: &Config) -> Result<(), TryInitError> {
    create_trace_dispatch(config).try_init()
}

/// Creates a subscriber which logs json events to stdout and optionally to a file.
fn create_trace_dispatch(config: &Config) -> Dispatch {
    let stdout = fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false);
    let file = config
        .file
        .as_deref()
        .and_then(|path| match File::create(path) {
            Ok(file) => Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(error) => {
                eprintln!("Failed to log to {}: {error}", path.display());
                None
            }
        });

    tracing_subscriber::registry()
        .with(stdout)
        .with(file)
        .with(config.filter())
        .into()
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use serde_json::{from_str, json, to_value};

    use super::*;

    #[test]
    fn test_level_serde() -> Result<(), Box<dyn Error>> {
        let config = from_str::<Config>(r#"{ "level": "debug" }"#)?;
        assert_eq!(config.level, LevelFilter::DEBUG);
        assert!(config.directives.is_empty());
        assert!(config.file.is_none());
        assert_eq!(
            to_value(&config)?,
            json!({ "level": "debug", "directives": [], "file": null }),
        );

        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        assert!(from_str::<Config>(r#"{ "level": "loud" }"#).is_err());
        assert!(from_str::<Config>(r#"{ "levels": "info" }"#).is_err());
    }

    #[test]
    fn test_filter() {
        let config = Config {
            level: LevelFilter::WARN,
            directives: vec!["xayn_kg_discovery=debug".into(), "=invalid=".into()],
            file: None,
        };
        assert_eq!(config.filter().max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_create_trace_dispatch() {
        let dispatch = create_trace_dispatch(&Config::default());
        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!("logging works");
        });
    }
}
