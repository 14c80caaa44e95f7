//! Background monitoring of a voltage reading published on a status page
//!
//! A [`Monitor`] samples the page at the configured interval, extracts the
//! labelled reading and raises a single [`AlertEvent`] whenever the value
//! drops to or below the threshold. Further alerts stay suppressed until the
//! reading recovers past the threshold by [`RECOVERY_MARGIN`].

pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod hysteresis;
pub mod monitor;
pub mod sink;

pub use config::{Config, ConfigStore};
pub use error::{ConfigError, ExtractError, FetchError};
pub use extractor::{Extractor, LabelExtractor, Reading};
pub use fetcher::{Fetcher, HttpFetcher};
pub use hysteresis::{AlertState, Evaluation, RECOVERY_MARGIN};
pub use monitor::Monitor;
pub use monitor::messages::{StartStatus, StopStatus, TickOutcome};
pub use sink::{AlertEvent, AlertSink, LogSink};
