// src/lib.rs
//! sizetrack - track an object store's aggregate size over time
//!
//! Object-change notifications flow through [`SizeAggregator`] into an
//! append-only [`HistoryStore`]; [`PlotRenderer`] turns the stored series
//! into chart artifacts on demand, and [`RenderDriver`] orchestrates the
//! render endpoint over HTTP.

pub mod aggregator;
pub mod artifact;
pub mod config;
pub mod constants;
pub mod driver;
pub mod event;
pub mod history;
pub mod plot;
pub mod runtime;
pub mod server;
pub mod store;

pub use aggregator::{Applied, ApplyStatus, AggregationError, SizeAggregator};
pub use artifact::{ArtifactError, ArtifactStore, FileArtifactStore};
pub use config::{Config, ConfigError};
pub use driver::{OrchestrationError, RenderDriver};
pub use event::{ChangeKind, EventTime, ObjectChangeEvent};
pub use history::{HistoryStore, SizeHistoryRecord, StoreError};
pub use plot::{PlotArtifact, PlotRenderer, PlotRequest, RenderError};
pub use runtime::TrackerRuntime;
pub use store::FileHistoryStore;
