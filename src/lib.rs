pub mod aggregate;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod query;
pub mod store;
pub mod theme;

pub use aggregate::{
    Activation, AggregateState, CollapsedStateMap, ViewState, VisibleSet, reconstruct_visible_set,
};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, StartDepth};
pub use engine::EngineState;
pub use error::{EngineError, Result};
pub use ir::{Dataset, LinkDirection, Node, Tier, VisibleLink};
pub use query::{NeighborSet, PathResult};
pub use store::GraphStore;
