pub mod cgraph;
pub mod connection;
pub mod error;
pub mod gc;
pub mod stabilize;

pub use cgraph::{CGraph, GraphValue};
pub use connection::{Connection, ConnectionStore};
pub use error::{GraphError, Result};
pub use gc::{GeneticCode, StaticMetrics};
pub use stabilize::{connect_all, stabilize};
