pub mod codec;
pub mod error;
pub mod gene_pool;
pub mod queries;
pub mod table;

pub use error::{Result, StoreError};
pub use gene_pool::GenePoolInterface;
pub use queries::{all_match_combinations, InterfaceMatch, TypeMatch};
pub use table::{GcRow, GeneTable, GeneTableQuery, MemoryGeneTable};

#[cfg(feature = "postgres")]
pub use table::PgGeneTable;
