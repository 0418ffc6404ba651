pub mod cacheable;
pub mod error;
pub mod import_def;
pub mod properties;
pub mod signature;
pub mod uid;
pub mod validate;

pub use cacheable::{Cacheable, DirtyState, Freezable};
pub use error::{CommonError, Result};
pub use import_def::ImportDef;
pub use properties::{GcType, GraphType, Properties, TypeSpecific};
pub use signature::Signature;
pub use uid::{TypeUid, TypeUidKind};
