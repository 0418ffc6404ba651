pub mod ept;
pub mod interface;
pub mod row;

pub use ept::{Ept, EptStore};
pub use interface::{Endpoint, EndpointRef, Interface, InterfaceStore, MAX_INTERFACE_LEN};
pub use row::{EndpointClass, Row};
