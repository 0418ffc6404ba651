pub mod registry;
pub mod seed;
pub mod template;
pub mod types_def;

pub use registry::{Registry, RegistryStats};
pub use seed::load_signed;
pub use template::{parse as parse_template, TemplateExpr};
pub use types_def::TypesDef;
