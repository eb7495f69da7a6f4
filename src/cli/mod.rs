pub mod args;
pub mod validation;

pub use args::{Args, Commands, ConfigAction};
pub use validation::{validate_share_name, validate_soak_args};
