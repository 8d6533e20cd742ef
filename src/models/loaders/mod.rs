mod json_loader;
mod toml_loader;

pub use json_loader::load_profile;
pub use toml_loader::{load_jobs, load_resolver_config};
