pub mod dom_scripts;
pub mod form_page;
pub mod js_executor;

pub use form_page::{ControlProbe, FormPage, LocatorStrategy};
pub use js_executor::JsExecutor;
