pub mod answer_resolver;
pub mod dropdown;
pub mod field_scanner;
pub mod identity;
pub mod llm_service;
pub mod locator;
pub mod option_match;
pub mod outcome_store;

pub use answer_resolver::{AnswerResolver, GenerativeAnswerer, GenerativeRequest};
pub use dropdown::{Commit, DropdownController, OpenMenu};
pub use field_scanner::FieldScanner;
pub use identity::IdentityFiller;
pub use llm_service::LlmService;
pub use outcome_store::{Outcome, OutcomeRecord, OutcomeStore};
