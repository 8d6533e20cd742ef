pub mod answer;
pub mod field;
pub mod job;
pub mod loaders;
pub mod profile;
pub mod rules;
pub mod session;

pub use answer::{AnswerRecord, SourceTier};
pub use field::{FieldDescriptor, FieldKind};
pub use job::JobRef;
pub use loaders::{load_jobs, load_profile, load_resolver_config};
pub use profile::ApplicantProfile;
pub use rules::{CategoryKeywords, PatternRule, ResolverConfig};
pub use session::{ApplicationSession, FieldIssue, SessionState};
