pub mod application_flow;
pub mod cancel;
pub mod fill_executor;
pub mod review_gate;
pub mod submission;

pub use application_flow::ApplicationFlow;
pub use cancel::CancelFlag;
pub use fill_executor::FillExecutor;
pub use review_gate::{ConsoleReview, FieldEdit, ReviewDecision, ReviewGate, ReviewSurface};
pub use submission::{classify_page, Evidence, PageVerdict, SubmissionController, SubmissionReport};
