mod support;

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use ats_autofill::config::{Config, SettleTimings};
use ats_autofill::error::FormError;
use ats_autofill::infrastructure::ControlProbe;
use ats_autofill::models::{
    ApplicationSession, FieldKind, PatternRule, ResolverConfig, SessionState, SourceTier,
};
use ats_autofill::services::{
    AnswerResolver, DropdownController, GenerativeAnswerer, Outcome, OutcomeRecord, OutcomeStore,
};
use ats_autofill::workflow::{
    ApplicationFlow, CancelFlag, FieldEdit, FillExecutor, ReviewDecision, ReviewSurface,
};

use support::{job, profile, FakeControl, FakeForm, FixedAnswer, SlowAnswer};

fn resolver(generator: Option<Arc<dyn GenerativeAnswerer>>, timeout: Duration) -> Arc<AnswerResolver> {
    Arc::new(AnswerResolver::new(
        Arc::new(ResolverConfig::default()),
        Arc::new(profile()),
        generator,
        timeout,
    ))
}

fn executor(resolver: Arc<AnswerResolver>) -> FillExecutor {
    FillExecutor::new(
        resolver,
        DropdownController::new(SettleTimings::instant()),
        CancelFlag::new(),
    )
}

fn config(dir: &Path) -> Config {
    Config {
        review_enabled: false,
        store_file: dir.join("applications.jsonl"),
        screenshot_dir: dir.join("screenshots"),
        menu_settle_ms: 0,
        click_settle_ms: 0,
        submit_settle_ms: 0,
        ..Config::default()
    }
}

fn flow(
    config: &Config,
    store: Arc<OutcomeStore>,
    review: Option<Arc<dyn ReviewSurface>>,
    cancel: CancelFlag,
) -> ApplicationFlow {
    ApplicationFlow::new(
        config,
        resolver(None, Duration::from_secs(1)),
        Arc::new(profile()),
        store,
        review,
        cancel,
    )
}

fn standard_form() -> FakeForm {
    FakeForm::new(vec![
        FakeControl::email("email", "Email"),
        FakeControl::native_select("country", "Country*", &["Select...", "Canada", "United States"]),
        FakeControl::pseudo_select("gender", "Gender", &["Male", "Female", "Decline to self-identify"]),
        FakeControl::native_select("felony", "Have you ever been convicted of a felony?", &["Yes", "No"])
            .required(),
        FakeControl::textarea("why", "Why do you want to work here?").required(),
    ])
}

fn fatal(err: &anyhow::Error) -> Option<&FormError> {
    err.downcast_ref::<FormError>()
}

/// 按顺序返回预设决定的审核界面
struct ScriptedReview(Mutex<VecDeque<ReviewDecision>>);

impl ScriptedReview {
    fn new(decisions: Vec<ReviewDecision>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(decisions.into())))
    }
}

#[async_trait]
impl ReviewSurface for ScriptedReview {
    async fn review(&self, _session: &ApplicationSession) -> Result<ReviewDecision> {
        Ok(self.0.lock().unwrap().pop_front().unwrap_or(ReviewDecision::Skip))
    }
}

#[tokio::test]
async fn fills_every_tier_and_waits_for_review() {
    let form = standard_form();
    let generator: Arc<dyn GenerativeAnswerer> = Arc::new(FixedAnswer("I enjoy building reliable systems."));
    let mut session = ApplicationSession::new(job("1"), 1);

    executor(resolver(Some(generator), Duration::from_secs(1)))
        .run(&form, &mut session, 1)
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::AwaitingReview);
    let ids: Vec<&str> = session.fields().iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["country", "gender", "felony", "why"]);

    let tiers: Vec<SourceTier> = session
        .fields()
        .iter()
        .map(|f| session.answer(&f.id).unwrap().source_tier)
        .collect();
    assert_eq!(
        tiers,
        vec![
            SourceTier::Contextual,
            SourceTier::Contextual,
            SourceTier::Predetermined,
            SourceTier::Generative,
        ]
    );
    assert!(session.answers().iter().all(|a| a.verified));
    assert!(session.issues().is_empty());

    assert_eq!(form.value("country").as_deref(), Some("United States"));
    assert_eq!(form.value("gender").as_deref(), Some("Decline to self-identify"));
    assert_eq!(form.value("felony").as_deref(), Some("No"));
    assert_eq!(form.value("why").as_deref(), Some("I enjoy building reliable systems."));
}

#[tokio::test]
async fn other_option_reveals_follow_up_field() {
    let follow_up = ControlProbe {
        tag: "input".into(),
        input_type: "text".into(),
        id: "source_other".into(),
        label: "If other, please specify".into(),
        visible: true,
        ..Default::default()
    };
    let form = FakeForm::new(vec![FakeControl::pseudo_select(
        "source",
        "How did you hear about us?",
        &["Company Website", "LinkedIn", "Referral", "Other"],
    )
    .required()
    .revealing("Other", follow_up)]);
    let mut session = ApplicationSession::new(job("2"), 1);

    executor(resolver(None, Duration::from_secs(1)))
        .run(&form, &mut session, 2)
        .await
        .unwrap();

    let source = session.answer("source").unwrap();
    assert_eq!(source.resolved_value.as_deref(), Some("Corporate Website"));
    assert_eq!(source.committed_value.as_deref(), Some("Other"));
    assert_eq!(source.source_tier, SourceTier::Predetermined);
    assert!(source.verified);

    assert!(session.has_field("source_other"));
    let specify = session.answer("source_other").unwrap();
    assert_eq!(specify.resolved_value.as_deref(), Some("Corporate Website"));
    assert_eq!(form.value("source_other").as_deref(), Some("Corporate Website"));
    assert_eq!(session.state(), SessionState::AwaitingReview);
}

#[test]
fn earlier_configured_rule_wins() {
    let config = ResolverConfig::new(vec![
        PatternRule::new("sponsor", "No"),
        PatternRule::new("sponsorship", "Yes"),
    ]);
    let r = AnswerResolver::new(
        Arc::new(config),
        Arc::new(profile()),
        None,
        Duration::from_secs(1),
    );
    assert_eq!(r.predetermined("Will you require sponsorship?").as_deref(), Some("No"));
}

#[tokio::test]
async fn same_form_resolves_identically() {
    let generator: Arc<dyn GenerativeAnswerer> = Arc::new(FixedAnswer("Because of the team."));
    let resolver = resolver(Some(generator), Duration::from_secs(1));

    let mut first = ApplicationSession::new(job("3"), 1);
    executor(resolver.clone())
        .run(&standard_form(), &mut first, 3)
        .await
        .unwrap();
    let mut second = ApplicationSession::new(job("3"), 1);
    executor(resolver)
        .run(&standard_form(), &mut second, 3)
        .await
        .unwrap();

    assert_eq!(first.answers(), second.answers());
}

#[tokio::test]
async fn readback_mismatch_is_flagged_not_fatal() {
    let form = FakeForm::new(vec![FakeControl::pseudo_select(
        "gender",
        "Gender",
        &["Male", "Female", "Decline to self-identify"],
    )])
    .readback_override("gender", "Male");
    let mut session = ApplicationSession::new(job("4"), 1);

    executor(resolver(None, Duration::from_secs(1)))
        .run(&form, &mut session, 4)
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::AwaitingReview);
    assert!(session.pending_review());
    let answer = session.answer("gender").unwrap();
    assert!(!answer.verified);
    assert_eq!(answer.committed_value.as_deref(), Some("Decline to self-identify"));
    assert!(session
        .issues()
        .iter()
        .any(|i| matches!(i.error, FormError::VerificationMismatch { .. })));
}

#[tokio::test]
async fn slow_generator_leaves_field_unanswered() {
    let form = FakeForm::new(vec![FakeControl::textarea("why", "Why do you want to work here?").required()]);
    let generator: Arc<dyn GenerativeAnswerer> = Arc::new(SlowAnswer(Duration::from_millis(500)));
    let mut session = ApplicationSession::new(job("5"), 1);

    executor(resolver(Some(generator), Duration::from_millis(20)))
        .run(&form, &mut session, 5)
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.pending_review());
    let answer = session.answer("why").unwrap();
    assert_eq!(answer.source_tier, SourceTier::None);
    assert_eq!(form.value("why"), None);
}

#[tokio::test]
async fn missing_required_answer_blocks_submit() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = Arc::new(OutcomeStore::new(&config.store_file));
    let form = FakeForm::new(vec![
        FakeControl::pseudo_select("letter", "Favorite Greek letter?", &["Alpha", "Beta"]).required(),
    ])
    .after_submit("Thank you for applying!");

    let err = flow(&config, store.clone(), None, CancelFlag::new())
        .run(&form, job("6"), 6)
        .await
        .unwrap_err();

    assert_eq!(
        fatal(&err),
        Some(&FormError::ResolutionFailure {
            questions: vec!["Favorite Greek letter?".to_string()]
        })
    );
    assert_eq!(form.submit_clicks(), 0);

    let records = store.load_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].outcome, Outcome::Incomplete);
}

#[tokio::test]
async fn reviewer_edit_is_committed_as_manual() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = Arc::new(OutcomeStore::new(&config.store_file));
    let form = FakeForm::new(vec![
        FakeControl::pseudo_select("letter", "Favorite Greek letter?", &["Alpha", "Beta"]).required(),
    ])
    .after_submit("Thank you for applying!");
    let review = ScriptedReview::new(vec![
        ReviewDecision::Edit(vec![FieldEdit {
            field_id: "letter".into(),
            value: "Beta".into(),
        }]),
        ReviewDecision::Approve,
    ]);

    let record = flow(&config, store.clone(), Some(review), CancelFlag::new())
        .run(&form, job("7"), 7)
        .await
        .unwrap();

    assert_eq!(record.outcome, Outcome::Submitted);
    assert_eq!(form.value("letter").as_deref(), Some("Beta"));
    assert_eq!(form.submit_clicks(), 1);
    let answer = &record.answers[0];
    assert_eq!(answer.value.as_deref(), Some("Beta"));
    assert_eq!(answer.tier, SourceTier::Manual);
    assert!(answer.verified);
}

#[tokio::test]
async fn reviewer_skip_records_skipped() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = Arc::new(OutcomeStore::new(&config.store_file));
    let form = standard_form().after_submit("Thank you for applying!");
    let review = ScriptedReview::new(vec![ReviewDecision::Skip]);

    let err = flow(&config, store.clone(), Some(review), CancelFlag::new())
        .run(&form, job("8"), 8)
        .await
        .unwrap_err();

    assert_eq!(fatal(&err), Some(&FormError::SkippedByReviewer));
    assert_eq!(form.submit_clicks(), 0);
    assert_eq!(store.load_all().await.unwrap()[0].outcome, Outcome::Skipped);
}

#[tokio::test]
async fn successful_submission_is_recorded() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = Arc::new(OutcomeStore::new(&config.store_file));
    let form = FakeForm::new(vec![
        FakeControl::email("email", "Email"),
        FakeControl::native_select("country", "Country*", &["Canada", "United States"]),
        FakeControl::native_select("felony", "Have you ever been convicted of a felony?", &["Yes", "No"]),
    ])
    .after_submit("Thank you for applying to Acme!");

    let record = flow(&config, store.clone(), None, CancelFlag::new())
        .run(&form, job("9"), 9)
        .await
        .unwrap();

    assert_eq!(record.outcome, Outcome::Submitted);
    assert_eq!(form.value("email").as_deref(), Some("ada@example.com"));
    assert_eq!(form.opened_urls(), vec![job("9").url]);
    assert_eq!(form.screenshots().len(), 1);
    assert!(record
        .evidence
        .as_deref()
        .is_some_and(|e| e.contains("Thank you for applying")));
    assert!(store.has_applied(&job("9")).await.unwrap());
}

#[tokio::test]
async fn validation_errors_reject_submission() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = Arc::new(OutcomeStore::new(&config.store_file));
    let form = FakeForm::new(vec![FakeControl::native_select(
        "country",
        "Country",
        &["Canada", "United States"],
    )])
    .after_submit("Resume/CV is required");

    let err = flow(&config, store.clone(), None, CancelFlag::new())
        .run(&form, job("10"), 10)
        .await
        .unwrap_err();

    assert!(matches!(
        fatal(&err),
        Some(FormError::SubmissionRejected { reason, .. }) if reason == "is required"
    ));
    let records = store.load_all().await.unwrap();
    assert_eq!(records[0].outcome, Outcome::Rejected);
    assert!(!store.has_applied(&job("10")).await.unwrap());
}

#[tokio::test]
async fn daily_cap_stops_before_page_work() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        max_applications_per_day: 1,
        ..config(dir.path())
    };
    let store = Arc::new(OutcomeStore::new(&config.store_file));
    let earlier = ApplicationSession::new(job("old"), 1);
    store
        .append(&OutcomeRecord::from_session(&earlier, Outcome::Submitted, None, None))
        .await
        .unwrap();
    let form = standard_form();

    let err = flow(&config, store.clone(), None, CancelFlag::new())
        .run(&form, job("11"), 11)
        .await
        .unwrap_err();

    assert_eq!(fatal(&err), Some(&FormError::BudgetExhausted { used: 1, cap: 1 }));
    assert!(form.opened_urls().is_empty());
    assert_eq!(store.load_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn already_submitted_job_is_skipped() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = Arc::new(OutcomeStore::new(&config.store_file));
    let earlier = ApplicationSession::new(job("12"), 1);
    store
        .append(&OutcomeRecord::from_session(&earlier, Outcome::Submitted, None, None))
        .await
        .unwrap();
    let form = standard_form();

    let record = flow(&config, store.clone(), None, CancelFlag::new())
        .run(&form, job("12"), 12)
        .await
        .unwrap();

    assert_eq!(record.outcome, Outcome::Skipped);
    assert!(form.opened_urls().is_empty());
    assert_eq!(store.load_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_session_is_recorded() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = Arc::new(OutcomeStore::new(&config.store_file));
    let cancel = CancelFlag::new();
    cancel.cancel();
    let form = standard_form();

    let err = flow(&config, store.clone(), None, cancel)
        .run(&form, job("13"), 13)
        .await
        .unwrap_err();

    assert_eq!(fatal(&err), Some(&FormError::Cancelled));
    assert!(form.opened_urls().is_empty());
    assert_eq!(store.load_all().await.unwrap()[0].outcome, Outcome::Cancelled);
}

#[tokio::test]
async fn four_field_application_reaches_review() {
    let form = FakeForm::new(vec![
        FakeControl::native_select("country", "Country*", &["Select...", "Canada", "United States"]),
        FakeControl::pseudo_select(
            "school",
            "School*",
            &["Texas State University", "Texas A&M University-Commerce", "Texas A&M University", "Other"],
        ),
        FakeControl::native_select("conflicts", "Do you have any conflicts of interest?", &["Yes", "No"]),
        FakeControl::textarea("why", "Why do you want this job?"),
    ]);
    let generator: Arc<dyn GenerativeAnswerer> = Arc::new(FixedAnswer("The team ships Rust in production."));
    let mut session = ApplicationSession::new(job("20"), 1);

    executor(resolver(Some(generator), Duration::from_secs(1)))
        .run(&form, &mut session, 20)
        .await
        .unwrap();

    let tiers: Vec<SourceTier> = ["country", "school", "conflicts", "why"]
        .iter()
        .map(|id| session.answer(id).unwrap().source_tier)
        .collect();
    assert_eq!(
        tiers,
        vec![
            SourceTier::Contextual,
            SourceTier::Contextual,
            SourceTier::Predetermined,
            SourceTier::Generative,
        ]
    );
    assert_eq!(session.state(), SessionState::AwaitingReview);
    assert!(session.unresolved_required().is_empty());
    assert!(session.field("school").unwrap().required);
    assert_eq!(form.value("school").as_deref(), Some("Texas A&M University"));
    assert_eq!(form.value("conflicts").as_deref(), Some("No"));
}

#[tokio::test]
async fn menu_that_renders_late_is_retried_once() {
    let form = FakeForm::new(vec![FakeControl::pseudo_select(
        "gender",
        "Gender",
        &["Male", "Female", "Decline to self-identify"],
    )])
    .flaky_menu(1);
    let mut session = ApplicationSession::new(job("21"), 1);

    executor(resolver(None, Duration::from_secs(1)))
        .run(&form, &mut session, 21)
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::AwaitingReview);
    assert!(session.answer("gender").unwrap().verified);
    assert_eq!(form.value("gender").as_deref(), Some("Decline to self-identify"));
}

#[tokio::test]
async fn menu_that_never_renders_is_left_unresolved() {
    let form = FakeForm::new(vec![FakeControl::pseudo_select(
        "gender",
        "Gender",
        &["Male", "Female", "Decline to self-identify"],
    )
    .required()])
    .flaky_menu(2);
    let mut session = ApplicationSession::new(job("22"), 1);

    executor(resolver(None, Duration::from_secs(1)))
        .run(&form, &mut session, 22)
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::Failed);
    assert!(!session.answer("gender").unwrap().is_resolved());
    assert!(session
        .issues()
        .iter()
        .any(|i| matches!(i.error, FormError::InteractionFailure { .. })));
    assert_eq!(form.value("gender"), None);
}

#[tokio::test]
async fn blank_reviewer_edit_does_not_unblock_submit() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = Arc::new(OutcomeStore::new(&config.store_file));
    let form = FakeForm::new(vec![
        FakeControl::textarea("why", "Why do you want to work here?").required(),
    ])
    .after_submit("Thank you for applying!");
    let review = ScriptedReview::new(vec![
        ReviewDecision::Edit(vec![FieldEdit {
            field_id: "why".into(),
            value: "  ".into(),
        }]),
        ReviewDecision::Approve,
    ]);

    let err = flow(&config, store.clone(), Some(review), CancelFlag::new())
        .run(&form, job("23"), 23)
        .await
        .unwrap_err();

    assert!(matches!(fatal(&err), Some(FormError::ResolutionFailure { .. })));
    assert_eq!(form.submit_clicks(), 0);
    assert_eq!(form.value("why"), None);
    assert_eq!(store.load_all().await.unwrap()[0].outcome, Outcome::Incomplete);
}

#[tokio::test]
async fn reviewer_choice_of_other_fills_follow_up() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path());
    let store = Arc::new(OutcomeStore::new(&config.store_file));
    let follow_up = ControlProbe {
        tag: "input".into(),
        input_type: "text".into(),
        id: "team_other".into(),
        label: "If other, please specify".into(),
        visible: true,
        ..Default::default()
    };
    let form = FakeForm::new(vec![FakeControl::pseudo_select(
        "team",
        "Which team interests you most?",
        &["Platform", "Payments", "Other"],
    )
    .revealing("Other", follow_up)])
    .after_submit("Thank you for applying!");
    let review = ScriptedReview::new(vec![
        ReviewDecision::Edit(vec![FieldEdit {
            field_id: "team".into(),
            value: "Developer Tools".into(),
        }]),
        ReviewDecision::Approve,
    ]);

    let record = flow(&config, store, Some(review), CancelFlag::new())
        .run(&form, job("24"), 24)
        .await
        .unwrap();

    assert_eq!(record.outcome, Outcome::Submitted);
    assert_eq!(form.value("team").as_deref(), Some("Other"));
    assert_eq!(form.value("team_other").as_deref(), Some("Corporate Website"));
    assert!(record
        .answers
        .iter()
        .any(|a| a.question == "If other, please specify" && a.tier == SourceTier::Predetermined));
}

#[tokio::test]
async fn anonymous_control_keeps_its_id_after_reveal() {
    let follow_up = ControlProbe {
        tag: "input".into(),
        input_type: "text".into(),
        id: "source_other".into(),
        label: "If other, please specify".into(),
        visible: true,
        ..Default::default()
    };
    let mut consent = FakeControl::text("", "I agree to the privacy policy");
    consent.probe.input_type = "checkbox".into();
    let form = FakeForm::new(vec![
        FakeControl::pseudo_select(
            "source",
            "How did you hear about us?",
            &["Company Website", "LinkedIn", "Referral", "Other"],
        )
        .revealing("Other", follow_up),
        consent,
    ]);
    let mut session = ApplicationSession::new(job("25"), 1);

    executor(resolver(None, Duration::from_secs(1)))
        .run(&form, &mut session, 25)
        .await
        .unwrap();

    assert!(session.has_field("source_other"));
    let unknown: Vec<&str> = session
        .fields()
        .iter()
        .filter(|f| f.kind == FieldKind::Unknown)
        .map(|f| f.id.as_str())
        .collect();
    assert_eq!(unknown.len(), 1);
    let classification_issues = session
        .issues()
        .iter()
        .filter(|i| matches!(i.error, FormError::ClassificationFailure { .. }))
        .count();
    assert_eq!(classification_issues, 1);
}
