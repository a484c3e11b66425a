use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use crate::config::ProctorPolicy;

use super::api::{FullscreenControl, QuestionBank, ScoreSink};
use super::monitor::{IntegrityMonitor, SignalOutcome};
use super::timer::CountdownTimer;
use super::{
    IntegritySignal, ProctorError, SecurityWarning, SubmitReason, SubmittedAnswer, TestQuestion,
    TestResult, TestSection,
};

/// What a submit call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// This call won the submission gate and scoring succeeded.
    Submitted(TestResult),
    /// Another submission already ran or is in flight; nothing was sent.
    AlreadyHandled,
}

/// Mutable per-attempt state behind the runner mutex.
#[derive(Default)]
struct AttemptState {
    job_id: Option<Uuid>,
    sections: Vec<TestSection>,
    answers: HashMap<Uuid, usize>,
    violations: u32,
    warning: Option<SecurityWarning>,
    result: Option<TestResult>,
    submitted_for: Option<SubmitReason>,
    last_error: Option<String>,
}

pub(crate) struct Inner {
    bank: Arc<dyn QuestionBank>,
    sink: Arc<dyn ScoreSink>,
    screen: Arc<dyn FullscreenControl>,
    policy: ProctorPolicy,
    state: Mutex<AttemptState>,
    timer: CountdownTimer,
    /// Submission gate; latched before any await and released only when
    /// scoring fails.
    submitting: AtomicBool,
    closed: AtomicBool,
    /// Bumped by every load; stale monitor handles and timer expiries
    /// check it.
    attempt: AtomicU64,
}

impl Inner {
    /// Single violation-registration path behind [`IntegrityMonitor`].
    pub(crate) async fn register_violation(
        &self,
        attempt: u64,
        signal: IntegritySignal,
    ) -> SignalOutcome {
        if self.closed.load(Ordering::SeqCst)
            || attempt != self.attempt.load(Ordering::SeqCst)
            || self.submitting.load(Ordering::SeqCst)
        {
            return SignalOutcome::Ignored;
        }

        let warned = {
            let mut state = self.state.lock();
            if state.result.is_some() {
                return SignalOutcome::Ignored;
            }
            state.violations += 1;
            if state.violations > self.policy.violation_limit {
                None
            } else {
                let warning = SecurityWarning {
                    violations: state.violations,
                    remaining: self.policy.violation_limit - state.violations,
                };
                state.warning = Some(warning);
                Some(warning)
            }
        };

        match warned {
            Some(warning) => {
                warn!(
                    "🚨 {:?} reported ({} of {} allowed violations)",
                    signal, warning.violations, self.policy.violation_limit
                );
                SignalOutcome::Warned(warning)
            }
            None => {
                warn!("🚨 {:?} crossed the violation limit, submitting", signal);
                let _ = self.submit(attempt, SubmitReason::ViolationLimit).await;
                SignalOutcome::AutoSubmitted
            }
        }
    }

    pub(crate) async fn submit(
        &self,
        attempt: u64,
        reason: SubmitReason,
    ) -> Result<SubmitOutcome, ProctorError> {
        if self.closed.load(Ordering::SeqCst) || attempt != self.attempt.load(Ordering::SeqCst) {
            return Ok(SubmitOutcome::AlreadyHandled);
        }

        // Latched synchronously before the first await; a losing caller
        // never starts a second network round trip.
        if self
            .submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(SubmitOutcome::AlreadyHandled);
        }

        let (job_id, answers) = {
            let state = self.state.lock();
            if state.result.is_some() {
                // Finished attempts keep the gate latched.
                return Ok(SubmitOutcome::AlreadyHandled);
            }
            match state.job_id {
                Some(job_id) if !state.sections.is_empty() => (job_id, answer_sheet(&state)),
                _ => {
                    self.submitting.store(false, Ordering::SeqCst);
                    return Err(ProctorError::NotLoaded);
                }
            }
        };

        info!(
            "📤 Submitting test ({}, {} answers)",
            reason.as_str(),
            answers.len()
        );

        let scored = self.sink.submit(job_id, &answers).await;

        // A reload or close landing mid-flight supersedes this attempt;
        // the late outcome must not touch the fresh state or timer.
        if self.closed.load(Ordering::SeqCst) || attempt != self.attempt.load(Ordering::SeqCst) {
            return Ok(SubmitOutcome::AlreadyHandled);
        }

        match scored {
            Ok(result) => {
                self.timer.stop();
                {
                    let mut state = self.state.lock();
                    state.result = Some(result);
                    state.submitted_for = Some(reason);
                    state.warning = None;
                }
                if let Err(err) = self.screen.exit() {
                    warn!("Fullscreen exit failed: {}", err);
                }
                info!(
                    "✅ Test submitted: {}/{} ({})",
                    result.score,
                    result.max_score,
                    if result.passed { "passed" } else { "failed" }
                );
                Ok(SubmitOutcome::Submitted(result))
            }
            Err(err) => {
                let message = err.to_string();
                error!("Test submission failed: {}", message);
                self.state.lock().last_error = Some(message.clone());
                // The only path that releases the gate.
                self.submitting.store(false, Ordering::SeqCst);
                Err(ProctorError::SubmissionFailed(message))
            }
        }
    }
}

/// Client-side driver for a proctored multiple-choice test: loads the paper,
/// tracks answers and violations, counts the time budget down and submits
/// the answer sheet exactly once.
///
/// Dropping the runner closes it.
pub struct TestRunner {
    inner: Arc<Inner>,
}

impl TestRunner {
    pub fn new(
        bank: Arc<dyn QuestionBank>,
        sink: Arc<dyn ScoreSink>,
        screen: Arc<dyn FullscreenControl>,
        policy: ProctorPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                bank,
                sink,
                screen,
                policy,
                state: Mutex::new(AttemptState::default()),
                timer: CountdownTimer::new(),
                submitting: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                attempt: AtomicU64::new(0),
            }),
        }
    }

    /// Starts an attempt: resets local state, fetches and validates the
    /// paper, computes the time budget, requests fullscreen (best effort)
    /// and arms the countdown. Returns the scoped integrity monitor for
    /// this attempt. Safe to call repeatedly.
    pub async fn load(&self, job_id: Uuid) -> Result<IntegrityMonitor, ProctorError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(ProctorError::Closed);
        }

        // Invalidates monitors and timer expiries from earlier attempts.
        let attempt = self.inner.attempt.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.timer.stop();
        self.inner.submitting.store(false, Ordering::SeqCst);
        *self.inner.state.lock() = AttemptState {
            job_id: Some(job_id),
            ..AttemptState::default()
        };

        let payload = match self.inner.bank.fetch(job_id).await {
            Ok(payload) => payload,
            Err(err) => {
                let message = err.to_string();
                self.inner.state.lock().last_error = Some(message.clone());
                return Err(ProctorError::LoadFailed(message));
            }
        };

        let sections = match parse_sections(&payload) {
            Ok(sections) => sections,
            Err(err) => {
                self.inner.state.lock().last_error = Some(err.to_string());
                return Err(err);
            }
        };

        let question_count: usize = sections.iter().map(|s| s.questions.len()).sum();
        let budget = self.inner.policy.time_budget(question_count);
        self.inner.state.lock().sections = sections;

        if let Err(err) = self.inner.screen.enter() {
            warn!("Fullscreen request failed: {}", err);
        }

        let inner = Arc::clone(&self.inner);
        self.inner.timer.start(budget, move || async move {
            let _ = inner.submit(attempt, SubmitReason::Timeout).await;
        });

        info!(
            "🧪 Test loaded: {} questions, {} second budget",
            question_count, budget
        );
        Ok(IntegrityMonitor::new(Arc::clone(&self.inner), attempt))
    }

    /// Records a choice locally. Ignored once the attempt is over, a
    /// submission is in flight, or the question/option does not exist.
    pub fn select_answer(&self, question_id: Uuid, option_index: usize) {
        if self.inner.closed.load(Ordering::SeqCst) || self.inner.submitting.load(Ordering::SeqCst)
        {
            return;
        }
        let mut state = self.inner.state.lock();
        if state.result.is_some() {
            return;
        }
        let valid = state
            .sections
            .iter()
            .flat_map(|section| &section.questions)
            .any(|question| question.id == question_id && option_index < question.options.len());
        if !valid {
            return;
        }
        state.answers.insert(question_id, option_index);
    }

    /// Submits the answer sheet. At most one submission succeeds per
    /// attempt; concurrent and repeat calls are no-ops.
    pub async fn submit(&self, reason: SubmitReason) -> Result<SubmitOutcome, ProctorError> {
        let attempt = self.inner.attempt.load(Ordering::SeqCst);
        self.inner.submit(attempt, reason).await
    }

    /// Tears the attempt down: stops the countdown, goes inert for stale
    /// monitors and leaves fullscreen. Late ticks and signals are dropped.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.timer.stop();
        if let Err(err) = self.inner.screen.exit() {
            warn!("Fullscreen exit failed: {}", err);
        }
        info!("Test runner closed");
    }

    pub fn sections(&self) -> Vec<TestSection> {
        self.inner.state.lock().sections.clone()
    }

    pub fn question_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .sections
            .iter()
            .map(|section| section.questions.len())
            .sum()
    }

    pub fn selected_answer(&self, question_id: Uuid) -> Option<usize> {
        self.inner.state.lock().answers.get(&question_id).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.inner.state.lock().answers.len()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.inner.timer.remaining_seconds()
    }

    pub fn violations(&self) -> u32 {
        self.inner.state.lock().violations
    }

    pub fn warning(&self) -> Option<SecurityWarning> {
        self.inner.state.lock().warning
    }

    /// Clears the currently surfaced warning.
    pub fn acknowledge_warning(&self) {
        self.inner.state.lock().warning = None;
    }

    pub fn result(&self) -> Option<TestResult> {
        self.inner.state.lock().result
    }

    pub fn submit_reason(&self) -> Option<SubmitReason> {
        self.inner.state.lock().submitted_for
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.state.lock().last_error.clone()
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        self.close();
    }
}

/// Validates the served payload: a `sections` array of
/// `{title, questions: [{id, questionText, options}]}` with at least one
/// question overall.
fn parse_sections(payload: &Value) -> Result<Vec<TestSection>, ProctorError> {
    let sections = payload
        .get("sections")
        .and_then(Value::as_array)
        .ok_or_else(|| ProctorError::MalformedPaper("missing sections array".to_string()))?;

    let parsed: Vec<TestSection> = sections
        .iter()
        .map(|section| serde_json::from_value(section.clone()))
        .collect::<Result<_, _>>()
        .map_err(|e| ProctorError::MalformedPaper(e.to_string()))?;

    if parsed.iter().all(|section| section.questions.is_empty()) {
        return Err(ProctorError::MalformedPaper("no questions".to_string()));
    }
    Ok(parsed)
}

/// Every question of every section in order; unanswered ones map to `-1`.
fn answer_sheet(state: &AttemptState) -> Vec<SubmittedAnswer> {
    state
        .sections
        .iter()
        .flat_map(|section| &section.questions)
        .map(|question: &TestQuestion| SubmittedAnswer {
            question_id: question.id,
            selected_index: state
                .answers
                .get(&question.id)
                .map(|&choice| choice as i32)
                .unwrap_or(-1),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper_value() -> Value {
        serde_json::json!({
            "sections": [
                {
                    "title": "Quantitative",
                    "questions": [
                        { "id": Uuid::new_v4(), "questionText": "2 + 2?", "options": ["3", "4"] },
                        { "id": Uuid::new_v4(), "questionText": "3 * 3?", "options": ["9", "6"] }
                    ]
                },
                {
                    "title": "Logical",
                    "questions": [
                        { "id": Uuid::new_v4(), "questionText": "Odd one out?", "options": ["a", "b"] }
                    ]
                }
            ]
        })
    }

    #[test]
    fn test_parse_sections_accepts_sectioned_papers() {
        let sections = parse_sections(&paper_value()).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].questions.len(), 2);
        assert_eq!(sections[1].title, "Logical");
    }

    #[test]
    fn test_parse_sections_rejects_malformed_payloads() {
        // No sections key at all.
        let err = parse_sections(&serde_json::json!({ "data": [] })).unwrap_err();
        assert!(matches!(err, ProctorError::MalformedPaper(_)));

        // Sections present but not an array.
        let err = parse_sections(&serde_json::json!({ "sections": "nope" })).unwrap_err();
        assert!(matches!(err, ProctorError::MalformedPaper(_)));

        // Question rows missing required fields.
        let err = parse_sections(&serde_json::json!({
            "sections": [ { "title": "Quant", "questions": [ { "questionText": "?" } ] } ]
        }))
        .unwrap_err();
        assert!(matches!(err, ProctorError::MalformedPaper(_)));

        // Empty paper.
        let err = parse_sections(&serde_json::json!({
            "sections": [ { "title": "Quant", "questions": [] } ]
        }))
        .unwrap_err();
        assert!(matches!(err, ProctorError::MalformedPaper(_)));
    }

    #[test]
    fn test_answer_sheet_uses_sentinel_for_unanswered() {
        let sections = parse_sections(&paper_value()).unwrap();
        let first_question = sections[0].questions[0].id;
        let mut state = AttemptState {
            job_id: Some(Uuid::new_v4()),
            sections,
            ..AttemptState::default()
        };
        state.answers.insert(first_question, 1);

        let sheet = answer_sheet(&state);
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet[0].question_id, first_question);
        assert_eq!(sheet[0].selected_index, 1);
        assert_eq!(sheet[1].selected_index, -1);
        assert_eq!(sheet[2].selected_index, -1);
    }
}
