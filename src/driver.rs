// src/driver.rs - Headless mirror of the dashboard conversation flow.
//
// The browser drives the same lifecycle as the chat handlers; this module
// models it as an explicit state value so the accept/decline/copy loop can
// be exercised without a UI. Every user event is a transition method; no
// shared mutable globals.
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::models::chat::ContentType;

/// How long the keyword-edit affordance stays available after initiation.
pub const EDIT_WINDOW: Duration = Duration::from_secs(120);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("keywords are required")]
    EmptyKeywords,
    #[error("feedback cannot be empty")]
    EmptyFeedback,
    #[error("the keyword edit window has closed")]
    EditWindowClosed,
    #[error("{0} is not valid in the current state")]
    InvalidTransition(&'static str),
}

/// The comma-separated submission as an explicit batch with its own cursor,
/// decoupled from any single UI affordance.
#[derive(Debug, Clone)]
pub struct KeywordBatch {
    keywords: Vec<String>,
    index: usize,
    complete: bool,
}

impl KeywordBatch {
    pub fn parse(input: &str) -> Option<Self> {
        let keywords: Vec<String> = input
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        if keywords.is_empty() {
            None
        } else {
            Some(Self {
                keywords,
                index: 0,
                complete: false,
            })
        }
    }

    pub fn current(&self) -> Option<&str> {
        if self.complete {
            None
        } else {
            self.keywords.get(self.index).map(String::as_str)
        }
    }

    /// Move the cursor to the next keyword, marking the batch complete when
    /// the list is exhausted.
    pub fn advance(&mut self) -> Option<&str> {
        if self.complete {
            return None;
        }
        if self.index + 1 < self.keywords.len() {
            self.index += 1;
            self.keywords.get(self.index).map(String::as_str)
        } else {
            self.complete = true;
            None
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn remaining(&self) -> usize {
        if self.complete {
            0
        } else {
            self.keywords.len() - self.index
        }
    }

    pub fn joined(&self) -> String {
        self.keywords.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    /// News lookup in flight for the current keyword.
    AwaitingNews,
    /// The latest typed bot message awaits accept or decline.
    AwaitingDecision(ContentType),
    /// Decline pressed; feedback text not yet submitted.
    CollectingFeedback(ContentType),
    /// Rejection/remake round trip in flight.
    AwaitingRefinement(ContentType),
    /// News accepted; post drafting in flight.
    AwaitingContent,
    /// Post accepted; waiting for the copy confirmation.
    AwaitingCopy,
    Complete,
}

pub struct ConversationDriver {
    state: DriverState,
    batch: Option<KeywordBatch>,
    initiated_at: Option<Instant>,
    system_notes: Vec<String>,
}

impl ConversationDriver {
    pub fn new() -> Self {
        Self {
            state: DriverState::Idle,
            batch: None,
            initiated_at: None,
            system_notes: Vec::new(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn batch(&self) -> Option<&KeywordBatch> {
        self.batch.as_ref()
    }

    /// Inline failure notices shown in the transcript.
    pub fn system_notes(&self) -> &[String] {
        &self.system_notes
    }

    /// Input stays disabled while a request is in flight.
    pub fn is_processing(&self) -> bool {
        matches!(
            self.state,
            DriverState::AwaitingNews
                | DriverState::AwaitingContent
                | DriverState::AwaitingRefinement(_)
        )
    }

    /// Submit a keyword batch. Returns the first keyword to research.
    pub fn submit_keywords(&mut self, input: &str, now: Instant) -> Result<String, DriverError> {
        if !matches!(self.state, DriverState::Idle | DriverState::Complete) {
            return Err(DriverError::InvalidTransition("submit_keywords"));
        }
        let batch = KeywordBatch::parse(input).ok_or(DriverError::EmptyKeywords)?;
        let first = match batch.current() {
            Some(keyword) => keyword.to_string(),
            None => return Err(DriverError::EmptyKeywords),
        };
        self.batch = Some(batch);
        self.initiated_at = Some(now);
        self.state = DriverState::AwaitingNews;
        Ok(first)
    }

    /// News insights arrived; a decision is now pending.
    pub fn news_received(&mut self) -> Result<(), DriverError> {
        if self.state != DriverState::AwaitingNews {
            return Err(DriverError::InvalidTransition("news_received"));
        }
        self.state = DriverState::AwaitingDecision(ContentType::News);
        Ok(())
    }

    pub fn accept(&mut self) -> Result<(), DriverError> {
        match self.state {
            DriverState::AwaitingDecision(ContentType::News) => {
                self.state = DriverState::AwaitingContent;
                Ok(())
            }
            DriverState::AwaitingDecision(ContentType::Linkedin) => {
                self.state = DriverState::AwaitingCopy;
                Ok(())
            }
            _ => Err(DriverError::InvalidTransition("accept")),
        }
    }

    pub fn decline(&mut self) -> Result<(), DriverError> {
        match self.state {
            DriverState::AwaitingDecision(content_type) => {
                self.state = DriverState::CollectingFeedback(content_type);
                Ok(())
            }
            _ => Err(DriverError::InvalidTransition("decline")),
        }
    }

    /// Non-empty feedback starts the refinement round trip; empty feedback
    /// keeps the prompt open.
    pub fn submit_feedback(&mut self, feedback: &str) -> Result<(), DriverError> {
        let content_type = match self.state {
            DriverState::CollectingFeedback(content_type) => content_type,
            _ => return Err(DriverError::InvalidTransition("submit_feedback")),
        };
        if feedback.trim().is_empty() {
            return Err(DriverError::EmptyFeedback);
        }
        self.state = DriverState::AwaitingRefinement(content_type);
        Ok(())
    }

    pub fn cancel_feedback(&mut self) -> Result<(), DriverError> {
        match self.state {
            DriverState::CollectingFeedback(content_type) => {
                self.state = DriverState::AwaitingDecision(content_type);
                Ok(())
            }
            _ => Err(DriverError::InvalidTransition("cancel_feedback")),
        }
    }

    /// The refined message is back at the decision point, same content type.
    pub fn refinement_received(&mut self) -> Result<(), DriverError> {
        match self.state {
            DriverState::AwaitingRefinement(content_type) => {
                self.state = DriverState::AwaitingDecision(content_type);
                Ok(())
            }
            _ => Err(DriverError::InvalidTransition("refinement_received")),
        }
    }

    /// The drafted post arrived after a news acceptance.
    pub fn content_received(&mut self) -> Result<(), DriverError> {
        if self.state != DriverState::AwaitingContent {
            return Err(DriverError::InvalidTransition("content_received"));
        }
        self.state = DriverState::AwaitingDecision(ContentType::Linkedin);
        Ok(())
    }

    /// Copy confirmed on the accepted post. Advances the batch: the next
    /// keyword re-enters the news flow, an exhausted batch completes the run.
    pub fn copy_confirmed(&mut self) -> Result<Option<String>, DriverError> {
        if self.state != DriverState::AwaitingCopy {
            return Err(DriverError::InvalidTransition("copy_confirmed"));
        }
        let next = self
            .batch
            .as_mut()
            .and_then(|batch| batch.advance().map(str::to_string));
        match next {
            Some(keyword) => {
                self.state = DriverState::AwaitingNews;
                Ok(Some(keyword))
            }
            None => {
                self.state = DriverState::Complete;
                Ok(None)
            }
        }
    }

    /// Reopen the input populated with the submitted keywords. Only
    /// available inside the edit window after initiation.
    pub fn edit_keywords(&mut self, now: Instant) -> Result<String, DriverError> {
        if !self.can_edit(now) {
            return Err(DriverError::EditWindowClosed);
        }
        let text = self.batch.as_ref().map(KeywordBatch::joined).unwrap_or_default();
        self.state = DriverState::Idle;
        Ok(text)
    }

    pub fn can_edit(&self, now: Instant) -> bool {
        self.initiated_at
            .map(|started| now.saturating_duration_since(started) <= EDIT_WINDOW)
            .unwrap_or(false)
    }

    /// Record a surfaced failure as an inline system note and clear the
    /// processing gate so the user can retry.
    pub fn failure(&mut self, description: impl Into<String>) {
        self.system_notes.push(description.into());
        self.state = match self.state {
            DriverState::AwaitingNews => DriverState::Idle,
            DriverState::AwaitingContent => DriverState::AwaitingDecision(ContentType::News),
            DriverState::AwaitingRefinement(content_type) => {
                DriverState::AwaitingDecision(content_type)
            }
            other => other,
        };
    }
}

impl Default for ConversationDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_at_decision(input: &str) -> ConversationDriver {
        let mut driver = ConversationDriver::new();
        driver.submit_keywords(input, Instant::now()).unwrap();
        driver.news_received().unwrap();
        driver
    }

    #[test]
    fn happy_path_advances_through_both_keywords() {
        let mut driver = ConversationDriver::new();
        let first = driver.submit_keywords("solar, wind", Instant::now()).unwrap();
        assert_eq!(first, "solar");
        assert!(driver.is_processing());

        driver.news_received().unwrap();
        assert!(!driver.is_processing());
        driver.accept().unwrap();
        driver.content_received().unwrap();
        driver.accept().unwrap();

        let next = driver.copy_confirmed().unwrap();
        assert_eq!(next.as_deref(), Some("wind"));
        assert_eq!(driver.state(), DriverState::AwaitingNews);
        assert_eq!(driver.batch().unwrap().remaining(), 1);
    }

    #[test]
    fn copy_on_the_last_keyword_completes_the_batch() {
        let mut driver = driver_at_decision("solar");
        driver.accept().unwrap();
        driver.content_received().unwrap();
        driver.accept().unwrap();

        assert_eq!(driver.copy_confirmed().unwrap(), None);
        assert_eq!(driver.state(), DriverState::Complete);
        assert!(driver.batch().unwrap().is_complete());
    }

    #[test]
    fn decline_loops_back_to_the_same_decision_point() {
        let mut driver = driver_at_decision("solar");
        driver.decline().unwrap();
        driver.submit_feedback("needs harder numbers").unwrap();
        assert!(driver.is_processing());
        driver.refinement_received().unwrap();
        assert_eq!(
            driver.state(),
            DriverState::AwaitingDecision(ContentType::News)
        );
    }

    #[test]
    fn empty_feedback_keeps_the_prompt_open() {
        let mut driver = driver_at_decision("solar");
        driver.decline().unwrap();
        assert_eq!(
            driver.submit_feedback("   "),
            Err(DriverError::EmptyFeedback)
        );
        assert_eq!(
            driver.state(),
            DriverState::CollectingFeedback(ContentType::News)
        );
    }

    #[test]
    fn cancelling_feedback_restores_the_decision() {
        let mut driver = driver_at_decision("solar");
        driver.decline().unwrap();
        driver.cancel_feedback().unwrap();
        assert_eq!(
            driver.state(),
            DriverState::AwaitingDecision(ContentType::News)
        );
    }

    #[test]
    fn resubmission_is_blocked_while_processing() {
        let mut driver = ConversationDriver::new();
        driver.submit_keywords("solar", Instant::now()).unwrap();
        assert_eq!(
            driver.submit_keywords("wind", Instant::now()),
            Err(DriverError::InvalidTransition("submit_keywords"))
        );
    }

    #[test]
    fn blank_submissions_are_rejected() {
        let mut driver = ConversationDriver::new();
        assert_eq!(
            driver.submit_keywords("  ,  ", Instant::now()),
            Err(DriverError::EmptyKeywords)
        );
        assert_eq!(driver.state(), DriverState::Idle);
    }

    #[test]
    fn edit_window_closes_after_two_minutes() {
        let mut driver = ConversationDriver::new();
        let start = Instant::now();
        driver.submit_keywords("solar, wind", start).unwrap();

        assert!(driver.can_edit(start + Duration::from_secs(119)));
        assert!(!driver.can_edit(start + Duration::from_secs(121)));

        let text = driver.edit_keywords(start + Duration::from_secs(30)).unwrap();
        assert_eq!(text, "solar, wind");
        assert_eq!(driver.state(), DriverState::Idle);
    }

    #[test]
    fn edit_is_unavailable_before_any_submission() {
        let driver = ConversationDriver::new();
        assert!(!driver.can_edit(Instant::now()));
    }

    #[test]
    fn failure_resets_the_processing_gate() {
        let mut driver = driver_at_decision("solar");
        driver.accept().unwrap();
        driver.failure("Unable to draft the post. Please try again.");

        assert!(!driver.is_processing());
        assert_eq!(
            driver.state(),
            DriverState::AwaitingDecision(ContentType::News)
        );
        assert_eq!(driver.system_notes().len(), 1);
    }
}
