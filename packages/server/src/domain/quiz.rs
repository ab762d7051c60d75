//! Quiz records kept by the external quiz store: questions, answers, scores.

use serde::{Deserialize, Serialize};

use super::{
    error::ValueObjectError,
    value_object::{AnswerText, DisplayName, ParticipantId, Timestamp},
};

/// Longest time limit a question may carry (one hour)
pub const MAX_TIME_LIMIT_SECS: u32 = 3600;

/// Most points a single question may award
pub const MAX_POINTS: u32 = 100_000;

/// A quiz question, including its correct answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    /// Multiple-choice options. Empty for free-text questions.
    pub options: Vec<String>,
    pub correct_answer: String,
    /// Maximum points for a correct answer
    pub points: u32,
    pub time_limit_secs: u32,
}

impl Question {
    /// Create a validated question.
    ///
    /// # Errors
    ///
    /// Fails on empty text, points above [`MAX_POINTS`], an out-of-range time
    /// limit, or a correct answer missing from a non-empty option list.
    pub fn new(
        text: String,
        options: Vec<String>,
        correct_answer: String,
        points: u32,
        time_limit_secs: u32,
    ) -> Result<Self, ValueObjectError> {
        if text.trim().is_empty() {
            return Err(ValueObjectError::QuestionTextEmpty);
        }
        if points > MAX_POINTS {
            return Err(ValueObjectError::PointsTooHigh {
                max: MAX_POINTS,
                actual: points,
            });
        }
        if time_limit_secs == 0 || time_limit_secs > MAX_TIME_LIMIT_SECS {
            return Err(ValueObjectError::TimeLimitOutOfRange {
                max: MAX_TIME_LIMIT_SECS,
                actual: time_limit_secs,
            });
        }
        if !options.is_empty() && !options.iter().any(|o| o == &correct_answer) {
            return Err(ValueObjectError::CorrectAnswerNotInOptions(correct_answer));
        }
        Ok(Self {
            text,
            options,
            correct_answer,
            points,
            time_limit_secs,
        })
    }

    /// Score an answer.
    ///
    /// Correct answers earn between 100% (instant) and 50% (at or past the
    /// time limit) of `points`, decreasing linearly. Wrong answers earn 0.
    pub fn score(
        &self,
        answer: &AnswerText,
        time_taken_ms: u64,
        time_limit_secs: u32,
    ) -> (bool, u32) {
        if !answer.matches(&self.correct_answer) {
            return (false, 0);
        }
        let limit_ms = u64::from(time_limit_secs.max(1)) * 1000;
        let taken = time_taken_ms.min(limit_ms);
        let full = u64::from(self.points);
        let earned = full - (full * taken) / (2 * limit_ms);
        (true, earned as u32)
    }
}

/// One participant's cumulative result in a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub participant_id: ParticipantId,
    pub display_name: DisplayName,
    pub score: u32,
    pub answers: usize,
    pub joined_at: Timestamp,
}

/// A single evaluated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub participant_id: ParticipantId,
    pub question_index: usize,
    pub answer: AnswerText,
    pub is_correct: bool,
    pub points_earned: u32,
    pub time_taken_ms: u64,
    pub answered_at: Timestamp,
}

/// Sort for display: score descending, then display name.
pub fn rank_scores(entries: &mut [ScoreEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.display_name.as_str().cmp(b.display_name.as_str()))
    });
}
