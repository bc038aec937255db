//! Compilation step vocabulary shared by the stepper, the packager and errors

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepId {
    Order,
    Pagination,
    Indexation,
    Bookmarking,
    Ocr,
}

impl StepId {
    /// Fixed step sequence
    pub const ALL: [StepId; 5] = [
        StepId::Order,
        StepId::Pagination,
        StepId::Indexation,
        StepId::Bookmarking,
        StepId::Ocr,
    ];

    pub fn skippable(&self) -> bool {
        match self {
            StepId::Order | StepId::Ocr => false,
            StepId::Pagination | StepId::Indexation | StepId::Bookmarking => true,
        }
    }

    pub fn position(&self) -> usize {
        *self as usize
    }

    pub fn next(&self) -> Option<StepId> {
        Self::ALL.get(self.position() + 1).copied()
    }

    pub fn previous(&self) -> Option<StepId> {
        self.position().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn name(&self) -> &'static str {
        match self {
            StepId::Order => "order",
            StepId::Pagination => "pagination",
            StepId::Indexation => "indexation",
            StepId::Bookmarking => "bookmarking",
            StepId::Ocr => "ocr",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Current,
    Completed,
    Skipped,
}

impl StepStatus {
    /// Completed or skipped: the stepper may move past it
    pub fn is_settled(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_sequence() {
        assert_eq!(StepId::Order.next(), Some(StepId::Pagination));
        assert_eq!(StepId::Ocr.next(), None);
        assert_eq!(StepId::Order.previous(), None);
        assert_eq!(StepId::Ocr.previous(), Some(StepId::Bookmarking));
    }

    #[test]
    fn test_only_order_and_ocr_are_mandatory() {
        let mandatory: Vec<_> = StepId::ALL.iter().filter(|s| !s.skippable()).collect();
        assert_eq!(mandatory, vec![&StepId::Order, &StepId::Ocr]);
    }
}
