//! Append-only answer history with clamped cursor navigation.

/// Every answer produced this session, newest last, plus a browsing cursor.
///
/// Entries are never reordered, edited or dropped.  The cursor is `None`
/// exactly while the history is empty and always lands inside
/// `0..entries.len()` otherwise, so navigation can never point at a missing
/// entry.
///
/// ```
/// use screen_solver::pipeline::AnswerHistory;
///
/// let mut history = AnswerHistory::new();
/// history.push("first");
/// history.push("second");
///
/// history.navigate(-1);
/// assert_eq!(history.current(), Some("first"));
///
/// history.navigate(-1); // clamps at the oldest entry
/// assert_eq!(history.cursor(), Some(0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AnswerHistory {
    entries: Vec<String>,
    cursor: Option<usize>,
}

impl AnswerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed answer and move the cursor onto it.
    pub fn push(&mut self, answer: impl Into<String>) {
        self.entries.push(answer.into());
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Move the cursor by `delta`, clamping at both ends.  No-op while empty.
    pub fn navigate(&mut self, delta: isize) {
        if let Some(cursor) = self.cursor {
            let last = self.entries.len() as isize - 1;
            let moved = (cursor as isize + delta).clamp(0, last);
            self.cursor = Some(moved as usize);
        }
    }

    /// The entry under the cursor, if any.
    pub fn current(&self) -> Option<&str> {
        self.cursor
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_with_no_cursor() {
        let history = AnswerHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), None);
        assert_eq!(history.current(), None);
    }

    #[test]
    fn push_appends_and_selects_the_newest_entry() {
        let mut history = AnswerHistory::new();
        history.push("a");
        history.push("b");
        history.push("c");

        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), Some(2));
        assert_eq!(history.current(), Some("c"));
    }

    #[test]
    fn navigate_moves_backwards_and_forwards() {
        let mut history = AnswerHistory::new();
        history.push("a");
        history.push("b");
        history.push("c");

        history.navigate(-2);
        assert_eq!(history.current(), Some("a"));
        history.navigate(1);
        assert_eq!(history.current(), Some("b"));
    }

    #[test]
    fn navigate_clamps_at_both_ends() {
        let mut history = AnswerHistory::new();
        history.push("a");
        history.push("b");

        history.navigate(-10);
        assert_eq!(history.cursor(), Some(0));
        history.navigate(10);
        assert_eq!(history.cursor(), Some(1));
    }

    #[test]
    fn navigate_on_empty_history_is_a_no_op() {
        let mut history = AnswerHistory::new();
        history.navigate(-1);
        history.navigate(1);
        assert_eq!(history.cursor(), None);
    }

    #[test]
    fn push_after_browsing_back_jumps_to_the_new_entry() {
        let mut history = AnswerHistory::new();
        history.push("a");
        history.push("b");
        history.navigate(-1);
        assert_eq!(history.current(), Some("a"));

        history.push("c");
        assert_eq!(history.cursor(), Some(2));
        assert_eq!(history.current(), Some("c"));
        // Earlier entries are still there, untouched.
        assert_eq!(history.len(), 3);
    }
}
