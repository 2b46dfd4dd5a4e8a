//! Automation brackets around user edits.
//!
//! Hosts record automation between a begin and an end marker. Continuous
//! controls bracket a whole drag gesture (one begin, many values, one end);
//! discrete controls bracket a single change with begin, value and end sent
//! back-to-back.
//!
//! [`AutomationBracket`] only tracks which parameters are inside a bracket.
//! Repeating a begin or an end is a no-op, so callers can invoke them
//! unconditionally; the bridge sends the host markers only on actual
//! transitions.

use std::cell::RefCell;
use std::collections::BTreeSet;

use beamer_bridge_core::ParameterId;

/// Per-parameter begin/end state.
#[derive(Debug, Default)]
pub struct AutomationBracket {
    changing: RefCell<BTreeSet<ParameterId>>,
}

impl AutomationBracket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the bracket. Returns `false` if it was already open.
    pub fn begin_change(&self, id: ParameterId) -> bool {
        self.changing.borrow_mut().insert(id)
    }

    /// Close the bracket. Returns `false` if it was not open.
    pub fn end_change(&self, id: ParameterId) -> bool {
        self.changing.borrow_mut().remove(&id)
    }

    /// Whether the parameter is inside a bracket.
    pub fn is_changing(&self, id: ParameterId) -> bool {
        self.changing.borrow().contains(&id)
    }

    /// Close every open bracket, returning the ids that were open.
    pub fn end_all(&self) -> Vec<ParameterId> {
        std::mem::take(&mut *self.changing.borrow_mut())
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_idempotent() {
        let bracket = AutomationBracket::new();
        assert!(bracket.begin_change(1));
        assert!(!bracket.begin_change(1));
        assert!(bracket.is_changing(1));
    }

    #[test]
    fn test_end_without_begin_is_noop() {
        let bracket = AutomationBracket::new();
        assert!(!bracket.end_change(1));
        bracket.begin_change(1);
        assert!(bracket.end_change(1));
        assert!(!bracket.end_change(1));
        assert!(!bracket.is_changing(1));
    }

    #[test]
    fn test_parameters_are_independent() {
        let bracket = AutomationBracket::new();
        bracket.begin_change(1);
        assert!(bracket.begin_change(2));
        bracket.end_change(1);
        assert!(bracket.is_changing(2));
    }

    #[test]
    fn test_end_all() {
        let bracket = AutomationBracket::new();
        bracket.begin_change(5);
        bracket.begin_change(2);
        assert_eq!(bracket.end_all(), vec![2, 5]);
        assert!(!bracket.is_changing(5));
        assert!(bracket.end_all().is_empty());
    }
}
