//! Runtime invariant checks with contract-test support
//!
//! Publishing code asserts its invariants through [`assert_invariant!`]. Every
//! check is recorded per thread so tests can prove, with [`contract_test`],
//! that an operation actually exercised the invariants it is meant to uphold.
//!
//! ```rust,ignore
//! use crabcast::invariant_ppt::*;
//!
//! assert_invariant!(
//!     slots_for_codec <= 1,
//!     "At most one simulcast entry per codec",
//!     "CodecNegotiator::add_simulcast_track"
//! );
//!
//! #[test]
//! fn contract_negotiator() {
//!     // ... drive the negotiator ...
//!     contract_test("negotiator", &["At most one simulcast entry per codec"]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::thread_local;

thread_local! {
    // message -> context of the most recent check
    static CHECKED: RefCell<BTreeMap<String, String>> = RefCell::new(BTreeMap::new());
}

/// Assert an invariant and record that it was checked.
///
/// # Panics
/// Panics if the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__check_invariant($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__check_invariant($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __check_invariant(condition: bool, message: &str, context: Option<&str>) {
    let ctx = context.unwrap_or("unknown");
    CHECKED.with(|checked| {
        checked
            .borrow_mut()
            .insert(message.to_string(), ctx.to_string());
    });

    if !condition {
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// Invariants checked on this thread so far, with the context that last checked them.
pub fn checked_invariants() -> Vec<(String, String)> {
    CHECKED.with(|checked| {
        checked
            .borrow()
            .iter()
            .map(|(m, c)| (m.clone(), c.clone()))
            .collect()
    })
}

/// Fail unless every listed invariant was checked on this thread.
///
/// # Panics
/// Panics listing the invariants that were never checked.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let missing: Vec<&str> = CHECKED.with(|checked| {
        let checked = checked.borrow();
        required_invariants
            .iter()
            .copied()
            .filter(|inv| !checked.contains_key(*inv))
            .collect()
    });

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: invariants never checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

pub fn clear_invariant_log() {
    CHECKED.with(|checked| checked.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_invariant_is_recorded() {
        clear_invariant_log();
        assert_invariant!(true, "always holds", "tests");
        contract_test("recorded", &["always holds"]);
        assert_eq!(
            checked_invariants(),
            vec![("always holds".to_string(), "tests".to_string())]
        );
    }

    #[test]
    #[should_panic(expected = "CONTRACT FAILURE")]
    fn test_missing_invariant_fails_contract() {
        clear_invariant_log();
        contract_test("missing", &["never checked"]);
    }

    #[test]
    #[should_panic(expected = "INVARIANT VIOLATION [tests]")]
    fn test_violation_panics() {
        assert_invariant!(false, "cannot hold", "tests");
    }
}
