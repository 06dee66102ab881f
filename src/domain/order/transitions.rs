use super::errors::OrderError;
use super::value_objects::OrderStatus;

// ============================================================================
// Status Transition Policy
// ============================================================================
//
//   received -> in_progress -> ready -> delivered
//        \            \           \
//         +------------+-----------+--> cancelled
//
// Delivered and cancelled are terminal. Staying in place is allowed.
//
// ============================================================================

pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    if from.is_terminal() {
        return false;
    }

    if to == OrderStatus::Cancelled {
        return true;
    }

    match (from.workflow_index(), to.workflow_index()) {
        (Some(from_index), Some(to_index)) => to_index >= from_index,
        _ => false,
    }
}

pub fn ensure_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
    if is_valid_transition(from, to) {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition { from, to })
    }
}

/// Resolve a requested status against the current one.
///
/// Returns the status to persist, or `None` when nothing changes.
pub fn plan_status_change(
    current: OrderStatus,
    requested: Option<OrderStatus>,
) -> Result<Option<OrderStatus>, OrderError> {
    match requested {
        Some(to) if to != current => {
            ensure_transition(current, to)?;
            Ok(Some(to))
        }
        _ => Ok(None),
    }
}

/// Delivered orders are kept for the record.
pub fn ensure_deletable(status: OrderStatus) -> Result<(), OrderError> {
    if status == OrderStatus::Delivered {
        return Err(OrderError::Conflict(
            "delivered orders cannot be deleted".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::OrderStatus::*;

    #[test]
    fn test_forward_moves_allowed() {
        assert!(is_valid_transition(Received, InProgress));
        assert!(is_valid_transition(Received, Ready));
        assert!(is_valid_transition(Received, Delivered));
        assert!(is_valid_transition(InProgress, Ready));
        assert!(is_valid_transition(Ready, Delivered));
    }

    #[test]
    fn test_backward_moves_rejected() {
        assert!(!is_valid_transition(Ready, Received));
        assert!(!is_valid_transition(Ready, InProgress));
        assert!(!is_valid_transition(InProgress, Received));
    }

    #[test]
    fn test_monotonic_over_workflow() {
        for from in OrderStatus::WORKFLOW {
            if from == Delivered {
                continue;
            }
            for to in OrderStatus::WORKFLOW {
                let expected = to.workflow_index() >= from.workflow_index();
                assert_eq!(is_valid_transition(from, to), expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_staying_in_place_allowed_for_open_states() {
        assert!(is_valid_transition(Received, Received));
        assert!(is_valid_transition(InProgress, InProgress));
        assert!(is_valid_transition(Ready, Ready));
    }

    #[test]
    fn test_terminal_states_are_locked() {
        for to in OrderStatus::ALL {
            assert!(!is_valid_transition(Delivered, to), "delivered -> {}", to);
            assert!(!is_valid_transition(Cancelled, to), "cancelled -> {}", to);
        }
    }

    #[test]
    fn test_cancellation_reachable_from_open_states() {
        assert!(is_valid_transition(Received, Cancelled));
        assert!(is_valid_transition(InProgress, Cancelled));
        assert!(is_valid_transition(Ready, Cancelled));
    }

    #[test]
    fn test_ensure_transition_carries_both_states() {
        match ensure_transition(Delivered, Cancelled) {
            Err(OrderError::InvalidTransition { from, to }) => {
                assert_eq!(from, Delivered);
                assert_eq!(to, Cancelled);
            }
            other => panic!("expected invalid transition, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_status_change() {
        assert_eq!(plan_status_change(Received, None).unwrap(), None);
        assert_eq!(plan_status_change(Ready, Some(Ready)).unwrap(), None);
        assert_eq!(plan_status_change(Received, Some(Ready)).unwrap(), Some(Ready));
        assert!(plan_status_change(Ready, Some(Received)).is_err());
    }

    #[test]
    fn test_same_status_on_terminal_order_is_a_no_op() {
        assert_eq!(plan_status_change(Delivered, Some(Delivered)).unwrap(), None);
    }

    #[test]
    fn test_deletion_guard() {
        assert!(matches!(ensure_deletable(Delivered), Err(OrderError::Conflict(_))));
        for status in [Received, InProgress, Ready, Cancelled] {
            assert!(ensure_deletable(status).is_ok());
        }
    }
}
