/// The corrective command reconciliation decides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Push the current configuration to the plugin; start afterwards if it
    /// still reports disabled.
    Reconfigure,
    /// Issue a stop command.
    Stop,
    /// Desired and actual already agree.
    Nothing,
}

/// Pure reconciliation decision: compares the desired tracking flag against
/// the plugin's freshly reported state.
pub fn plan(desired: bool, actual: bool) -> ReconcileAction {
    match (desired, actual) {
        (true, false) => ReconcileAction::Reconfigure,
        (true, true) => ReconcileAction::Nothing,
        (false, true) => ReconcileAction::Stop,
        (false, false) => ReconcileAction::Nothing,
    }
}

#[cfg(test)]
mod tests {
    use super::{plan, ReconcileAction};

    #[test]
    fn plan_matches_transition_table() {
        assert_eq!(plan(true, false), ReconcileAction::Reconfigure);
        assert_eq!(plan(true, true), ReconcileAction::Nothing);
        assert_eq!(plan(false, true), ReconcileAction::Stop);
        assert_eq!(plan(false, false), ReconcileAction::Nothing);
    }
}
