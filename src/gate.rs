use crate::lifecycle::VolumeLifecycleManager;
use crate::scene::VolumeId;

/// Current picks of the volume selectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub input: Option<VolumeId>,
    pub output: Option<VolumeId>,
}

pub struct ActionGate;

impl ActionGate {
    /// Enhancement needs an input volume.
    pub fn can_run(selection: &Selection) -> bool {
        selection.input.is_some()
    }

    /// Casting needs two different volumes.
    pub fn can_cast(selection: &Selection) -> bool {
        match (selection.input, selection.output) {
            (Some(input), Some(output)) => {
                VolumeLifecycleManager::validate_distinct_volumes(input, output)
            }
            _ => false,
        }
    }
}

/// State of a checkable action button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActionState {
    #[default]
    Idle,
    Running,
}

/// Marks an action as running and puts it back to idle when dropped,
/// whatever way the action ends.
pub(crate) struct RunningGuard<'a> {
    state: &'a mut ActionState,
}

impl<'a> RunningGuard<'a> {
    pub(crate) fn start(state: &'a mut ActionState) -> Option<Self> {
        if *state == ActionState::Running {
            return None;
        }
        *state = ActionState::Running;
        Some(Self { state })
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        *self.state = ActionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_needs_input() {
        assert!(!ActionGate::can_run(&Selection::default()));
        assert!(ActionGate::can_run(&Selection {
            input: Some(VolumeId(1)),
            output: None,
        }));
    }

    #[test]
    fn cast_needs_two_distinct_volumes() {
        let same = Selection {
            input: Some(VolumeId(1)),
            output: Some(VolumeId(1)),
        };
        assert!(!ActionGate::can_cast(&same));
        let half = Selection {
            input: Some(VolumeId(1)),
            output: None,
        };
        assert!(!ActionGate::can_cast(&half));
        let distinct = Selection {
            input: Some(VolumeId(1)),
            output: Some(VolumeId(2)),
        };
        assert!(ActionGate::can_cast(&distinct));
    }

    #[test]
    fn guard_resets_to_idle() {
        let mut state = ActionState::Idle;
        {
            let _guard = RunningGuard::start(&mut state).unwrap();
        }
        assert_eq!(state, ActionState::Idle);

        let mut running = ActionState::Running;
        assert!(RunningGuard::start(&mut running).is_none());
    }
}
