use crate::event::DeckEvent;

/// Key reserved for the CPU readout. Pressing it does nothing.
pub const METRIC_KEY: u8 = 7;

/// Static key → OBS hotkey table. Adding a binding is a data change here,
/// not a new branch in the dispatcher.
pub const ACTION_BINDINGS: &[(u8, &str)] = &[
    (0, "split"),
    (1, "skip"),
    (2, "undo"),
    (3, "next-comparison"),
    (4, "previous-comparison"),
    (5, "toggle-timing-method"),
    (6, "reset"),
];

/// Look up the hotkey bound to a key index.
#[must_use]
pub fn action_for_key(key: u8) -> Option<&'static str> {
    ACTION_BINDINGS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, action)| *action)
}

/// Map an input event to the hotkey it should trigger, if any.
/// Releases and unbound keys map to nothing.
#[must_use]
pub fn action_for_event(event: DeckEvent) -> Option<&'static str> {
    match event {
        DeckEvent::ButtonDown(key) => action_for_key(key),
        DeckEvent::ButtonUp(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_binding_resolves_to_its_own_action() {
        for &(key, action) in ACTION_BINDINGS {
            assert_eq!(action_for_key(key), Some(action));
            assert_eq!(action_for_event(DeckEvent::ButtonDown(key)), Some(action));
        }
    }

    #[test]
    fn metric_key_is_unbound() {
        assert_eq!(action_for_key(METRIC_KEY), None);
        assert_eq!(action_for_event(DeckEvent::ButtonDown(METRIC_KEY)), None);
    }

    #[test]
    fn out_of_range_key_is_unbound() {
        assert_eq!(action_for_key(99), None);
        assert_eq!(action_for_event(DeckEvent::ButtonDown(99)), None);
    }

    #[test]
    fn releases_never_trigger() {
        for key in 0..=99u8 {
            assert_eq!(action_for_event(DeckEvent::ButtonUp(key)), None);
        }
    }
}
