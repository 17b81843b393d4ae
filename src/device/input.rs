use crate::device::DeviceSession;
use crate::error::{DeckError, Result};
use crate::event::DeckEvent;
use elgato_streamdeck::StreamDeckInput;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Read button events from the panel, forwarding press/release transitions
/// to the broadcast channel.
pub async fn read_input_loop(
    session: DeviceSession,
    tx: broadcast::Sender<DeckEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let deck = session.deck.clone();
    let mut prev: Vec<bool> = Vec::new();

    loop {
        // read_input uses block_in_place internally, poll at 60Hz.
        let input = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            input = deck.read_input(60.0) => {
                input.map_err(|e| DeckError::Hid(e.to_string()))?
            }
        };

        match input {
            StreamDeckInput::ButtonStateChange(buttons) => {
                if prev.len() != buttons.len() {
                    prev = vec![false; buttons.len()];
                }
                for event in diff_events(&prev, &buttons) {
                    debug!("{event:?}");
                    let _ = tx.send(event);
                }
                prev = buttons;
            }
            StreamDeckInput::NoData => {}
            _ => {
                // Encoder, touchscreen — nothing is bound to them.
            }
        }
    }
}

/// The device reports the whole button state on every change; only the keys
/// that actually transitioned become events.
fn diff_events(prev: &[bool], next: &[bool]) -> Vec<DeckEvent> {
    next.iter()
        .enumerate()
        .filter(|&(idx, &pressed)| prev.get(idx).copied().unwrap_or(false) != pressed)
        .map(|(idx, &pressed)| {
            let key = idx as u8;
            if pressed {
                DeckEvent::ButtonDown(key)
            } else {
                DeckEvent::ButtonUp(key)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_yields_single_down_event() {
        let events = diff_events(&[false, false, false], &[false, true, false]);
        assert_eq!(events, vec![DeckEvent::ButtonDown(1)]);
    }

    #[test]
    fn held_key_does_not_retrigger_on_other_presses() {
        // Key 0 stays held while key 2 goes down.
        let events = diff_events(&[true, false, false], &[true, false, true]);
        assert_eq!(events, vec![DeckEvent::ButtonDown(2)]);
    }

    #[test]
    fn release_yields_up_event() {
        let events = diff_events(&[true, false], &[false, false]);
        assert_eq!(events, vec![DeckEvent::ButtonUp(0)]);
    }

    #[test]
    fn no_change_yields_nothing() {
        assert!(diff_events(&[true, false], &[true, false]).is_empty());
    }
}
