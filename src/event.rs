/// Events flowing through the broadcast channel connecting the input reader
/// to the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckEvent {
    /// A button was pressed.
    ButtonDown(u8),

    /// A button was released.
    ButtonUp(u8),
}
