/// User-facing failures from the start/stop commands. Returned to the
/// caller as a reply, never logged as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A game is already running.
    AlreadyActive,
    /// Too few connected players to start.
    NotEnoughPlayers { required: usize, connected: usize },
    /// Stop requested while no game is running.
    NoActiveGame,
    /// The session actor has shut down.
    SessionClosed,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "Game is already active!"),
            Self::NotEnoughPlayers {
                required,
                connected,
            } => write!(
                f,
                "Need at least {required} players to start. Currently: {connected}"
            ),
            Self::NoActiveGame => write!(f, "No game is currently active."),
            Self::SessionClosed => write!(f, "Chase session is not running."),
        }
    }
}

impl std::error::Error for CommandError {}
