use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::SessionCommand;

/// One-shot follow-up actions the session schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Post-restart settle broadcast of the full game state.
    BroadcastState,
    /// Round-start announcement.
    RoundStart,
    /// Place the participants at their spawn points.
    Teleport,
    /// Re-enter InProgress and begin the next round.
    NextRound,
    /// Tear down to Waiting after game completion.
    ResetAfterGame,
}

/// Schedules delayed, cancellable actions for the session actor.
///
/// Fired actions re-enter the actor through its command channel, so they
/// obey the same serialization as network events. Each carries the
/// generation it was scheduled under; the actor discards a fired timer
/// whose generation has moved on, which is how stopping a game cancels the
/// whole pending chain at once.
pub(crate) struct TimerSequencer {
    tx: mpsc::UnboundedSender<SessionCommand>,
    pending: Vec<JoinHandle<()>>,
}

impl TimerSequencer {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self {
            tx,
            pending: Vec::new(),
        }
    }

    pub(crate) fn schedule(&mut self, delay: Duration, action: TimerAction, generation: u64) {
        self.pending.retain(|h| !h.is_finished());
        let tx = self.tx.clone();
        self.pending.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionCommand::Timer { action, generation });
        }));
    }

    /// Abort anything still pending. Used at actor shutdown; stale-by-
    /// generation filtering covers everything else.
    pub(crate) fn abort_all(&mut self) {
        for handle in self.pending.drain(..) {
            handle.abort();
        }
    }
}
