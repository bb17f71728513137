//! Transfer engine finite-state machine (FSM) types.
//!
//! Transitions live in [`crate::engine`]; this module only names the states.
//!
//! ```text
//!            ┌──────── round fully ACKed ────────┐
//!            ▼                                   │
//!  ──▶ FILLING ──round sent──▶ AWAITING_ACK ─────┤
//!                                 ▲    │         │ stream ACKed
//!                       resent    │    │ timer   ▼
//!                                 │    ▼       DONE ──▶ TEARDOWN ──▶ TERMINATED
//!                             RETRANSMITTING
//! ```

/// All possible states of one sending session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// The window has room; the next round is about to be sent.
    #[default]
    Filling,
    /// A round is in flight; waiting for an ACK or the timer.
    AwaitingAck,
    /// The timer fired; the whole in-flight window is about to be resent.
    Retransmitting,
    /// Every chunk has been acknowledged.
    Done,
    /// Emitting the TEARDOWN burst.
    Teardown,
    /// Session over.
    Terminated,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineState::Filling => "FILLING",
            EngineState::AwaitingAck => "AWAITING_ACK",
            EngineState::Retransmitting => "RETRANSMITTING",
            EngineState::Done => "DONE",
            EngineState::Teardown => "TEARDOWN",
            EngineState::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}
