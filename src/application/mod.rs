//! Application layer - Services orchestrating domain operations across ports.

pub mod orchestrator;
pub mod sessions;

pub use orchestrator::{
    ChatTurn, ConverseTurn, GenerateTurn, RefineTurn, TurnOrchestrator, TurnOutcome,
    MAX_MESSAGE_LENGTH,
};
pub use sessions::{CreateSessionCommand, SessionService};
