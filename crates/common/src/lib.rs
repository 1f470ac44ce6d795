//! Shared event and invocation types used across all hermod crates.

pub mod types;

pub use types::{
    AgentInvocation, AgentReply, ChatType, InboundEvent, ReplyPayload,
};
