//! Effects produced by state transitions

/// Side effects for the runtime to carry out after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the agent's event sequence for `prompt` and tag everything it
    /// yields with `generation`
    OpenStream { generation: u64, prompt: String },

    /// Stop observing the sequence that is currently being pumped
    CancelStream,

    /// Ask the agent to drop its session memory
    ResetAgent,

    /// Publish the current state to observers
    PublishSnapshot,
}

impl Effect {
    pub fn open_stream(generation: u64, prompt: impl Into<String>) -> Self {
        Effect::OpenStream {
            generation,
            prompt: prompt.into(),
        }
    }
}
