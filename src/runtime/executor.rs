//! Controller runtime executor

use super::traits::{Agent, AgentEventStream};
use super::{ControllerHandle, ControllerOptions};

use crate::state_machine::{
    transition, AgentEvent, ControllerContext, ControllerState, Effect, Event, Snapshot,
};
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Owns the controller state and carries out transition effects
pub struct ControllerRuntime {
    context: ControllerContext,
    state: ControllerState,
    agent: Option<Arc<dyn Agent>>,
    event_rx: mpsc::Receiver<Event>,
    /// Upgraded for each pump; weak so the runtime stops once all handles
    /// are gone
    event_tx: mpsc::WeakSender<Event>,
    snapshot_tx: watch::Sender<Snapshot>,
    broadcast_tx: broadcast::Sender<Snapshot>,
    /// Token of the pump draining the live sequence
    stream_cancel: Option<CancellationToken>,
    /// Latest agent reset; streams opened after it wait for it first
    pending_reset: Option<PendingReset>,
    reset_timeout: Duration,
}

type PendingReset = Shared<BoxFuture<'static, ()>>;

impl ControllerRuntime {
    pub fn new(
        agent: Option<Arc<dyn Agent>>,
        options: ControllerOptions,
    ) -> (Self, ControllerHandle) {
        let (event_tx, event_rx) = mpsc::channel(options.event_buffer.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let (broadcast_tx, _) = broadcast::channel(options.snapshot_buffer.max(1));

        let runtime = Self {
            context: ControllerContext::new(agent.is_some()),
            state: ControllerState::default(),
            agent,
            event_rx,
            event_tx: event_tx.downgrade(),
            snapshot_tx,
            broadcast_tx: broadcast_tx.clone(),
            stream_cancel: None,
            pending_reset: None,
            reset_timeout: options.reset_timeout,
        };
        let handle = ControllerHandle {
            event_tx,
            snapshot_rx,
            broadcast_tx,
        };
        (runtime, handle)
    }

    pub async fn run(mut self) {
        tracing::info!(has_agent = self.context.has_agent, "Starting controller runtime");

        // Events are folded strictly one at a time
        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event);
        }

        if let Some(token) = self.stream_cancel.take() {
            token.cancel();
        }
        tracing::info!("Controller runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        let effects = match transition(&mut self.state, &self.context, event) {
            Ok(effects) => effects,
            Err(e) => {
                tracing::debug!(error = %e, "Command rejected");
                return;
            }
        };

        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::OpenStream { generation, prompt } => self.open_stream(generation, prompt),

            Effect::CancelStream => {
                if let Some(token) = self.stream_cancel.take() {
                    tracing::debug!("Cancelling agent stream");
                    token.cancel();
                }
            }

            Effect::ResetAgent => self.reset_agent(),

            Effect::PublishSnapshot => {
                let snapshot = Snapshot::from(&self.state);
                self.snapshot_tx.send_replace(snapshot.clone());
                // No subscribers is fine
                let _ = self.broadcast_tx.send(snapshot);
            }
        }
    }

    fn open_stream(&mut self, generation: u64, prompt: String) {
        let Some(agent) = self.agent.clone() else {
            tracing::warn!(generation, "Asked to open a stream without an agent");
            return;
        };
        let Some(event_tx) = self.event_tx.upgrade() else {
            return;
        };

        if let Some(previous) = self.stream_cancel.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        self.stream_cancel = Some(cancel.clone());

        tracing::info!(generation, "Opening agent stream");
        tokio::spawn(pump_stream(
            agent,
            prompt,
            generation,
            self.pending_reset.clone(),
            event_tx,
            cancel,
        ));
    }

    /// Reset the agent off the event loop
    ///
    /// Resets run one after another and each is bounded by `reset_timeout`,
    /// so a stuck agent delays the next stream but never the controller.
    fn reset_agent(&mut self) {
        let Some(agent) = self.agent.clone() else {
            return;
        };
        let previous = self.pending_reset.take();
        let timeout = self.reset_timeout;

        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                previous.await;
            }
            if tokio::time::timeout(timeout, agent.reset()).await.is_err() {
                tracing::warn!(timeout_ms = %timeout.as_millis(), "Agent reset timed out");
            }
        });
        self.pending_reset = Some(task.map(|_| ()).boxed().shared());
    }
}

/// Drain one agent sequence into the controller's event channel
///
/// Stops at `done`, at the end of the sequence, on failure, or as soon as
/// `cancel` fires. Cancelling only stops polling; the sequence is dropped.
async fn pump_stream(
    agent: Arc<dyn Agent>,
    prompt: String,
    generation: u64,
    pending_reset: Option<PendingReset>,
    event_tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
) {
    // The agent must not see the prompt before the reset preceding it
    if let Some(reset) = pending_reset {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = reset => {}
        }
    }

    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        opened = agent.chat(&prompt) => opened,
    };

    let outcome = match opened {
        Ok(stream) => drain(stream, generation, &event_tx, &cancel).await,
        Err(e) => {
            tracing::warn!(generation, error = %e, "Failed to open agent stream");
            StreamOutcome::Ended(Some(e.describe()))
        }
    };

    let StreamOutcome::Ended(failure) = outcome else {
        tracing::debug!(generation, "Agent stream abandoned");
        return;
    };

    let _ = event_tx
        .send(Event::StreamEnded {
            generation,
            failure,
        })
        .await;
}

/// How a pump stopped
enum StreamOutcome {
    /// The sequence ran out, said `done`, or failed with the given text
    Ended(Option<String>),
    /// Cancelled, or the controller went away
    Abandoned,
}

/// Forward events until the sequence ends
async fn drain(
    mut stream: AgentEventStream,
    generation: u64,
    event_tx: &mpsc::Sender<Event>,
    cancel: &CancellationToken,
) -> StreamOutcome {
    let mut forwarded = 0usize;
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return StreamOutcome::Abandoned,
            next = stream.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                let finished = matches!(event, AgentEvent::Done);
                if cancel.is_cancelled()
                    || event_tx.send(Event::Agent { generation, event }).await.is_err()
                {
                    return StreamOutcome::Abandoned;
                }
                forwarded += 1;
                if finished {
                    tracing::info!(generation, events = forwarded, "Agent stream done");
                    return StreamOutcome::Ended(None);
                }
            }
            Some(Err(e)) => {
                tracing::warn!(generation, error = %e, "Agent stream failed");
                return StreamOutcome::Ended(Some(e.describe()));
            }
            None => {
                tracing::info!(generation, events = forwarded, "Agent stream exhausted");
                return StreamOutcome::Ended(None);
            }
        }
    }
}
