use crate::error::{ChatError, GatewayError};
use crate::gateway::AiGateway;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

pub const SUGGESTED_QUESTIONS: [&str; 4] = [
    "What should be in a basic emergency kit?",
    "How do I create a family evacuation plan?",
    "What's the best way to prepare for a power outage?",
    "How to stay safe during a wildfire?",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

/// Progress of one chat turn, in the order a turn produces them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    /// The gateway accepted the message; the model placeholder goes in.
    Opened,
    Chunk(String),
    Completed { session_id: String },
    Failed(GatewayError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTicket {
    turn: u64,
    history_len: usize,
    message: String,
}

impl ChatTicket {
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Preparedness chat history and session handle.
///
/// A turn appends the user message right away. The model message is created
/// empty once the reply opens and grows chunk by chunk. A failed turn removes
/// both again, so history only ever grows by complete user/model pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    session_id: Option<String>,
    turns: u64,
    pending: Option<u64>,
    opened: bool,
    error: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// A turn is in flight and no reply text has been placed yet.
    pub fn is_awaiting_reply(&self) -> bool {
        self.is_pending() && !self.opened
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_send(&mut self, text: &str) -> Result<ChatTicket, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.pending.is_some() {
            return Err(ChatError::Busy);
        }

        self.turns += 1;
        let ticket = ChatTicket {
            turn: self.turns,
            history_len: self.messages.len(),
            message: text.to_string(),
        };
        self.messages.push(ChatMessage {
            sender: Sender::User,
            text: text.to_string(),
        });
        self.pending = Some(ticket.turn);
        self.opened = false;
        self.error = None;
        Ok(ticket)
    }

    /// Apply one turn event. Events for a turn that is no longer pending are
    /// ignored and `false` is returned.
    pub fn apply(&mut self, ticket: &ChatTicket, event: ChatEvent) -> bool {
        if self.pending != Some(ticket.turn) {
            return false;
        }
        match event {
            ChatEvent::Opened => self.open_placeholder(),
            ChatEvent::Chunk(text) => {
                self.open_placeholder();
                if let Some(last) = self.messages.last_mut() {
                    last.text.push_str(&text);
                }
            }
            ChatEvent::Completed { session_id } => {
                self.open_placeholder();
                self.session_id = Some(session_id);
                self.pending = None;
                self.opened = false;
            }
            ChatEvent::Failed(err) => {
                tracing::error!(error = %err, "preparedness chat turn failed");
                self.messages.truncate(ticket.history_len);
                self.error = Some(ChatError::Gateway(err).to_string());
                self.pending = None;
                self.opened = false;
            }
        }
        true
    }

    pub async fn send<G>(&mut self, gateway: &G, text: &str) -> Result<(), ChatError>
    where
        G: AiGateway + ?Sized,
    {
        let ticket = self.begin_send(text)?;
        let session_id = self.session_id.clone();
        run_turn(gateway, session_id, &ticket, |event| {
            self.apply(&ticket, event);
        })
        .await
        .map_err(ChatError::from)
    }

    fn open_placeholder(&mut self) {
        if !self.opened {
            self.messages.push(ChatMessage {
                sender: Sender::Model,
                text: String::new(),
            });
            self.opened = true;
        }
    }
}

/// Drive one chat turn against the gateway, reporting progress to `apply`.
///
/// Single-shot gateways produce one chunk; streaming ones produce many. Either
/// way `apply` sees `Opened`, the chunks, then `Completed` or `Failed`.
pub async fn run_turn<G, F>(
    gateway: &G,
    session_id: Option<String>,
    ticket: &ChatTicket,
    mut apply: F,
) -> Result<(), GatewayError>
where
    G: AiGateway + ?Sized,
    F: FnMut(ChatEvent),
{
    let mut reply = match gateway.chat(session_id.as_deref(), ticket.message()).await {
        Ok(reply) => reply,
        Err(err) => {
            apply(ChatEvent::Failed(err.clone()));
            return Err(err);
        }
    };
    apply(ChatEvent::Opened);

    while let Some(chunk) = reply.chunks.next().await {
        match chunk {
            Ok(text) => apply(ChatEvent::Chunk(text)),
            Err(err) => {
                apply(ChatEvent::Failed(err.clone()));
                return Err(err);
            }
        }
    }

    apply(ChatEvent::Completed {
        session_id: reply.session_id,
    });
    Ok(())
}
