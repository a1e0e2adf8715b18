use std::fmt;
use std::io::Write;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use kndu_types::{NodeCondition, NodeRecord};

/// Status reported while setting up, before polling starts
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusMessage {
    FoundNamespace(String),
    UsingContext(String),
    /// A node name followed by one `type: status` line per condition
    NodeConditions {
        node: String,
        conditions: Vec<NodeCondition>,
    },
}

impl StatusMessage {
    pub fn node_conditions(record: &NodeRecord) -> Self {
        Self::NodeConditions {
            node: record.name.clone(),
            conditions: record.conditions.clone(),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FoundNamespace(ns) => write!(f, "Found namespace: ({ns})"),
            Self::UsingContext(ctx) => write!(f, "Using context: ({ctx})"),
            Self::NodeConditions { node, conditions } => {
                write!(f, "{node}")?;
                for condition in conditions {
                    write!(f, "\n\t{}: {}", condition.kind, condition.status)?;
                }
                Ok(())
            }
        }
    }
}

/// Background task printing status messages
#[derive(Debug)]
pub struct StatusPrinter<W> {
    sender: mpsc::Sender<StatusMessage>,
    finish: CancellationToken,
    task: JoinHandle<W>,
}

impl<W: Write + Send + 'static> StatusPrinter<W> {
    pub fn spawn(out: W) -> Self {
        let (sender, receiver) = mpsc::channel(16);
        let finish = CancellationToken::new();
        let task = tokio::spawn(print_messages(out, receiver, finish.clone()));

        Self {
            sender,
            finish,
            task,
        }
    }

    /// Queue a message; dropped if the printer already stopped
    pub async fn send(&self, message: StatusMessage) {
        if self.sender.send(message).await.is_err() {
            tracing::debug!("status printer stopped, message dropped");
        }
    }

    /// Print what is still queued, stop the task and hand back the writer
    pub async fn finish(self) -> Option<W> {
        self.finish.cancel();
        drop(self.sender);
        self.task.await.ok()
    }
}

async fn print_messages<W: Write>(
    mut out: W,
    mut receiver: mpsc::Receiver<StatusMessage>,
    finish: CancellationToken,
) -> W {
    loop {
        tokio::select! {
            biased;

            message = receiver.recv() => match message {
                Some(message) => write_message(&mut out, &message),
                None => break,
            },

            _ = finish.cancelled() => {
                while let Ok(message) = receiver.try_recv() {
                    write_message(&mut out, &message);
                }
                break;
            }
        }
    }

    let _ = out.flush();
    out
}

fn write_message<W: Write>(out: &mut W, message: &StatusMessage) {
    if let Err(e) = writeln!(out, "  {message}") {
        tracing::warn!(error = %e, "failed to print status message");
    }
}
