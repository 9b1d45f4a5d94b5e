//! Dispatch of routed messages to an outbound transport.
//!
//! The [`Dispatcher`] builds a transport from the resolved
//! [`SenderOptions`], sends the message on a background task and hands the
//! resulting [`DispatchOutcome`] to an [`OutcomeReporter`]. Callers get a
//! [`PendingDispatch`] back immediately and are never told about failures,
//! those end up in the outcome record.

use std::{
    future::Future,
    panic::{catch_unwind, AssertUnwindSafe},
    pin::Pin,
    sync::Arc,
};

use serde_json::Value;
use thiserror::Error;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, error, info};

use crate::{EmailMessage, SenderOptions};

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Boxed future returned by [`MailTransport::send`], resolving to the
/// transport's acknowledgment.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = DispatchResult<String>> + Send + 'a>>;

/// Errors that can occur while dispatching a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Routing resolved no options for the sender, not even a default.
    #[error("No sender options resolved for the message")]
    NoSenderOptions,

    /// The transport configuration could not be interpreted.
    #[error("Invalid transport configuration: {0}")]
    InvalidTransport(String),

    /// The message could not be turned into a sendable mail.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The transport failed to deliver the message.
    #[error("Transport error: {0}")]
    Transport(String),

    /// No async runtime was available to run the send.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Trait for outbound transports able to deliver a message.
pub trait MailTransport: Send + Sync {
    /// Sends the message, resolving to the transport's acknowledgment.
    fn send<'a>(&'a self, message: &'a EmailMessage) -> TransportFuture<'a>;

    /// Returns the name of this transport.
    fn name(&self) -> &str;
}

/// Trait for factories building a transport from its opaque configuration.
pub trait TransportFactory: Send + Sync {
    /// Creates a transport from the `transport` value of the sender options.
    fn create(&self, transport: &Value) -> DispatchResult<Box<dyn MailTransport>>;
}

/// Result of one dispatch attempt.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The transport accepted the message.
    Sent {
        acknowledgment: String,
        message: EmailMessage,
    },

    /// The message could not be delivered and is lost.
    Lost {
        error: DispatchError,
        message: EmailMessage,
        options: Option<SenderOptions>,
    },
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent { .. })
    }

    pub fn message(&self) -> &EmailMessage {
        match self {
            DispatchOutcome::Sent { message, .. } | DispatchOutcome::Lost { message, .. } => {
                message
            }
        }
    }
}

/// Trait for sinks recording dispatch outcomes.
pub trait OutcomeReporter: Send + Sync {
    /// Records the outcome of a dispatch attempt.
    fn report(&self, outcome: &DispatchOutcome);
}

/// Reporter that records outcomes as `tracing` events.
///
/// Lost messages are logged at error level together with the full message,
/// so they can be recovered by hand, sent messages at info level.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl OutcomeReporter for TracingReporter {
    fn report(&self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Sent {
                acknowledgment,
                message,
            } => {
                info!(
                    message_id = %message.message_id,
                    from = message.from().unwrap_or_default(),
                    to = message.to().unwrap_or_default(),
                    acknowledgment = %acknowledgment,
                    "Email sent"
                );
            }
            DispatchOutcome::Lost {
                error,
                message,
                options,
            } => match serde_json::to_string(message) {
                Ok(email) => {
                    error!(
                        message_id = %message.message_id,
                        from = message.from().unwrap_or_default(),
                        to = message.to().unwrap_or_default(),
                        error = %error,
                        routed = options.is_some(),
                        email = %email,
                        "Email lost"
                    );
                }
                Err(e) => {
                    eprintln!(
                        "Email lost ({error}), failed to serialize message {}: {e}\n{message:?}",
                        message.message_id
                    );
                }
            },
        }
    }
}

/// Handle on a dispatch that may still be running.
///
/// Dropping the handle does not cancel the send, [`settle`](Self::settle)
/// waits for it, which keeps a short-lived process alive until the outcome
/// has been recorded.
#[derive(Debug)]
pub struct PendingDispatch {
    state: PendingState,
}

#[derive(Debug)]
enum PendingState {
    Nothing,
    Settled(Box<DispatchOutcome>),
    Running(JoinHandle<DispatchOutcome>),
}

impl PendingDispatch {
    /// A handle for a message that was never dispatched.
    pub fn nothing() -> Self {
        Self {
            state: PendingState::Nothing,
        }
    }

    /// A handle for a dispatch that already finished.
    pub fn settled(outcome: DispatchOutcome) -> Self {
        Self {
            state: PendingState::Settled(Box::new(outcome)),
        }
    }

    fn running(handle: JoinHandle<DispatchOutcome>) -> Self {
        Self {
            state: PendingState::Running(handle),
        }
    }

    /// Returns whether a dispatch was attempted for the message.
    pub fn is_dispatched(&self) -> bool {
        !matches!(self.state, PendingState::Nothing)
    }

    /// Waits for the dispatch to finish, returning its outcome.
    ///
    /// Returns `None` when nothing was dispatched or the send task died
    /// before producing an outcome.
    pub async fn settle(self) -> Option<DispatchOutcome> {
        match self.state {
            PendingState::Nothing => None,
            PendingState::Settled(outcome) => Some(*outcome),
            PendingState::Running(handle) => match handle.await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!(error = %e, "Dispatch task failed before reporting");
                    None
                }
            },
        }
    }
}

/// Sends messages through transports built from their sender options.
#[derive(Clone)]
pub struct Dispatcher {
    factory: Arc<dyn TransportFactory>,
    reporter: Arc<dyn OutcomeReporter>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a new [`Dispatcher`] with the given transport factory and
    /// outcome reporter.
    pub fn new(factory: Arc<dyn TransportFactory>, reporter: Arc<dyn OutcomeReporter>) -> Self {
        Self { factory, reporter }
    }

    /// Dispatches the message without waiting for the send to complete.
    ///
    /// Without options the dispatch fails immediately and no transport is
    /// built. Otherwise the send runs on a task of the current Tokio
    /// runtime. Exactly one outcome is reported either way.
    pub fn dispatch(&self, message: EmailMessage, options: Option<SenderOptions>) -> PendingDispatch {
        let Some(options) = options else {
            return self.settle_now(DispatchOutcome::Lost {
                error: DispatchError::NoSenderOptions,
                message,
                options: None,
            });
        };

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                return self.settle_now(DispatchOutcome::Lost {
                    error: DispatchError::Runtime(e.to_string()),
                    message,
                    options: Some(options),
                });
            }
        };

        let factory = self.factory.clone();
        let reporter = self.reporter.clone();
        let handle = runtime.spawn(async move {
            let outcome = send(factory.as_ref(), message, options).await;
            report_outcome(reporter.as_ref(), &outcome);
            outcome
        });
        PendingDispatch::running(handle)
    }

    fn settle_now(&self, outcome: DispatchOutcome) -> PendingDispatch {
        report_outcome(self.reporter.as_ref(), &outcome);
        PendingDispatch::settled(outcome)
    }
}

/// Builds the transport for the options and sends the message through it.
pub async fn send(
    factory: &dyn TransportFactory,
    message: EmailMessage,
    options: SenderOptions,
) -> DispatchOutcome {
    let transport = match factory.create(&options.transport) {
        Ok(transport) => transport,
        Err(error) => {
            return DispatchOutcome::Lost {
                error,
                message,
                options: Some(options),
            }
        }
    };

    debug!(
        message_id = %message.message_id,
        transport = transport.name(),
        "Sending email"
    );
    match transport.send(&message).await {
        Ok(acknowledgment) => DispatchOutcome::Sent {
            acknowledgment,
            message,
        },
        Err(error) => DispatchOutcome::Lost {
            error,
            message,
            options: Some(options),
        },
    }
}

/// Hands the outcome to the reporter, falling back to standard error when
/// the reporter itself fails.
pub fn report_outcome(reporter: &dyn OutcomeReporter, outcome: &DispatchOutcome) {
    if catch_unwind(AssertUnwindSafe(|| reporter.report(outcome))).is_err() {
        eprintln!("Failed to record dispatch outcome: {outcome:?}");
    }
}
