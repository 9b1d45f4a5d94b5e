//! Spam classification of parsed messages.
//!
//! A [`SpamClassifier`] decides whether a message is dropped instead of
//! dispatched. Classifiers are plain strategies so that new heuristics can
//! be added without touching the pipeline, the default one lives in the
//! [`classifiers`](crate::classifiers) module.

use tracing::debug;

use crate::{EmailMessage, SenderOptions};

/// Trait for spam heuristics evaluated against a routed message.
pub trait SpamClassifier: Send + Sync {
    /// Returns whether the message should be dropped as spam.
    ///
    /// The options resolved for the sender are provided for heuristics that
    /// depend on the outbound route, `None` when routing found nothing.
    fn is_spam(&self, message: &EmailMessage, options: Option<&SenderOptions>) -> bool;

    /// Returns the name of this classifier.
    fn name(&self) -> &str;
}

/// Classifier that flags a message as spam when any of its members does.
///
/// Members are evaluated in order and evaluation stops at the first match.
/// An empty chain never flags anything.
#[derive(Default)]
pub struct ClassifierChain {
    classifiers: Vec<Box<dyn SpamClassifier>>,
}

impl ClassifierChain {
    pub fn new(classifiers: Vec<Box<dyn SpamClassifier>>) -> Self {
        Self { classifiers }
    }

    /// Appends a classifier to the chain.
    pub fn with(mut self, classifier: Box<dyn SpamClassifier>) -> Self {
        self.classifiers.push(classifier);
        self
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }
}

impl SpamClassifier for ClassifierChain {
    fn is_spam(&self, message: &EmailMessage, options: Option<&SenderOptions>) -> bool {
        self.classifiers.iter().any(|classifier| {
            let spam = classifier.is_spam(message, options);
            if spam {
                debug!(
                    message_id = %message.message_id,
                    classifier = classifier.name(),
                    "Message flagged as spam"
                );
            }
            spam
        })
    }

    fn name(&self) -> &str {
        "chain"
    }
}
