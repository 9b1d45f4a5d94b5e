use tracing::debug;

use crate::{EmailMessage, MessageTransformer};

/// Transformer that merges recipients passed as command-line arguments into
/// the `to` header.
///
/// Sendmail callers may name recipients as plain arguments next to any
/// number of flags. Arguments starting with `-` are ignored, the remaining
/// ones containing an `@` are taken as addresses. When at least one address
/// is found the `to` header becomes those addresses followed by the header's
/// previous value, joined with `", "`. Otherwise the header is left untouched.
pub struct RecipientTransformer {
    recipients: Vec<String>,
}

impl RecipientTransformer {
    /// Creates a new [`RecipientTransformer`] from the process arguments,
    /// excluding the program name.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let recipients = args
            .into_iter()
            .map(Into::into)
            .filter(|arg| !arg.starts_with('-') && arg.contains('@'))
            .collect();
        Self { recipients }
    }

    /// Returns the addresses collected from the arguments.
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }
}

impl MessageTransformer for RecipientTransformer {
    fn transform(&self, message: &mut EmailMessage) {
        if self.recipients.is_empty() {
            return;
        }

        let mut to = self.recipients.clone();
        if let Some(existing) = message.to().filter(|to| !to.is_empty()) {
            to.push(existing.to_string());
        }
        let to = to.join(", ");

        debug!(
            message_id = %message.message_id,
            to = %to,
            "Merging command-line recipients"
        );
        message.set_to(&to);
    }

    fn name(&self) -> &str {
        "recipients"
    }
}
