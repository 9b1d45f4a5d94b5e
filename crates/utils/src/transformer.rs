//! In-pipeline message rewrites.
//!
//! Transformers run after an [`EmailMessage`] has been parsed from the raw
//! submission and before its sender is routed, each one modifying the
//! message in place. Concrete implementations live in the
//! [`transformers`](crate::transformers) module.

use tracing::debug;

use crate::EmailMessage;

/// Trait for message transformers that modify messages in the pipeline.
pub trait MessageTransformer: Send + Sync {
    /// Transforms a message in place.
    fn transform(&self, message: &mut EmailMessage);

    /// Returns the name of this transformer.
    fn name(&self) -> &str;
}

/// Applies a list of transformers to a message, in order.
pub fn apply_transformers(transformers: &[Box<dyn MessageTransformer>], message: &mut EmailMessage) {
    for transformer in transformers {
        debug!(
            message_id = %message.message_id,
            transformer = transformer.name(),
            "Applying transformer"
        );
        transformer.transform(message);
    }
}
