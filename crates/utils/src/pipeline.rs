//! End-to-end processing of one submission.
//!
//! A [`Pipeline`] turns the raw text handed over by a sendmail caller into a
//! dispatched message: it parses the submission, applies the transformers,
//! resolves the sender's transport from a freshly loaded routing table,
//! drops spam and finally hands the message to the [`Dispatcher`].

use std::{path::PathBuf, sync::Arc};

use tracing::{debug, info};

use crate::{
    apply_transformers, load_routing_table, resolve_sender_options, CjkSubjectClassifier,
    ClassifierChain, Config, Dispatcher, EmailMessage, MessageTransformer, PendingDispatch,
    RecipientTransformer, SmtpTransportFactory, SpamClassifier, TracingReporter,
    TransferDecodeTransformer,
};

/// Processes sendmail submissions one at a time.
pub struct Pipeline {
    transports: PathBuf,
    transformers: Vec<Box<dyn MessageTransformer>>,
    classifier: Box<dyn SpamClassifier>,
    dispatcher: Dispatcher,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("transports", &self.transports)
            .field("transformers", &self.transformers.len())
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

impl Pipeline {
    /// Creates a new [`Pipeline`] reading its routing table from the given
    /// path on every submission.
    pub fn new(
        transports: PathBuf,
        transformers: Vec<Box<dyn MessageTransformer>>,
        classifier: Box<dyn SpamClassifier>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            transports,
            transformers,
            classifier,
            dispatcher,
        }
    }

    /// Creates the standard sendmail pipeline: command-line recipients are
    /// merged, quoted-printable bodies decoded, CJK subjects dropped and
    /// everything else relayed over SMTP.
    ///
    /// `args` are the process arguments without the program name.
    pub fn from_config(config: &Config, args: Vec<String>) -> Self {
        let transformers: Vec<Box<dyn MessageTransformer>> = vec![
            Box::new(RecipientTransformer::new(args)),
            Box::new(TransferDecodeTransformer::new()),
        ];
        let dispatcher = Dispatcher::new(
            Arc::new(SmtpTransportFactory::new()),
            Arc::new(TracingReporter),
        );
        let classifier = ClassifierChain::default().with(Box::new(CjkSubjectClassifier::new()));
        Self::new(
            config.transports.clone(),
            transformers,
            Box::new(classifier),
            dispatcher,
        )
    }

    /// Processes one raw submission.
    ///
    /// Never fails: spam is dropped with an audit record, routing and
    /// delivery failures end up in the dispatch outcome record. The returned
    /// handle can be settled to wait for the delivery attempt.
    pub fn submit(&self, raw: &str) -> PendingDispatch {
        let mut message = EmailMessage::from_raw(raw);
        debug!(
            message_id = %message.message_id,
            headers = message.headers().len(),
            size = message.html().len(),
            "Parsed submission"
        );

        apply_transformers(&self.transformers, &mut message);

        let table = load_routing_table(&self.transports);
        let options = resolve_sender_options(table.as_ref(), message.from());

        if self.classifier.is_spam(&message, options.as_ref()) {
            info!(
                message_id = %message.message_id,
                from = message.from().unwrap_or_default(),
                to = message.to().unwrap_or_default(),
                classifier = self.classifier.name(),
                "Email dropped because it was suspected spam"
            );
            return PendingDispatch::nothing();
        }

        self.dispatcher.dispatch(message, options)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::atomic::Ordering};

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        dispatch::tests::{RecordingReporter, StubFactory},
        DispatchError, DispatchOutcome, SenderOptions,
    };

    const TABLE: &str = r#"{
        "a@x.com": {"transport": {"host": "t1"}},
        "default": {"transport": {"host": "t2"}}
    }"#;

    struct Harness {
        _temp_dir: TempDir,
        factory: Arc<StubFactory>,
        reporter: Arc<RecordingReporter>,
        pipeline: Pipeline,
    }

    fn harness(table: Option<&str>, args: &[&str]) -> Harness {
        let temp_dir = TempDir::new().unwrap();
        let transports = temp_dir.path().join("transports.json");
        if let Some(table) = table {
            fs::write(&transports, table).unwrap();
        }

        let factory = Arc::new(StubFactory::new(Ok("250 OK".to_string())));
        let reporter = Arc::new(RecordingReporter::default());
        let transformers: Vec<Box<dyn MessageTransformer>> = vec![
            Box::new(RecipientTransformer::new(args.iter().copied())),
            Box::new(TransferDecodeTransformer::new()),
        ];
        let pipeline = Pipeline::new(
            transports,
            transformers,
            Box::new(CjkSubjectClassifier::new()),
            Dispatcher::new(factory.clone(), reporter.clone()),
        );

        Harness {
            _temp_dir: temp_dir,
            factory,
            reporter,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_submit_routes_by_sender() {
        let harness = harness(Some(TABLE), &[]);

        let outcome = harness
            .pipeline
            .submit("From: a@x.com\nTo: b@x.com\nSubject: Hello\n\nBody")
            .settle()
            .await
            .unwrap();

        assert!(outcome.is_sent());
        assert_eq!(outcome.message().to(), Some("b@x.com"));
        assert_eq!(harness.factory.sends.load(Ordering::SeqCst), 1);
        assert_eq!(harness.reporter.sent(), 1);
    }

    #[tokio::test]
    async fn test_submit_merges_recipients_and_decodes_body() {
        let harness = harness(Some(TABLE), &["-i", "a@x.com", "b@x.com"]);

        let outcome = harness
            .pipeline
            .submit("From: s@x.com\nTo: c@x.com\nSubject: Offer\n\nPrice =3D $5")
            .settle()
            .await
            .unwrap();

        let message = outcome.message();
        assert_eq!(message.to(), Some("a@x.com, b@x.com, c@x.com"));
        assert_eq!(message.html(), "Price = $5");
    }

    #[tokio::test]
    async fn test_submit_drops_spam() {
        let harness = harness(Some(TABLE), &[]);

        let pending = harness
            .pipeline
            .submit("From: a@x.com\nTo: b@x.com\nSubject: 你好\n\nBody");

        assert!(!pending.is_dispatched());
        assert!(pending.settle().await.is_none());
        assert_eq!(harness.factory.creates.load(Ordering::SeqCst), 0);
        assert!(harness.reporter.outcomes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_without_routing_table() {
        let harness = harness(None, &[]);

        let outcome = harness
            .pipeline
            .submit("From: a@x.com\nTo: b@x.com\nSubject: Hello\n\nBody")
            .settle()
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            DispatchOutcome::Lost {
                error: DispatchError::NoSenderOptions,
                ..
            }
        ));
        assert_eq!(harness.factory.creates.load(Ordering::SeqCst), 0);
        assert_eq!(harness.reporter.lost(), 1);
        assert_eq!(harness.reporter.outcomes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_with_malformed_routing_table() {
        let harness = harness(Some("{ \"default\": "), &[]);

        let outcome = harness
            .pipeline
            .submit("From: a@x.com\nTo: b@x.com\n\nBody")
            .settle()
            .await
            .unwrap();

        assert!(!outcome.is_sent());
        assert_eq!(harness.reporter.lost(), 1);
    }

    #[tokio::test]
    async fn test_submit_falls_back_to_default_route() {
        let harness = harness(Some(TABLE), &[]);

        let outcome = harness
            .pipeline
            .submit("From: unknown@x.com\nTo: b@x.com\n\n")
            .settle()
            .await
            .unwrap();

        assert!(outcome.is_sent());
        assert_eq!(harness.factory.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_submit_without_boundary() {
        let harness = harness(Some(TABLE), &["b@x.com"]);

        let outcome = harness
            .pipeline
            .submit("just some text without headers")
            .settle()
            .await
            .unwrap();

        let message = outcome.message();
        assert!(message.from().is_none());
        assert_eq!(message.to(), Some("b@x.com"));
        assert_eq!(message.html(), "just some text without headers");
    }

    #[tokio::test]
    async fn test_submit_transport_failure_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let transports = temp_dir.path().join("transports.json");
        fs::write(&transports, TABLE).unwrap();
        let factory = Arc::new(StubFactory::new(Err(DispatchError::Transport(
            "timed out".to_string(),
        ))));
        let reporter = Arc::new(RecordingReporter::default());
        let pipeline = Pipeline::new(
            transports,
            vec![],
            Box::new(CjkSubjectClassifier::new()),
            Dispatcher::new(factory, reporter.clone()),
        );

        let outcome = pipeline
            .submit("From: a@x.com\nTo: b@x.com\n\nBody")
            .settle()
            .await
            .unwrap();

        match outcome {
            DispatchOutcome::Lost { error, options, .. } => {
                assert_eq!(error, DispatchError::Transport("timed out".to_string()));
                assert_eq!(options, Some(SenderOptions::new(json!({"host": "t1"}))));
            }
            other => panic!("Expected Lost outcome, got {other:?}"),
        }
        assert_eq!(reporter.lost(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = Config::default();
        let pipeline = Pipeline::from_config(&config, vec!["a@x.com".to_string()]);
        let debug = format!("{pipeline:?}");
        assert!(debug.contains("transports.json"));
        assert!(debug.contains("chain"));
    }
}
