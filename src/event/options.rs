use super::Event;

/// Optional attributes supplied when building or publishing an event.
///
/// Everything here is optional. Missing values are defaulted at build time:
/// a fresh `corr_` correlation id, and the publishing node as `source`.
///
/// ```
/// use domain_bus::PublishOptions;
///
/// let opts = PublishOptions::new()
///     .aggregate("order", "42")
///     .user("user-7")
///     .correlation("corr_checkout");
///
/// assert_eq!(opts.aggregate_id.as_deref(), Some("42"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub aggregate_type: Option<String>,
    pub aggregate_id: Option<String>,
    pub user_id: Option<String>,
    pub correlation_id: Option<String>,
    pub causation_id: Option<String>,
    pub source: Option<String>,
}

impl PublishOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the event to an aggregate.
    pub fn aggregate(mut self, aggregate_type: impl Into<String>, id: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self.aggregate_id = Some(id.into());
        self
    }

    /// Record the acting user.
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn causation(mut self, causation_id: impl Into<String>) -> Self {
        self.causation_id = Some(causation_id.into());
        self
    }

    /// Override the originating node.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Mark the new event as caused by `cause`, continuing its correlation chain.
    pub fn caused_by(mut self, cause: &Event) -> Self {
        self.causation_id = Some(cause.id().to_string());
        self.correlation_id = Some(cause.metadata().correlation_id.clone());
        self
    }

    /// Fill in `source` when the caller did not set one.
    pub(crate) fn or_source(mut self, source: &str) -> Self {
        if self.source.is_none() {
            self.source = Some(source.to_string());
        }
        self
    }
}
