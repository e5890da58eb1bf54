//! Explicit logger handed to components at construction.
//!
//! Components never reach for a global logger. Each one is given a
//! [`Logger`] carrying a tag and a `tracing` span; events are emitted inside
//! that span so a host can route or filter them per component.

use std::fmt::Display;

use tracing::Span;

/// A tagged logging handle backed by a `tracing` span.
#[derive(Debug, Clone)]
pub struct Logger {
    tag: &'static str,
    span: Span,
    enabled: bool,
}

impl Logger {
    /// Create a logger whose events are emitted under a new span named after `tag`.
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            span: tracing::debug_span!("isolate", component = tag),
            enabled: true,
        }
    }

    /// Create a logger that emits inside an existing span.
    pub fn with_span(tag: &'static str, span: Span) -> Self {
        Self {
            tag,
            span,
            enabled: true,
        }
    }

    /// A logger that discards everything, including what its children log.
    pub fn disabled() -> Self {
        Self {
            tag: "disabled",
            span: Span::none(),
            enabled: false,
        }
    }

    /// Derive a logger for a sub-component sharing this logger's span.
    pub fn child(&self, tag: &'static str) -> Self {
        Self {
            tag,
            span: self.span.clone(),
            enabled: self.enabled,
        }
    }

    /// Derive a logger emitting inside `span`, usually a child of [`Logger::span`].
    pub fn nested(&self, tag: &'static str, span: Span) -> Self {
        Self {
            tag,
            span,
            enabled: self.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn debug(&self, message: impl Display) {
        if self.enabled {
            self.span
                .in_scope(|| tracing::debug!(tag = self.tag, "{}", message));
        }
    }

    pub fn info(&self, message: impl Display) {
        if self.enabled {
            self.span
                .in_scope(|| tracing::info!(tag = self.tag, "{}", message));
        }
    }

    pub fn warn(&self, message: impl Display) {
        if self.enabled {
            self.span
                .in_scope(|| tracing::warn!(tag = self.tag, "{}", message));
        }
    }

    pub fn error(&self, message: impl Display) {
        if self.enabled {
            self.span
                .in_scope(|| tracing::error!(tag = self.tag, "{}", message));
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new("isolate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::{span, Event, Metadata, Subscriber};

    #[test]
    fn child_keeps_span_and_changes_tag() {
        let parent = Logger::new("dispatcher");
        let child = parent.child("remote_data");
        assert_eq!(child.tag(), "remote_data");
        assert_eq!(parent.span().id(), child.span().id());
    }

    /// Counts events and hands out span ids.
    #[derive(Default)]
    struct Counter {
        events: AtomicUsize,
        spans: AtomicU64,
    }

    impl Subscriber for Counter {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _: &span::Attributes<'_>) -> span::Id {
            span::Id::from_u64(self.spans.fetch_add(1, Ordering::SeqCst) + 1)
        }

        fn record(&self, _: &span::Id, _: &span::Record<'_>) {}

        fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}

        fn event(&self, _: &Event<'_>) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }

        fn enter(&self, _: &span::Id) {}

        fn exit(&self, _: &span::Id) {}
    }

    fn count_events(log: impl FnOnce()) -> usize {
        let counter = Arc::new(Counter::default());
        tracing::subscriber::with_default(counter.clone(), log);
        counter.events.load(Ordering::SeqCst)
    }

    #[test]
    fn disabled_logger_emits_nothing() {
        let emitted = count_events(|| {
            let logger = Logger::disabled();
            logger.debug("ignored");
            logger.warn(format_args!("also {}", "ignored"));
            logger.child("store").error("ignored");
            logger
                .nested("request", tracing::debug_span!("request"))
                .info("ignored");
        });
        assert_eq!(emitted, 0);
    }

    #[test]
    fn enabled_logger_emits_into_the_subscriber() {
        let emitted = count_events(|| {
            let logger = Logger::new("dispatcher");
            logger.info("one");
            logger.child("worker").warn("two");
            assert!(logger.child("worker").is_enabled());
        });
        assert_eq!(emitted, 2);
    }
}
