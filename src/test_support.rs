//! Log capture shared by unit tests.

use std::sync::{Arc, Mutex};

use tracing::{subscriber::DefaultGuard, Event, Subscriber};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    Layer,
};

/// Span names enclosing each recorded event, root first.
pub type EventScopes = Arc<Mutex<Vec<Vec<&'static str>>>>;

struct ScopeRecorder(EventScopes);

impl<S> Layer<S> for ScopeRecorder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let names = ctx
            .event_scope(event)
            .map(|scope| scope.from_root().map(|span| span.name()).collect())
            .unwrap_or_default();
        self.0.lock().unwrap().push(names);
    }
}

/// Installs a thread-local subscriber recording event scopes until the guard drops.
pub fn capture_event_scopes() -> (EventScopes, DefaultGuard) {
    let scopes = EventScopes::default();
    let subscriber = tracing_subscriber::registry().with(ScopeRecorder(scopes.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (scopes, guard)
}
