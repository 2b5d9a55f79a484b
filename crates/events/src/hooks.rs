//! After-success hook chain (event source mechanics only).
//!
//! Hooks are bound to a `(MutationKind, collection)` pair and run
//! synchronously, in registration order, after a mutation commits. Each hook
//! receives an explicit store handle `S` instead of reaching for global
//! state, so hooks stay testable with a fake store.
//!
//! Chain semantics:
//!
//! - `Ok(Continuation::Next)`: run the next bound hook
//! - `Ok(Continuation::Stop)`: end the chain quietly
//! - `Err(HookError)`: abort the chain; the error is surfaced to the mutation caller
//!
//! The registry makes no storage assumptions: `S` is whatever handle the
//! event source passes in (typically `dyn RecordStore`).

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{debug, warn};

use crate::event::{MutationKind, RecordEvent};

/// Signal returned by a hook telling the chain whether to keep going.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Continuation {
    Next,
    Stop,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    /// A hook rejected the event and aborted the chain.
    #[error("hook '{hook}' failed: {message}")]
    Failed { hook: String, message: String },

    /// The registry lock was poisoned by a thread that panicked while holding it.
    #[error("hook registry poisoned")]
    Poisoned,
}

impl HookError {
    pub fn failed(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            hook: hook.into(),
            message: message.into(),
        }
    }
}

/// A unit of reactive logic bound to record mutations.
pub trait RecordHook<S: ?Sized>: Send + Sync {
    /// Stable name used in logs and errors.
    fn name(&self) -> &str;

    fn handle(&self, store: &S, event: &RecordEvent) -> Result<Continuation, HookError>;
}

/// Closure-backed hook, see [`hook_fn`].
pub struct FnHook<F> {
    name: String,
    f: F,
}

impl<F> core::fmt::Debug for FnHook<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnHook").field("name", &self.name).finish()
    }
}

/// Wrap a closure as a named hook.
pub fn hook_fn<S, F>(name: impl Into<String>, f: F) -> FnHook<F>
where
    S: ?Sized,
    F: Fn(&S, &RecordEvent) -> Result<Continuation, HookError> + Send + Sync,
{
    FnHook {
        name: name.into(),
        f,
    }
}

impl<S, F> RecordHook<S> for FnHook<F>
where
    S: ?Sized,
    F: Fn(&S, &RecordEvent) -> Result<Continuation, HookError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, store: &S, event: &RecordEvent) -> Result<Continuation, HookError> {
        (self.f)(store, event)
    }
}

/// What happened during one chain run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Number of hooks that were invoked.
    pub invoked: usize,
    /// Whether a hook returned `Continuation::Stop`.
    pub stopped: bool,
}

struct Binding<S: ?Sized> {
    kind: MutationKind,
    collection: String,
    hook: Arc<dyn RecordHook<S>>,
}

impl<S: ?Sized> Clone for Binding<S> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            collection: self.collection.clone(),
            hook: Arc::clone(&self.hook),
        }
    }
}

/// Ordered registry of after-success hooks.
pub struct HookRegistry<S: ?Sized> {
    bindings: RwLock<Vec<Binding<S>>>,
}

impl<S: ?Sized> core::fmt::Debug for HookRegistry<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let count = self.bindings.read().map(|b| b.len()).unwrap_or(0);
        f.debug_struct("HookRegistry").field("bindings", &count).finish()
    }
}

impl<S: ?Sized> Default for HookRegistry<S> {
    fn default() -> Self {
        Self {
            bindings: RwLock::new(Vec::new()),
        }
    }
}

impl<S: ?Sized> HookRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a hook to run after a record in `collection` is created.
    pub fn on_after_create_success(
        &self,
        collection: impl Into<String>,
        hook: impl RecordHook<S> + 'static,
    ) -> Result<(), HookError> {
        self.bind(MutationKind::Create, collection, Arc::new(hook))
    }

    /// Bind a hook to run after a record in `collection` is updated.
    pub fn on_after_update_success(
        &self,
        collection: impl Into<String>,
        hook: impl RecordHook<S> + 'static,
    ) -> Result<(), HookError> {
        self.bind(MutationKind::Update, collection, Arc::new(hook))
    }

    /// Bind a hook to run after a record in `collection` is deleted.
    pub fn on_after_delete_success(
        &self,
        collection: impl Into<String>,
        hook: impl RecordHook<S> + 'static,
    ) -> Result<(), HookError> {
        self.bind(MutationKind::Delete, collection, Arc::new(hook))
    }

    /// Bind an already-shared hook.
    ///
    /// A poisoned registry keeps its previous bindings and rejects the new one.
    pub fn bind(
        &self,
        kind: MutationKind,
        collection: impl Into<String>,
        hook: Arc<dyn RecordHook<S>>,
    ) -> Result<(), HookError> {
        let collection = collection.into();
        let Ok(mut bindings) = self.bindings.write() else {
            warn!(
                hook = hook.name(),
                trigger = %kind,
                collection = %collection,
                "hook registry poisoned; binding dropped"
            );
            return Err(HookError::Poisoned);
        };
        bindings.push(Binding { kind, collection, hook });
        Ok(())
    }

    /// Number of hooks bound to `(kind, collection)`.
    pub fn count(&self, kind: MutationKind, collection: &str) -> usize {
        self.bindings
            .read()
            .map(|b| {
                b.iter()
                    .filter(|x| x.kind == kind && x.collection == collection)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Run the chain bound to the event's kind and collection.
    ///
    /// Bindings are snapshotted before any hook runs, so hooks may write
    /// through the store (and re-enter `dispatch`) without holding the lock.
    pub fn dispatch(&self, store: &S, event: &RecordEvent) -> Result<DispatchReport, HookError> {
        let chain: Vec<Binding<S>> = {
            let bindings = self.bindings.read().map_err(|_| HookError::Poisoned)?;
            bindings
                .iter()
                .filter(|b| b.kind == event.kind() && b.collection == event.collection())
                .cloned()
                .collect()
        };

        let mut report = DispatchReport::default();
        for binding in chain {
            report.invoked += 1;
            debug!(
                hook = binding.hook.name(),
                event_type = %event.event_type(),
                record_id = %event.record_id(),
                "running record hook"
            );

            match binding.hook.handle(store, event)? {
                Continuation::Next => continue,
                Continuation::Stop => {
                    report.stopped = true;
                    break;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use shopfront_core::Record;

    use super::*;

    /// Stand-in store handle that records which hooks ran.
    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<String>>,
    }

    impl Journal {
        fn push(&self, s: &str) {
            self.calls.lock().unwrap().push(s.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn recording(name: &'static str, then: Continuation) -> impl RecordHook<Journal> {
        hook_fn(name, move |j: &Journal, _e: &RecordEvent| {
            j.push(name);
            Ok(then)
        })
    }

    #[test]
    fn hooks_run_in_registration_order_for_matching_binding_only() {
        let registry: HookRegistry<Journal> = HookRegistry::new();
        registry.on_after_update_success("products", recording("first", Continuation::Next)).unwrap();
        registry.on_after_update_success("products", recording("second", Continuation::Next)).unwrap();
        registry.on_after_create_success("products", recording("create", Continuation::Next)).unwrap();
        registry.on_after_update_success("orders", recording("orders", Continuation::Next)).unwrap();

        let journal = Journal::default();
        let report = registry
            .dispatch(&journal, &RecordEvent::updated(Record::new("products")))
            .unwrap();

        assert_eq!(journal.calls(), vec!["first", "second"]);
        assert_eq!(report, DispatchReport { invoked: 2, stopped: false });
    }

    #[test]
    fn stop_ends_the_chain_without_error() {
        let registry: HookRegistry<Journal> = HookRegistry::new();
        registry.on_after_create_success("orders", recording("a", Continuation::Stop)).unwrap();
        registry.on_after_create_success("orders", recording("b", Continuation::Next)).unwrap();

        let journal = Journal::default();
        let report = registry
            .dispatch(&journal, &RecordEvent::created(Record::new("orders")))
            .unwrap();

        assert_eq!(journal.calls(), vec!["a"]);
        assert!(report.stopped);
    }

    #[test]
    fn error_aborts_the_chain() {
        let registry: HookRegistry<Journal> = HookRegistry::new();
        registry.on_after_create_success(
            "orders",
            hook_fn("boom", |_j: &Journal, _e: &RecordEvent| Err(HookError::failed("boom", "nope"))),
        ).unwrap();
        registry.on_after_create_success("orders", recording("after", Continuation::Next)).unwrap();

        let journal = Journal::default();
        let err = registry
            .dispatch(&journal, &RecordEvent::created(Record::new("orders")))
            .unwrap_err();

        assert_eq!(err, HookError::failed("boom", "nope"));
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn poisoned_registry_rejects_new_bindings() {
        let registry: HookRegistry<Journal> = HookRegistry::new();
        registry.on_after_create_success("orders", recording("kept", Continuation::Next)).unwrap();

        std::thread::scope(|s| {
            let _ = s
                .spawn(|| {
                    let _guard = registry.bindings.write().unwrap();
                    panic!("registry writer died");
                })
                .join();
        });

        let err = registry
            .on_after_create_success("orders", recording("late", Continuation::Next))
            .unwrap_err();
        assert_eq!(err, HookError::Poisoned);

        let journal = Journal::default();
        let dispatched = registry.dispatch(&journal, &RecordEvent::created(Record::new("orders")));
        assert_eq!(dispatched, Err(HookError::Poisoned));
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn dispatch_without_bindings_is_a_noop() {
        let registry: HookRegistry<Journal> = HookRegistry::new();
        let journal = Journal::default();
        let report = registry
            .dispatch(&journal, &RecordEvent::deleted(Record::new("carts")))
            .unwrap();
        assert_eq!(report, DispatchReport::default());
        assert_eq!(registry.count(MutationKind::Delete, "carts"), 0);
    }
}
