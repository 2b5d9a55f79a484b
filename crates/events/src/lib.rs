//! Record mutation events, the after-success hook chain, and the change feed.

pub mod bus;
pub mod event;
pub mod hooks;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::{MutationKind, RecordEvent};
pub use hooks::{Continuation, DispatchReport, FnHook, HookError, HookRegistry, RecordHook, hook_fn};
pub use in_memory_bus::{FeedPoisoned, InMemoryEventBus};
