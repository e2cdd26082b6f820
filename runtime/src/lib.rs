//! # Listkeeper Runtime
//!
//! Runtime implementation for the Listkeeper state engine.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: Owns the state, serializes actions through the reducer and
//!   hands the resulting effects to the effect lane
//! - **Effect Lane**: A single worker that executes effects strictly in the
//!   order their actions were committed
//! - **Feedback Loop**: Actions produced by effects are sent back through the
//!   store like any other action
//!
//! ## Ordering
//!
//! Effects are enqueued while the state write lock is still held, so the lane
//! sees them in commit order. The lane executes one top-level effect at a
//! time: everything returned for action N (including its `Sequential` chain)
//! finishes before anything returned for action N+1 starts. `Parallel`
//! children run concurrently with each other, but still inside their slot.
//!
//! ## Example
//!
//! ```ignore
//! use listkeeper_runtime::Store;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! let mut handle = store.send(Action::DoSomething).await?;
//! handle.wait().await;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use listkeeper_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// The reducer rejected the action; state is unchanged
        ///
        /// Use [`StoreError::rejection`] to recover the reducer's own error type.
        #[error("Action rejected: {0}")]
        Rejected(Box<dyn std::error::Error + Send + Sync>),

        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }

    impl StoreError {
        /// Returns the reducer error if this is a rejection of type `T`
        #[must_use]
        pub fn rejection<T>(&self) -> Option<&T>
        where
            T: std::error::Error + 'static,
        {
            match self {
                Self::Rejected(error) => error.downcast_ref::<T>(),
                Self::ShutdownInProgress | Self::ShutdownTimeout(_) => None,
            }
        }

        /// Returns true if the reducer rejected the action
        #[must_use]
        pub const fn is_rejected(&self) -> bool {
            matches!(self, Self::Rejected(_))
        }
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(256)
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// let store = Store::with_config(state, reducer, env, config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Capacity of the committed-action broadcast channel
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the broadcast channel capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects returned
/// by that action. Actions fed back by those effects are not tracked.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // All effects from Action::Start are now complete
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new handle together with the tracking half used by the lane
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    ///
    /// Useful for initialization in loops where you need a `last_handle`.
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Returns true if every tracked effect has finished
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.effects.load(Ordering::SeqCst) == 0
    }

    /// Wait for all tracked effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all tracked effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`tokio::time::error::Elapsed`] if the timeout expires before
    /// all effects complete.
    pub async fn wait_with_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<(), tokio::time::error::Elapsed> {
        tokio::time::timeout(timeout, self.wait()).await
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: the counting half of an [`EffectHandle`]
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements the handle counter on drop
///
/// Dropped after the effect ran, or when the lane discards the job.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Internal: one top-level effect waiting in the lane
struct Job<A> {
    effect: Effect<A>,
    _tracking: DecrementGuard,
    _pending: AtomicCounterGuard,
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, Job, Ordering, Reducer, RwLock, StoreConfig, StoreError,
    };
    use futures::future::{BoxFuture, join_all};
    use std::sync::Weak;
    use tokio::sync::{Mutex, broadcast, mpsc};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (ordered lane with feedback loop)
    ///
    /// Cloning a Store is cheap and yields another handle to the same state.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        inner: Arc<StoreInner<S, A, E, R>>,
    }

    struct StoreInner<S, A, E, R> {
        state: RwLock<S>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        lane: mpsc::UnboundedSender<Job<A>>,
        lane_receiver: Mutex<Option<mpsc::UnboundedReceiver<Job<A>>>>,
        shutdown: AtomicBool,
        pending_effects: Arc<AtomicUsize>,
        /// Every action the reducer accepted, in commit order.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        R::Error: std::error::Error + Send + Sync + 'static,
        A: Clone + Send + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default()`]. The effect lane worker is spawned
        /// lazily on the first `send()`, so the store can be built outside a
        /// Tokio runtime.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new store with a custom configuration
        #[must_use]
        pub fn with_config(initial_state: S, reducer: R, environment: E, config: StoreConfig) -> Self {
            let (lane, lane_receiver) = mpsc::unbounded_channel();
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                inner: Arc::new(StoreInner {
                    state: RwLock::new(initial_state),
                    reducer,
                    environment,
                    config,
                    lane,
                    lane_receiver: Mutex::new(Some(lane_receiver)),
                    shutdown: AtomicBool::new(false),
                    pending_effects: Arc::new(AtomicUsize::new(0)),
                    action_broadcast,
                }),
            }
        }

        /// Access the injected environment
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.inner.environment
        }

        /// The configuration this store was built with
        #[must_use]
        pub fn config(&self) -> &StoreConfig {
            &self.inner.config
        }

        /// Number of top-level effects queued or running
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.inner.pending_effects.load(Ordering::Acquire)
        }

        /// Returns true once [`Store::shutdown`] has been called
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.inner.shutdown.load(Ordering::Acquire)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// 1. Stops accepting new actions (`send()` returns `ShutdownInProgress`)
        /// 2. Waits for queued and running effects to complete
        /// 3. Returns when all effects finish or the timeout expires
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.inner.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects();

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout: {} effects still running", pending);
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. On success, enqueues the returned effects on the lane and
        ///    publishes the action to [`Store::subscribe_actions`] observers
        /// 4. On rejection, returns the reducer error; state is untouched and
        ///    nothing is enqueued or published
        ///
        /// `send()` returns once the action is committed, not once its effects
        /// have run. Use the returned [`EffectHandle`] to wait for them.
        ///
        /// # Errors
        ///
        /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
        /// - [`StoreError::Rejected`] if the reducer rejected the action
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            let inner = &self.inner;

            if inner.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.commands.total").increment(1);

            self.ensure_lane_worker().await;

            let (handle, tracking) = EffectHandle::new();
            let observed = action.clone();

            let mut state = inner.state.write().await;
            tracing::trace!("Acquired write lock on state");

            let start = std::time::Instant::now();
            let result = inner.reducer.reduce(&mut *state, action, &inner.environment);
            metrics::histogram!("store.reducer.duration_seconds").record(start.elapsed().as_secs_f64());

            let effects = match result {
                Ok(effects) => effects,
                Err(error) => {
                    drop(state);
                    tracing::debug!(error = %error, "Reducer rejected action");
                    metrics::counter!("store.commands.rejected").increment(1);
                    return Err(StoreError::Rejected(Box::new(error)));
                },
            };

            tracing::trace!("Reducer completed, enqueueing {} effects", effects.len());

            // Enqueue while still holding the lock so the lane sees commit order
            for effect in effects {
                if effect.is_noop() {
                    continue;
                }

                tracking.increment();
                inner.pending_effects.fetch_add(1, Ordering::SeqCst);

                let job = Job {
                    effect,
                    _tracking: DecrementGuard(tracking.clone()),
                    _pending: AtomicCounterGuard(Arc::clone(&inner.pending_effects)),
                };

                if inner.lane.send(job).is_err() {
                    tracing::error!("Effect lane closed, dropping effect");
                }
            }

            // No receivers is fine
            let _ = inner.action_broadcast.send(observed);

            drop(state);
            tracing::debug!("Action committed");

            Ok(handle)
        }

        /// Subscribe to committed actions
        ///
        /// Every action the reducer accepts is published here after its
        /// effects were enqueued, in commit order. Rejected actions are not
        /// published. Slow subscribers may observe
        /// [`broadcast::error::RecvError::Lagged`].
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.inner.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let list_count = store.state(|s| s.todo_lists.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.inner.state.read().await;
            f(&*state)
        }

        /// Spawn the lane worker if this is the first send
        async fn ensure_lane_worker(&self) {
            let mut receiver = self.inner.lane_receiver.lock().await;
            if let Some(receiver) = receiver.take() {
                tracing::debug!("Starting effect lane");
                tokio::spawn(run_lane(receiver, Arc::downgrade(&self.inner)));
            }
        }

        /// Execute an effect to completion
        ///
        /// - `None`: No-op
        /// - `Future`: Awaits the computation and sends the resulting action, if any
        /// - `Parallel`: Executes children concurrently and waits for all of them
        /// - `Sequential`: Executes children in order, each after the previous finished
        ///
        /// Feedback actions that get rejected are logged and dropped.
        fn execute_effect(&self, effect: Effect<A>) -> BoxFuture<'_, ()> {
            Box::pin(async move {
                match effect {
                    Effect::None => {
                        metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                    },
                    Effect::Future(future) => {
                        metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                        if let Some(action) = future.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            if let Err(error) = self.send(action).await {
                                tracing::warn!(error = %error, "Feedback action was not applied");
                            }
                        }
                    },
                    Effect::Parallel(effects) => {
                        tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                        metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);

                        join_all(effects.into_iter().map(|effect| self.execute_effect(effect))).await;
                    },
                    Effect::Sequential(effects) => {
                        let effect_count = effects.len();
                        tracing::trace!("Executing Effect::Sequential with {} effects", effect_count);
                        metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);

                        for (idx, effect) in effects.into_iter().enumerate() {
                            tracing::trace!("Executing sequential effect {} of {}", idx + 1, effect_count);
                            self.execute_effect(effect).await;
                        }
                    },
                }
            })
        }
    }

    /// The lane worker: runs top-level effects one at a time, FIFO
    async fn run_lane<S, A, E, R>(
        mut receiver: mpsc::UnboundedReceiver<Job<A>>,
        store: Weak<StoreInner<S, A, E, R>>,
    ) where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        R::Error: std::error::Error + Send + Sync + 'static,
        A: Clone + Send + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        while let Some(job) = receiver.recv().await {
            let Some(inner) = store.upgrade() else {
                break;
            };
            let store = Store { inner };
            let Job {
                effect,
                _tracking,
                _pending,
            } = job;

            store.execute_effect(effect).await;
        }

        tracing::debug!("Effect lane stopped");
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
