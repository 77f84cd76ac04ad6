//! Session context: the scope that owns every box of one compilation.
//!
//! A [`Session`] is an explicit handle. Opening one marks the current thread
//! as having a live compilation; dropping (or [`destroy`](Session::destroy)ing)
//! it releases the node store in one step and clears the mark. Sessions are
//! `!Send`, so the per-thread bookkeeping cannot be bypassed by moving a
//! session elsewhere.
//!
//! ```rust
//! use boxflow_core::Session;
//!
//! let mut session = Session::new()?;
//! let add = session.add();
//! let one = session.int(1);
//! let two = session.int(2);
//! let args = session.par(one, two)?;
//! let sum = session.seq(args, add)?;
//! let signals = session.flatten(sum)?;
//! assert_eq!(signals.len(), 1);
//! # Ok::<(), boxflow_core::BoxError>(())
//! ```

use core::cell::Cell;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::arity::Arity;
use crate::error::BoxError;
use crate::node::{BoxId, BoxNode};
use crate::store::BoxStore;

static NEXT_SESSION: AtomicU32 = AtomicU32::new(1);

thread_local! {
    static LIVE: Cell<bool> = const { Cell::new(false) };
}

/// Tunables for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionOptions {
    /// Maximum box nesting depth the flattener descends before giving up
    /// with [`BoxError::DepthLimitExceeded`]. The walk keeps its own work
    /// stack, so this bounds memory rather than the thread stack.
    pub max_depth: usize,
    /// Fold arithmetic over literal constants while flattening.
    pub fold_constants: bool,
}

impl SessionOptions {
    /// Default for [`max_depth`](Self::max_depth).
    pub const DEFAULT_MAX_DEPTH: usize = 65_536;
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            fold_constants: false,
        }
    }
}

/// A live compilation context owning a [`BoxStore`].
///
/// All constructors and composition operators are methods on the session,
/// so no box can be created without one. Boxes from another session are
/// rejected with [`BoxError::StaleBox`].
pub struct Session {
    store: BoxStore,
    options: SessionOptions,
    _not_send: PhantomData<*const ()>,
}

impl Session {
    /// Opens a session with default options.
    ///
    /// # Errors
    ///
    /// [`BoxError::ContextAlreadyActive`] if this thread already has a live
    /// session.
    pub fn new() -> Result<Self, BoxError> {
        Self::with_options(SessionOptions::default())
    }

    /// Opens a session with the given options.
    pub fn with_options(options: SessionOptions) -> Result<Self, BoxError> {
        LIVE.with(|live| {
            if live.get() {
                return Err(BoxError::ContextAlreadyActive);
            }
            live.set(true);
            Ok(())
        })?;
        let id = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "tracing")]
        tracing::debug!(session = id, ?options, "session_open");
        Ok(Self {
            store: BoxStore::new(id),
            options,
            _not_send: PhantomData,
        })
    }

    /// Returns `true` if a session is live on the calling thread.
    pub fn is_live() -> bool {
        LIVE.with(Cell::get)
    }

    /// Closes the session, invalidating every box created under it.
    pub fn destroy(self) {
        drop(self);
    }

    /// Unique id of this session.
    pub fn id(&self) -> u32 {
        self.store.session()
    }

    /// Session options.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Read-only view of the node store.
    pub fn store(&self) -> &BoxStore {
        &self.store
    }

    /// Number of distinct boxes created so far.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no box has been created yet.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Arity of a box.
    pub fn arity(&self, id: BoxId) -> Result<Arity, BoxError> {
        self.store.arity(id)
    }

    /// Node behind a box id.
    pub fn node(&self, id: BoxId) -> Result<&BoxNode, BoxError> {
        self.store.node(id)
    }

    /// Registers an externally built node without legality checks.
    ///
    /// Intended for importers that reconstruct a graph produced elsewhere.
    /// Only ownership of the referenced boxes is verified here; the arity
    /// rules are re-checked when the graph is flattened, and violations
    /// surface as [`BoxError::MalformedGraph`].
    pub fn insert_unchecked(&mut self, node: BoxNode, arity: Arity) -> Result<BoxId, BoxError> {
        for child in node.children() {
            self.store.check(child)?;
        }
        Ok(self.store.insert_raw(node, arity))
    }

    pub(crate) fn check(&self, id: BoxId) -> Result<(), BoxError> {
        self.store.check(id)
    }

    pub(crate) fn intern(&mut self, node: BoxNode, arity: Arity) -> BoxId {
        self.store.intern(node, arity)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        LIVE.with(|live| live.set(false));
        #[cfg(feature = "tracing")]
        tracing::debug!(
            session = self.store.session(),
            boxes = self.store.len(),
            "session_close"
        );
    }
}

impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("boxes", &self.store.len())
            .field("options", &self.options)
            .finish()
    }
}
