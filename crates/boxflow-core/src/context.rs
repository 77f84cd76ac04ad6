//! Process-wide style lifecycle calls.
//!
//! Some front ends prefer bracketing a compilation with create/destroy calls
//! instead of threading a [`Session`] handle through their code. These
//! functions keep one session in a thread-local slot and lend it out through
//! [`with_lib_context`].
//!
//! ```rust
//! use boxflow_core::{create_lib_context, destroy_lib_context, with_lib_context};
//!
//! create_lib_context()?;
//! let outputs = with_lib_context(|s| {
//!     let osc = s.real(0.5);
//!     Ok(s.flatten(osc)?.len())
//! })?;
//! assert_eq!(outputs, 1);
//! destroy_lib_context()?;
//! # Ok::<(), boxflow_core::BoxError>(())
//! ```

use core::cell::RefCell;

use crate::error::BoxError;
use crate::session::{Session, SessionOptions};

thread_local! {
    static CONTEXT: RefCell<Option<Session>> = const { RefCell::new(None) };
}

/// Creates the thread's compilation context with default options.
///
/// # Errors
///
/// [`BoxError::ContextAlreadyActive`] if a session (global or explicit) is
/// already live on this thread.
pub fn create_lib_context() -> Result<(), BoxError> {
    create_lib_context_with(SessionOptions::default())
}

/// Creates the thread's compilation context with the given options.
pub fn create_lib_context_with(options: SessionOptions) -> Result<(), BoxError> {
    CONTEXT.with(|slot| {
        let mut slot = slot
            .try_borrow_mut()
            .map_err(|_| BoxError::ContextAlreadyActive)?;
        if slot.is_some() {
            return Err(BoxError::ContextAlreadyActive);
        }
        *slot = Some(Session::with_options(options)?);
        Ok(())
    })
}

/// Destroys the thread's compilation context, invalidating all of its boxes.
///
/// # Errors
///
/// [`BoxError::NoActiveContext`] if none was created.
pub fn destroy_lib_context() -> Result<(), BoxError> {
    CONTEXT.with(|slot| {
        let mut slot = slot
            .try_borrow_mut()
            .map_err(|_| BoxError::ContextAlreadyActive)?;
        match slot.take() {
            Some(session) => {
                session.destroy();
                Ok(())
            }
            None => Err(BoxError::NoActiveContext),
        }
    })
}

/// Runs `f` against the thread's compilation context.
///
/// # Errors
///
/// [`BoxError::NoActiveContext`] if none was created;
/// [`BoxError::ContextAlreadyActive`] if called from inside another
/// `with_lib_context` closure; otherwise whatever `f` returns.
pub fn with_lib_context<R>(
    f: impl FnOnce(&mut Session) -> Result<R, BoxError>,
) -> Result<R, BoxError> {
    CONTEXT.with(|slot| {
        let mut guard = slot
            .try_borrow_mut()
            .map_err(|_| BoxError::ContextAlreadyActive)?;
        let session = guard.as_mut().ok_or(BoxError::NoActiveContext)?;
        f(session)
    })
}
