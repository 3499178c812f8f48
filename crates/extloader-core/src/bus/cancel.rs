//! Cancellation of blocking polls

use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "alloc")]
use alloc::sync::Arc;

/// Flag checked by every polling loop between status reads
///
/// A token is either backed by a `'static` flag (usable without an
/// allocator) or, with the `alloc` feature, by a shared heap flag. Clones
/// observe the same flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Flag,
}

#[derive(Debug, Clone)]
enum Flag {
    Static(&'static AtomicBool),
    #[cfg(feature = "alloc")]
    Shared(Arc<AtomicBool>),
}

impl CancelToken {
    /// Create a token backed by a static flag
    pub const fn from_static(flag: &'static AtomicBool) -> Self {
        Self {
            flag: Flag::Static(flag),
        }
    }

    /// Create a fresh, not-yet-cancelled token
    #[cfg(feature = "alloc")]
    pub fn new() -> Self {
        Self {
            flag: Flag::Shared(Arc::new(AtomicBool::new(false))),
        }
    }

    fn flag(&self) -> &AtomicBool {
        match &self.flag {
            Flag::Static(flag) => *flag,
            #[cfg(feature = "alloc")]
            Flag::Shared(flag) => &**flag,
        }
    }

    /// Request cancellation of any poll observing this token
    pub fn cancel(&self) {
        self.flag().store(true, Ordering::Release);
    }

    /// Clear a previous cancellation request
    pub fn reset(&self) {
        self.flag().store(false, Ordering::Release);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.flag().load(Ordering::Acquire)
    }
}

#[cfg(feature = "alloc")]
impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FLAG: AtomicBool = AtomicBool::new(false);

    #[test]
    fn test_static_token_round_trip() {
        let token = CancelToken::from_static(&FLAG);
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
        token.reset();
        assert!(!observer.is_cancelled());
    }
}
