use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Content that should be acted on once, such as a navigation or a toast.
///
/// Clones share the handled flag, so the content is handed out once no matter
/// how many observers see the event.
#[derive(Debug)]
pub struct Event<T> {
    content: Arc<T>,
    handled: Arc<AtomicBool>,
}

impl<T> Event<T> {
    pub fn new(content: T) -> Self {
        Self {
            content: Arc::new(content),
            handled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the content and marks it handled, or `None` if already handled.
    pub fn get_content_if_not_handled(&self) -> Option<&T> {
        if self.handled.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(&self.content)
        }
    }

    /// Returns the content whether or not it has been handled.
    pub fn peek_content(&self) -> &T {
        &self.content
    }

    pub fn has_been_handled(&self) -> bool {
        self.handled.load(Ordering::Acquire)
    }
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            content: Arc::clone(&self.content),
            handled: Arc::clone(&self.handled),
        }
    }
}
