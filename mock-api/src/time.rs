use jiff::{Span, Timestamp};
use std::sync::{Arc, Mutex, PoisonError};

/// Source of `dateCreated` and batch job timestamps.
///
/// Tests use a fixed clock that only moves through [`TimeSource::advance`],
/// so timestamps in responses are predictable.
#[derive(Clone)]
pub enum TimeSource {
    System,
    Fixed(Arc<Mutex<Timestamp>>),
}

impl TimeSource {
    pub fn fixed(start: Timestamp) -> Self {
        Self::Fixed(Arc::new(Mutex::new(start)))
    }

    pub fn now(&self) -> Timestamp {
        match self {
            Self::System => Timestamp::now(),
            Self::Fixed(time) => {
                *time.lock().unwrap_or_else(PoisonError::into_inner)
            }
        }
    }

    /// Move a fixed clock forward. The system clock ignores this.
    pub fn advance(&self, span: Span) {
        if let Self::Fixed(time) = self {
            let mut time = time.lock().unwrap_or_else(PoisonError::into_inner);
            if let Ok(later) = time.checked_add(span) {
                *time = later;
            }
        }
    }
}
