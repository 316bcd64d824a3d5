use crate::tracker::Completion;

/// One unit of input together with its completion handle.
///
/// A `WorkItem` is created by the dispatcher right before hand-off and is
/// owned by exactly one task at a time. Dropping it without settling the
/// completion marks the item as abandoned.
#[derive(Debug)]
pub struct WorkItem<T> {
    payload: T,
    completion: Completion,
}

impl<T> WorkItem<T> {
    pub const fn new(payload: T, completion: Completion) -> Self {
        Self {
            payload,
            completion,
        }
    }

    pub const fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_parts(self) -> (T, Completion) {
        (self.payload, self.completion)
    }
}
