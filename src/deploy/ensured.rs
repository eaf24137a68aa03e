// ABOUTME: Outcome of an idempotent ensure-style reconciliation step.
// ABOUTME: Records whether the resource was discovered or had to be created.

/// A resource that is known to exist after a reconciliation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensured<T> {
    /// Discovered by name; left untouched.
    Existing(T),
    /// Absent before this step; created by it.
    Created(T),
}

impl<T> Ensured<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Ensured::Created(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Ensured::Existing(value) | Ensured::Created(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Ensured::Existing(value) | Ensured::Created(value) => value,
        }
    }

    /// "created" or "exists", for progress details.
    pub fn verb(&self) -> &'static str {
        if self.was_created() { "created" } else { "exists" }
    }
}
