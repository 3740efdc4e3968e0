//! Typed result of a call against a collaborator that is allowed to degrade.

/// Outcome of a store query: a value, a legitimately empty answer, or a degraded call.
///
/// `Empty` is a valid answer (no matches), never a failure. `Degraded` carries the reason
/// the collaborator could not answer; callers continue without its contribution.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Empty,
    Degraded(String),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    /// Reason for degradation, if any.
    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Outcome::Degraded(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Empty => Outcome::Empty,
            Outcome::Degraded(reason) => Outcome::Degraded(reason),
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }
}

impl<T: Default> Outcome<T> {
    /// Collapse to a plain value; empty and degraded outcomes become `T::default()`.
    pub fn into_value(self) -> T {
        self.success().unwrap_or_default()
    }
}

impl<T> Outcome<Vec<T>> {
    pub fn from_vec(items: Vec<T>) -> Self {
        if items.is_empty() {
            Outcome::Empty
        } else {
            Outcome::Success(items)
        }
    }
}
