//! Tri-state result of an advisory store read.
//!
//! Engines never talk to the store directly. The orchestrator performs every
//! read up front and hands the engines a [`Lookup`], which distinguishes a
//! record that does not exist from a store that could not be asked.

use anyhow::Result;

/// Outcome of a single read against the persisted store.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The store answered and the record exists.
    Found(T),
    /// The store answered and there is no such record.
    Absent,
    /// No store is configured, or the read failed.
    Unavailable,
}

impl<T> Lookup<T> {
    /// Converts a store result, treating any error as [`Lookup::Unavailable`].
    pub fn from_result(result: Result<Option<T>>) -> Self {
        match result {
            Ok(Some(v)) => Lookup::Found(v),
            Ok(None) => Lookup::Absent,
            Err(e) => {
                tracing::debug!("store lookup failed: {:#}", e);
                Lookup::Unavailable
            }
        }
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            Lookup::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Lookup::Unavailable)
    }
}

impl<T> Lookup<Vec<T>> {
    /// Converts a list-returning store result; an empty list is still `Found`.
    pub fn from_list(result: Result<Vec<T>>) -> Self {
        Self::from_result(result.map(Some))
    }

    /// The found items, or an empty slice when absent or unavailable.
    pub fn items(&self) -> &[T] {
        self.found().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_becomes_unavailable() {
        let l: Lookup<u32> = Lookup::from_result(Err(anyhow::anyhow!("connection refused")));
        assert_eq!(l, Lookup::Unavailable);
        assert!(!l.is_available());
    }

    #[test]
    fn test_none_is_absent_but_available() {
        let l: Lookup<u32> = Lookup::from_result(Ok(None));
        assert_eq!(l, Lookup::Absent);
        assert!(l.is_available());
        assert!(l.found().is_none());
    }

    #[test]
    fn test_empty_list_is_found() {
        let l: Lookup<Vec<u32>> = Lookup::from_list(Ok(vec![]));
        assert_eq!(l, Lookup::Found(vec![]));
        assert!(l.items().is_empty());
    }
}
