// src/vector.rs
//
// =============================================================================
// SAFEBOX: RESOURCE VECTOR
// =============================================================================
//
// A fixed-arity vector of non-negative resource quantities.
// Arity is set once when the SafetyEngine is initialized; every vector that
// crosses the engine boundary after that is checked against it. Mismatched
// arity is a hard `AdmissionError::ArityMismatch`, never silently truncated
// or zero-padded.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A resource quantity vector: one non-negative integer per declared
/// resource class (e.g. `[cpu_percent, memory_mib]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceVector(Vec<u64>);

impl ResourceVector {
    pub fn new(values: impl Into<Vec<u64>>) -> Self {
        Self(values.into())
    }

    pub fn zeros(arity: usize) -> Self {
        Self(vec![0; arity])
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }

    /// Componentwise `self <= other`. Panics if arities differ — callers are
    /// expected to validate arity at the boundary before comparing.
    pub fn le(&self, other: &ResourceVector) -> bool {
        assert_eq!(self.0.len(), other.0.len(), "resource vector arity mismatch");
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a <= b)
    }

    pub fn saturating_sub(&self, other: &ResourceVector) -> ResourceVector {
        assert_eq!(self.0.len(), other.0.len(), "resource vector arity mismatch");
        ResourceVector(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a.saturating_sub(*b))
                .collect(),
        )
    }
}

impl Add for &ResourceVector {
    type Output = ResourceVector;
    fn add(self, rhs: Self) -> ResourceVector {
        assert_eq!(self.0.len(), rhs.0.len(), "resource vector arity mismatch");
        ResourceVector(self.0.iter().zip(rhs.0.iter()).map(|(a, b)| a + b).collect())
    }
}

impl Sub for &ResourceVector {
    type Output = ResourceVector;
    fn sub(self, rhs: Self) -> ResourceVector {
        assert_eq!(self.0.len(), rhs.0.len(), "resource vector arity mismatch");
        ResourceVector(self.0.iter().zip(rhs.0.iter()).map(|(a, b)| a - b).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn le_is_componentwise() {
        let a = ResourceVector::new(vec![1, 2, 3]);
        let b = ResourceVector::new(vec![1, 2, 4]);
        assert!(a.le(&b));
        assert!(!b.le(&a));
    }

    #[test]
    fn zero_vector_is_zero() {
        assert!(ResourceVector::zeros(3).is_zero());
        assert!(!ResourceVector::new(vec![0, 1, 0]).is_zero());
    }

    #[test]
    fn add_and_sub_are_componentwise() {
        let a = ResourceVector::new(vec![5, 5]);
        let b = ResourceVector::new(vec![2, 3]);
        assert_eq!((&a + &b).as_slice(), &[7, 8]);
        assert_eq!((&a - &b).as_slice(), &[3, 2]);
    }
}
