//! Noise budget sampling across an evaluation sequence.

use std::fmt;

use serde::Serialize;

use crate::backend::{Bfv, HomomorphicBackend};
use crate::cipher::Ciphertext;
use crate::decryptor::Decryptor;
use crate::error::Result;

/// Step that produced a sampled ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Fresh encryption.
    Encrypt,
    /// Ciphertext addition.
    Add,
    /// Ciphertext subtraction.
    Sub,
    /// Negation.
    Negate,
    /// Ciphertext product.
    Multiply,
    /// Ciphertext square.
    Square,
    /// Product with a plaintext.
    MultiplyPlain,
    /// Sum with a plaintext.
    AddPlain,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Encrypt => "encrypt",
            Operation::Add => "add",
            Operation::Sub => "sub",
            Operation::Negate => "negate",
            Operation::Multiply => "multiply",
            Operation::Square => "square",
            Operation::MultiplyPlain => "multiply_plain",
            Operation::AddPlain => "add_plain",
        };
        f.write_str(name)
    }
}

/// One sample: operation, resulting size and remaining budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    /// Position in the trace, from 0.
    pub step: usize,
    /// Operation that produced the ciphertext.
    pub operation: Operation,
    /// Ciphertext size after the operation.
    pub size: usize,
    /// Remaining invariant noise budget in bits.
    pub budget: u32,
    /// Change against the previous sample; 0 for the first.
    pub delta: i64,
}

/// Ordered, purely observational record of an evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationTrace {
    records: Vec<TraceRecord>,
}

impl EvaluationTrace {
    /// Samples in order.
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True before the first sample.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<&TraceRecord> {
        self.records.last()
    }

    /// Iterates the samples in order.
    pub fn iter(&self) -> std::slice::Iter<'_, TraceRecord> {
        self.records.iter()
    }

    fn push(&mut self, operation: Operation, size: usize, budget: u32) -> &TraceRecord {
        let delta = self
            .records
            .last()
            .map_or(0, |prev| i64::from(budget) - i64::from(prev.budget));
        self.records.push(TraceRecord {
            step: self.records.len(),
            operation,
            size,
            budget,
            delta,
        });
        &self.records[self.records.len() - 1]
    }
}

impl<'a> IntoIterator for &'a EvaluationTrace {
    type Item = &'a TraceRecord;
    type IntoIter = std::slice::Iter<'a, TraceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Samples the budget of each ciphertext it is shown and keeps the trace.
pub struct NoiseBudgetTracker<'a, B: HomomorphicBackend = Bfv> {
    decryptor: &'a Decryptor<B>,
    trace: EvaluationTrace,
}

impl<'a, B: HomomorphicBackend> NoiseBudgetTracker<'a, B> {
    /// Starts with an empty trace.
    pub fn new(decryptor: &'a Decryptor<B>) -> Self {
        Self {
            decryptor,
            trace: EvaluationTrace::default(),
        }
    }

    /// Measures `ct` without touching it and appends a record.
    pub fn sample(&mut self, operation: Operation, ct: &Ciphertext<B>) -> Result<&TraceRecord> {
        let budget = self.decryptor.invariant_noise_budget(ct)?;
        Ok(self.trace.push(operation, ct.size(), budget))
    }

    /// Budget spent between the first and the latest sample.
    pub fn consumed(&self) -> u32 {
        match (self.trace.records.first(), self.trace.last()) {
            (Some(first), Some(last)) => first.budget.saturating_sub(last.budget),
            _ => 0,
        }
    }

    /// Trace collected so far.
    pub fn trace(&self) -> &EvaluationTrace {
        &self.trace
    }

    /// Releases the decryptor borrow and keeps the trace.
    pub fn into_trace(self) -> EvaluationTrace {
        self.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CryptoContext;
    use crate::encoder::Encoder;
    use crate::encryptor::Encryptor;
    use crate::evaluator::Evaluator;
    use crate::keys::KeyGenerator;
    use crate::params::ParameterSet;

    #[test]
    fn test_push_computes_deltas() {
        let mut trace = EvaluationTrace::default();
        assert!(trace.is_empty());
        trace.push(Operation::Encrypt, 2, 87);
        trace.push(Operation::Square, 3, 63);
        let last = trace.push(Operation::AddPlain, 3, 63).clone();
        assert_eq!(last.step, 2);
        assert_eq!(last.delta, 0);
        assert_eq!(trace.records()[1].delta, -24);
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn test_tracker_follows_a_chain() {
        let ctx: CryptoContext = CryptoContext::new(ParameterSet::new(2048, 64).unwrap()).unwrap();
        let (sk, keygen) = KeyGenerator::generate(&ctx).unwrap();
        let encryptor = Encryptor::new(&ctx, &keygen.create_public_key().unwrap()).unwrap();
        let decryptor = Decryptor::new(&ctx, sk).unwrap();
        let evaluator = Evaluator::new(&ctx);
        let encoder = Encoder::new(&ctx);

        let mut tracker = NoiseBudgetTracker::new(&decryptor);
        let x = encryptor.encrypt(&encoder.encode(3).unwrap()).unwrap();
        tracker.sample(Operation::Encrypt, &x).unwrap();
        let y = evaluator.add(&x, &x).unwrap();
        tracker.sample(Operation::Add, &y).unwrap();
        let z = evaluator.square(&y).unwrap();
        let rec = tracker.sample(Operation::Square, &z).unwrap();
        assert_eq!(rec.size, 3);

        let trace = tracker.trace();
        assert_eq!(trace.records()[0].budget, ctx.max_noise_budget());
        assert!(trace.iter().all(|r| r.delta <= 0));
        assert!(tracker.consumed() > 0);
        assert_eq!(
            i64::from(tracker.consumed()),
            -trace.iter().map(|r| r.delta).sum::<i64>()
        );
    }

    #[test]
    fn test_records_serialize() {
        let mut trace = EvaluationTrace::default();
        trace.push(Operation::MultiplyPlain, 2, 40);
        let json = serde_json::to_string(&trace.records()[0]).unwrap();
        assert_eq!(
            json,
            r#"{"step":0,"operation":"multiply_plain","size":2,"budget":40,"delta":0}"#
        );
    }
}
