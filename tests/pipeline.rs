use bfv_budget::{
    BatchEncoder, BfvError, Ciphertext, CryptoContext, Decryptor, Encoder, Encryptor, Evaluator,
    KeyGenerator, NoiseBudgetTracker, Operation, ParameterSet,
};
use proptest::prelude::*;
use tracing_subscriber::EnvFilter;

struct Pipeline {
    context: CryptoContext,
    encoder: Encoder,
    encryptor: Encryptor,
    evaluator: Evaluator,
    decryptor: Decryptor,
}

impl Pipeline {
    fn new(ring_dimension: usize, plaintext_modulus: u64) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let params = ParameterSet::new(ring_dimension, plaintext_modulus).unwrap();
        let context = CryptoContext::new(params).unwrap();
        let (secret_key, keygen) = KeyGenerator::generate(&context).unwrap();
        let public_key = keygen.create_public_key().unwrap();
        Self {
            encoder: Encoder::new(&context),
            encryptor: Encryptor::new(&context, &public_key).unwrap(),
            evaluator: Evaluator::new(&context),
            decryptor: Decryptor::new(&context, secret_key).unwrap(),
            context,
        }
    }

    fn encrypt(&self, value: u64) -> Ciphertext {
        let pt = self.encoder.encode(value).unwrap();
        self.encryptor.encrypt(&pt).unwrap()
    }

    fn decrypt(&self, ct: &Ciphertext) -> u64 {
        let pt = self.decryptor.decrypt(ct).unwrap();
        self.encoder.decode(&pt).unwrap()
    }

    fn budget(&self, ct: &Ciphertext) -> u32 {
        self.decryptor.invariant_noise_budget(ct).unwrap()
    }
}

#[test]
fn test_reference_scenario() {
    let p = Pipeline::new(4096, 1024);
    let mut tracker = NoiseBudgetTracker::new(&p.decryptor);
    let two = p.encoder.encode(2).unwrap();
    let four = p.encoder.encode(4).unwrap();

    let x = p.encrypt(4);
    let fresh = tracker.sample(Operation::Encrypt, &x).unwrap().budget;
    assert_eq!(fresh, p.context.max_noise_budget());

    let x_sq = p.evaluator.square(&x).unwrap();
    assert!(x_sq.size() > x.size());
    tracker.sample(Operation::Square, &x_sq).unwrap();
    let four_x_sq = p.evaluator.multiply_plain(&x_sq, &four).unwrap();
    tracker.sample(Operation::MultiplyPlain, &four_x_sq).unwrap();

    let x_fourth = p.evaluator.square(&p.evaluator.square(&x).unwrap()).unwrap();
    tracker.sample(Operation::Square, &x_fourth).unwrap();
    let two_x_fourth = p.evaluator.multiply_plain(&x_fourth, &two).unwrap();
    tracker.sample(Operation::MultiplyPlain, &two_x_fourth).unwrap();

    let result = p.evaluator.add(&four_x_sq, &two_x_fourth).unwrap();
    let last = tracker.sample(Operation::Add, &result).unwrap().budget;
    assert_eq!(result.size(), 5);
    assert!(last > 0);
    assert!(last < fresh);

    let plain = p.decryptor.decrypt(&result).unwrap();
    assert_eq!(p.encoder.decode(&plain).unwrap(), 576);
    assert_eq!(plain.to_string(), "240");
    assert_eq!(tracker.consumed(), fresh - last);
}

#[test]
fn test_fresh_budget_is_value_independent() {
    let p = Pipeline::new(4096, 1024);
    let expected = p.context.max_noise_budget();
    for v in [0, 1, 4, 511, 576, 1023] {
        assert_eq!(p.budget(&p.encrypt(v)), expected, "value {v}");
    }
}

#[test]
fn test_budget_never_increases_and_results_stay_correct() {
    let p = Pipeline::new(4096, 1024);
    let t = 1024u64;
    let x = p.encrypt(5);
    let mut ct = x.clone();
    let mut clear = 5u64;
    let mut budget = p.budget(&ct);

    let mut step = |ct: Ciphertext, clear: u64| {
        let b = p.budget(&ct);
        assert!(b <= budget, "budget rose from {budget} to {b}");
        budget = b;
        if b > 0 {
            assert_eq!(p.decrypt(&ct), clear);
        }
        ct
    };

    ct = step(p.evaluator.add(&ct, &ct).unwrap(), {
        clear = clear * 2 % t;
        clear
    });
    let three = p.encoder.encode(3).unwrap();
    ct = step(p.evaluator.multiply_plain(&ct, &three).unwrap(), {
        clear = clear * 3 % t;
        clear
    });
    ct = step(p.evaluator.square(&ct).unwrap(), {
        clear = clear * clear % t;
        clear
    });
    let hundred = p.encoder.encode(100).unwrap();
    ct = step(p.evaluator.add_plain(&ct, &hundred).unwrap(), {
        clear = (clear + 100) % t;
        clear
    });
    ct = step(p.evaluator.sub(&ct, &x).unwrap(), {
        clear = (clear + t - 5) % t;
        clear
    });
    ct = step(p.evaluator.negate(&ct).unwrap(), {
        clear = (t - clear) % t;
        clear
    });
    ct = step(p.evaluator.square(&ct).unwrap(), {
        clear = clear * clear % t;
        clear
    });
    assert_eq!(clear, 841);
    assert_eq!(ct.size(), 5);
}

#[test]
fn test_repeated_squaring_exhausts_small_parameters() {
    let p = Pipeline::new(1024, 16);
    let mut ct = p.encrypt(3);
    let mut clear = 3u64;
    let mut exhausted_at = None;
    let mut wrong_at = None;
    for i in 1..=6 {
        ct = p.evaluator.square(&ct).unwrap();
        clear = clear * clear % 16;
        let budget = p.budget(&ct);
        if budget == 0 && exhausted_at.is_none() {
            exhausted_at = Some(i);
        }
        if budget > 0 {
            assert_eq!(p.decrypt(&ct), clear, "x^(2^{i}) with {budget} bits left");
            continue;
        }
        let err = p.decryptor.decrypt(&ct).unwrap_err();
        assert!(err.is_budget_exhausted());
        assert!(matches!(err, BfvError::NoiseBudgetExhausted { budget: 0, .. }));

        let raw = p.decryptor.decrypt_unchecked(&ct).unwrap();
        if p.encoder.decode(&raw).unwrap() != clear {
            wrong_at = Some(i);
            break;
        }
    }
    let exhausted_at = exhausted_at.expect("budget never reached 0");
    let wrong_at = wrong_at.expect("unchecked decryption stayed correct");
    assert!(exhausted_at <= wrong_at);
}

#[test]
fn test_batched_slots_evaluate_independently() {
    let t = ParameterSet::batching_modulus(4096, 20).unwrap();
    let p = Pipeline::new(4096, t);
    let batch = BatchEncoder::new(&p.context).unwrap();
    let n = batch.slot_count();

    let a: Vec<u64> = (0..n as u64).collect();
    let b: Vec<u64> = (0..n as u64).map(|i| (3 * i + 11) % t).collect();
    let ca = p.encryptor.encrypt(&batch.encode(&a).unwrap()).unwrap();
    let cb = p.encryptor.encrypt(&batch.encode(&b).unwrap()).unwrap();
    let decrypt = |ct: &Ciphertext| batch.decode(&p.decryptor.decrypt(ct).unwrap()).unwrap();

    let sum = p.evaluator.add(&ca, &cb).unwrap();
    let expected: Vec<u64> = a.iter().zip(&b).map(|(x, y)| (x + y) % t).collect();
    assert_eq!(decrypt(&sum), expected);

    let scaled = p.evaluator.multiply_plain(&ca, &batch.encode(&b).unwrap()).unwrap();
    assert!(p.budget(&scaled) > 0);
    let expected: Vec<u64> = a.iter().zip(&b).map(|(x, y)| x * y % t).collect();
    assert_eq!(decrypt(&scaled), expected);

    let squared = p.evaluator.square(&cb).unwrap();
    assert_eq!(squared.size(), 3);
    let expected: Vec<u64> = b.iter().map(|y| y * y % t).collect();
    assert_eq!(decrypt(&squared), expected);
}

#[test]
fn test_batching_needs_a_friendly_modulus() {
    let p = Pipeline::new(4096, 1024);
    let err = BatchEncoder::new(&p.context).unwrap_err();
    assert!(matches!(err, BfvError::UnsupportedParameters { .. }));
}

#[test]
fn test_context_from_dimensions_runs_the_pipeline() {
    let context: CryptoContext = CryptoContext::from_dimensions(2048, 257).unwrap();
    let (secret_key, keygen) = KeyGenerator::generate(&context).unwrap();
    let encoder = Encoder::new(&context);
    let encryptor = Encryptor::new(&context, &keygen.create_public_key().unwrap()).unwrap();
    let decryptor = Decryptor::new(&context, secret_key).unwrap();
    let ct = encryptor.encrypt(&encoder.encode(42).unwrap()).unwrap();
    assert_eq!(decryptor.invariant_noise_budget(&ct).unwrap(), context.max_noise_budget());
    assert_eq!(encoder.decode(&decryptor.decrypt(&ct).unwrap()).unwrap(), 42);
}

#[test]
fn test_objects_from_other_contexts_are_rejected() {
    let a = Pipeline::new(1024, 16);
    let b = Pipeline::new(1024, 16);
    let ca = a.encrypt(1);
    let cb = b.encrypt(1);

    let err = a.evaluator.add(&ca, &cb).unwrap_err();
    assert!(matches!(err, BfvError::ContextMismatch { .. }));
    assert!(!err.is_budget_exhausted());
    assert!(a.decryptor.invariant_noise_budget(&cb).is_err());
    assert!(a.decryptor.decrypt(&cb).is_err());
    assert!(a.encryptor.encrypt(&b.encoder.encode(1).unwrap()).is_err());
}

#[test]
fn test_public_keys_share_one_secret() {
    let params = ParameterSet::new(2048, 257).unwrap();
    let context: CryptoContext = CryptoContext::new(params).unwrap();
    let (secret_key, keygen) = KeyGenerator::generate(&context).unwrap();
    let encoder = Encoder::new(&context);
    let decryptor = Decryptor::new(&context, secret_key).unwrap();
    let evaluator = Evaluator::new(&context);

    let e1 = Encryptor::new(&context, &keygen.create_public_key().unwrap()).unwrap();
    let e2 = Encryptor::new(&context, &keygen.create_public_key().unwrap()).unwrap();
    let a = e1.encrypt(&encoder.encode(200).unwrap()).unwrap();
    let b = e2.encrypt(&encoder.encode(100).unwrap()).unwrap();
    let sum = evaluator.add(&a, &b).unwrap();
    let plain = decryptor.decrypt(&sum).unwrap();
    assert_eq!(encoder.decode(&plain).unwrap(), 43);
}

#[test]
fn test_trace_writes_as_csv() {
    let p = Pipeline::new(2048, 257);
    let mut tracker = NoiseBudgetTracker::new(&p.decryptor);
    let x = p.encrypt(2);
    tracker.sample(Operation::Encrypt, &x).unwrap();
    tracker
        .sample(Operation::Square, &p.evaluator.square(&x).unwrap())
        .unwrap();

    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in tracker.trace() {
        wtr.serialize(record).unwrap();
    }
    let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("step,operation,size,budget,delta"));
    assert!(lines.next().unwrap().starts_with("0,encrypt,2,"));
    assert!(lines.next().unwrap().starts_with("1,square,3,"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn encode_decode_roundtrip(t in 2u64..(1 << 20), seed in any::<u64>()) {
        let context: CryptoContext = CryptoContext::new(ParameterSet::new(2048, t).unwrap()).unwrap();
        let encoder = Encoder::new(&context);
        let v = seed % t;
        let pt = encoder.encode(v).unwrap();
        prop_assert_eq!(encoder.decode(&pt).unwrap(), v);
        prop_assert!(encoder.encode(t).is_err());
    }

    #[test]
    fn coefficient_roundtrip(coeffs in prop::collection::vec(0u64..1024, 0..64)) {
        let context: CryptoContext = CryptoContext::new(ParameterSet::new(1024, 1024).unwrap()).unwrap();
        let encoder = Encoder::new(&context);
        let pt = encoder.encode_coefficients(&coeffs).unwrap();
        let back = encoder.decode_coefficients(&pt).unwrap();
        prop_assert_eq!(&back[..coeffs.len()], &coeffs[..]);
        prop_assert!(back[coeffs.len()..].iter().all(|&c| c == 0));
    }
}
