//! Evaluates 2x⁴ + 4x² under encryption and reports size and noise budget per step.

use std::error::Error;
use std::path::PathBuf;

use bfv_budget::{
    Ciphertext, CryptoContext, Decryptor, Encoder, Encryptor, Evaluator, KeyGenerator,
    NoiseBudgetTracker, Operation, ParameterSet, SecurityLevel,
};
use clap::{Parser, ValueEnum};
use csv::Writer;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Security {
    Tc128,
    Tc192,
    Tc256,
}

impl From<Security> for SecurityLevel {
    fn from(s: Security) -> Self {
        match s {
            Security::Tc128 => SecurityLevel::Tc128,
            Security::Tc192 => SecurityLevel::Tc192,
            Security::Tc256 => SecurityLevel::Tc256,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Encrypted evaluation of 2x⁴ + 4x² with noise budget tracking", long_about = None)]
struct Args {
    #[arg(short = 'n', long, default_value_t = 4096)]
    ring_dimension: usize,

    #[arg(short = 't', long = "plaintext-modulus", default_value_t = 1024)]
    plaintext_modulus: u64,

    #[arg(short, long, default_value_t = 4)]
    x: u64,

    #[arg(short, long, value_enum, default_value_t = Security::Tc128)]
    security: Security,

    /// Keep squaring a fresh ciphertext until the budget runs out (0 skips)
    #[arg(long, default_value_t = 0)]
    max_squarings: usize,

    /// Write the evaluation trace as CSV
    #[arg(long)]
    trace_csv: Option<PathBuf>,
}

fn report(label: &str, ct: &Ciphertext, budget: u32) {
    println!("Size of {label}: {}", ct.size());
    println!("Noise budget of {label}: {budget} bits");
    println!();
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let params = ParameterSet::with_security_level(
        args.ring_dimension,
        args.plaintext_modulus,
        args.security.into(),
    )?;
    info!(
        ring_dimension = params.ring_dimension(),
        plaintext_modulus = params.plaintext_modulus(),
        modulus_bits = params.modulus_bits(),
        "parameters"
    );

    let context: CryptoContext = CryptoContext::new(params)?;
    let (secret_key, keygen) = KeyGenerator::generate(&context)?;
    let public_key = keygen.create_public_key()?;
    let encoder = Encoder::new(&context);
    let encryptor = Encryptor::new(&context, &public_key)?;
    let evaluator = Evaluator::new(&context);
    let decryptor = Decryptor::new(&context, secret_key)?;
    let mut tracker = NoiseBudgetTracker::new(&decryptor);

    let x = encryptor.encrypt(&encoder.encode(args.x)?)?;
    let fresh = tracker.sample(Operation::Encrypt, &x)?.budget;
    println!("Size of the encrypted ciphertext: {}", x.size());
    println!("Noise budget of the ciphertext: {fresh} bits");
    println!("Compute 2x⁴ + 4x²");
    println!();

    let two = encoder.encode(2 % args.plaintext_modulus)?;
    let four = encoder.encode(4 % args.plaintext_modulus)?;

    let x_sq = evaluator.square(&x)?;
    tracker.sample(Operation::Square, &x_sq)?;
    let four_x_sq = evaluator.multiply_plain(&x_sq, &four)?;
    let budget = tracker.sample(Operation::MultiplyPlain, &four_x_sq)?.budget;
    report("4*x²", &four_x_sq, budget);

    let x_fourth = evaluator.square(&evaluator.square(&x)?)?;
    tracker.sample(Operation::Square, &x_fourth)?;
    let two_x_fourth = evaluator.multiply_plain(&x_fourth, &two)?;
    let budget = tracker.sample(Operation::MultiplyPlain, &two_x_fourth)?.budget;
    report("2*x⁴", &two_x_fourth, budget);

    let result = evaluator.add(&four_x_sq, &two_x_fourth)?;
    let budget = tracker.sample(Operation::Add, &result)?.budget;
    report("2*x⁴ + 4*x²", &result, budget);

    let t = u128::from(args.plaintext_modulus);
    let v = u128::from(args.x);
    let v2 = v * v % t;
    let expected = (2 * (v2 * v2 % t) + 4 * v2) % t;
    match decryptor.decrypt(&result) {
        Ok(plain) => {
            println!("Decryption: 0x{plain}");
            println!("Expected:   0x{expected:X}");
        }
        Err(e) if e.is_budget_exhausted() => println!("Decryption refused: {e}"),
        Err(e) => return Err(e.into()),
    }
    println!("Noise budget consumed: {} bits", tracker.consumed());

    if let Some(path) = &args.trace_csv {
        let mut wtr = Writer::from_path(path)?;
        for record in tracker.trace() {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        info!(path = %path.display(), records = tracker.trace().len(), "trace written");
    }

    if args.max_squarings > 0 {
        println!();
        println!("Repeated squaring of x");
        let mut ct = x.clone();
        let mut expected = v % t;
        for i in 1..=args.max_squarings {
            ct = evaluator.square(&ct)?;
            expected = expected * expected % t;
            let budget = decryptor.invariant_noise_budget(&ct)?;
            println!("x^(2^{i}): size {}, noise budget {budget} bits", ct.size());
            if budget == 0 {
                let err = decryptor.decrypt(&ct).err();
                let raw = encoder.decode(&decryptor.decrypt_unchecked(&ct)?)?;
                if let Some(err) = err {
                    println!("{err}");
                }
                println!("Unchecked decryption gives {raw}, expected {expected}");
                break;
            }
        }
    }

    Ok(())
}
