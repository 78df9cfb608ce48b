use std::fmt::Write as _;
use std::io::{self, Write};

use anyhow::{Context, Result};
use mmpol_gradcheck::GradientBuffer;
use mmpol_gradcheck::check::first_not_close;
use mmpol_gradcheck::io::dump;

use crate::cli::CompareArgs;
use crate::io::open_input;

pub fn run_compare(args: CompareArgs) -> Result<u8> {
    let a = read_block(&args.a, &args.label)?;
    let b = read_block(&args.b, &args.label)?;

    let comparison = compare(&a, &b, &args.label, args.rtol, args.atol)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(comparison.text.as_bytes())?;
    stdout.flush()?;

    Ok(if comparison.close { 0 } else { 1 })
}

fn read_block(path: &std::path::Path, label: &str) -> Result<GradientBuffer> {
    let rows = dump::reader::read(open_input(path)?, label)
        .with_context(|| format!("Failed to read 'Grad {label}' from {}", path.display()))?;
    Ok(GradientBuffer::from_rows(rows))
}

struct Comparison {
    text: String,
    close: bool,
}

/// Per-atom rows of `a`, `b` and `|a − b|`, then one `Delta Max` summary
/// line: location and size of the largest absolute difference, the largest
/// relative difference in percent, and whether every component is close.
fn compare(
    a: &GradientBuffer,
    b: &GradientBuffer,
    label: &str,
    rtol: f64,
    atol: f64,
) -> Result<Comparison> {
    let close = first_not_close(a, b, rtol, atol)
        .context("Gradient blocks cover different atom counts")?
        .is_none();

    let mut text = String::new();
    let mut max_abs = (0.0_f64, 0usize);
    let mut max_rel = f64::NAN;

    for (i, (ra, rb)) in a.iter().zip(b.iter()).enumerate() {
        let delta = [0usize, 1, 2].map(|k| (ra[k] - rb[k]).abs());
        for k in 0..3 {
            if delta[k] > max_abs.0 {
                max_abs = (delta[k], 3 * i + k);
            }
            let rel = delta[k] / rb[k].abs();
            if !rel.is_nan() && (max_rel.is_nan() || rel > max_rel) {
                max_rel = rel;
            }
        }
        let _ = writeln!(text, "[{i:5}] {:12.6} {:12.6} {:12.6}", ra[0], ra[1], ra[2]);
        let _ = writeln!(text, "        {:12.6} {:12.6} {:12.6}", rb[0], rb[1], rb[2]);
        let _ = writeln!(
            text,
            "        {:12.6} {:12.6} {:12.6}",
            delta[0], delta[1], delta[2]
        );
    }

    let max_rel = if max_rel.is_nan() { 0.0 } else { 100.0 * max_rel };
    let _ = writeln!(
        text,
        "Delta Max {label:5} {:6}/{:1} {:8.2e}({:8.2e}) {:8.2e}%({:8.2e}%) {}",
        max_abs.1 / 3,
        max_abs.1 % 3,
        max_abs.0,
        atol,
        max_rel,
        rtol * 100.0,
        if close { "True" } else { "False" }
    );

    Ok(Comparison { text, close })
}
