use crate::check::ValidationReport;
use crate::io::Error;
use std::io::Write;

/// Writes one `DELTA NUM - ANA <LABEL>` block per check: the signed
/// `num − ana` of every atom, followed by a failure line when the check did
/// not pass.
pub fn write<W: Write>(mut writer: W, report: &ValidationReport) -> Result<(), Error> {
    for result in report.results() {
        writeln!(writer, "DELTA NUM - ANA {}", result.check().label())?;
        for row in result.deviations().iter() {
            writeln!(writer, "{:+16.8e} {:+16.8e} {:+16.8e}", row[0], row[1], row[2])?;
        }
        if !result.passed() {
            writeln!(
                writer,
                "Numerical-Analytical gradients difference is too large ({}): {:.3e} > {:.3e}",
                result.check().name(),
                result.max_deviation(),
                result.threshold(),
            )?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{Check, TermResult};
    use crate::model::gradient::GradientBuffer;
    use crate::model::term::Term;

    fn sample() -> ValidationReport {
        let mut report = ValidationReport::new();
        report.push(TermResult::new(
            Check::Term(Term::Bond),
            1e-8,
            false,
            GradientBuffer::from_rows(vec![[1e-3, 0.0, -2e-3], [0.0, 0.0, 0.0]]),
        ));
        report.push(TermResult::new(
            Check::QmmmVdw,
            1e-10,
            true,
            GradientBuffer::from_rows(vec![[1e-14, 0.0, 0.0], [0.0, -1e-14, 0.0]]),
        ));
        report
    }

    #[test]
    fn writes_one_block_per_check() {
        let mut out = Vec::new();
        write(&mut out, &sample()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let headers: Vec<_> = text
            .lines()
            .filter(|l| l.starts_with("DELTA NUM - ANA"))
            .collect();
        assert_eq!(headers, vec!["DELTA NUM - ANA EB", "DELTA NUM - ANA EVQMMM"]);
        assert!(text.contains("-2.00000000e-3"));
    }

    #[test]
    fn only_failing_checks_get_a_failure_line() {
        let mut out = Vec::new();
        write(&mut out, &sample()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let failures: Vec<_> = text
            .lines()
            .filter(|l| l.starts_with("Numerical-Analytical"))
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("(bond)"));
    }

    #[test]
    fn writes_to_a_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write(file.reopen().unwrap(), &sample()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(text.lines().count(), 5 + 4);
    }
}
