use std::io::{self, Write};

use anyhow::Error;
use mmpol_gradcheck::check::Error as CheckError;
use mmpol_gradcheck::io::Error as IoError;
use mmpol_gradcheck::reference::Error as SystemError;

#[rustfmt::skip]
pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "   ╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(stderr, "   ║  ✗ Error                                                     ║");
    let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");

    for line in wrap(&err.to_string(), 59) {
        let _ = writeln!(stderr, "   ║  {:<59} ║", line);
    }

    for cause in err.chain().skip(1) {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Caused by:                                                  ║");
        for line in wrap(&cause.to_string(), 57) {
            let _ = writeln!(stderr, "   ║    {:<57} ║", line);
        }
    }

    let hints = hints(err);
    if !hints.is_empty() {
        let _ = writeln!(stderr, "   ╟──────────────────────────────────────────────────────────────╢");
        let _ = writeln!(stderr, "   ║  Hints:                                                      ║");
        for hint in hints {
            let wrapped = wrap(&hint, 55);
            if let Some((first, rest)) = wrapped.split_first() {
                let _ = writeln!(stderr, "   ║    • {:<55} ║", first);
                for line in rest {
                    let _ = writeln!(stderr, "   ║      {:<55} ║", line);
                }
            }
        }
    }

    let _ = writeln!(stderr, "   ╚══════════════════════════════════════════════════════════════╝");
    let _ = writeln!(stderr);
}

/// Hints for the innermost typed error in the chain.
fn hints(err: &Error) -> Vec<String> {
    let mut hints = Vec::new();
    for cause in err.chain().rev() {
        if let Some(e) = cause.downcast_ref::<SystemError>() {
            system_hints(e, &mut hints);
        } else if let Some(e) = cause.downcast_ref::<CheckError>() {
            check_hints(e, &mut hints);
        } else if let Some(e) = cause.downcast_ref::<IoError>() {
            io_hints(e, &mut hints);
        } else if let Some(e) = cause.downcast_ref::<io::Error>() {
            std_io_hints(e, &mut hints);
        } else {
            continue;
        }
        break;
    }
    hints
}

fn io_hints(err: &IoError, hints: &mut Vec<String>) {
    match err {
        IoError::Io { source } => std_io_hints(source, hints),
        IoError::Parse { format, line, .. } => {
            hints.push(format!("Inspect the {format} file around line {line}"));
            hints.push("Comment lines start with '#'; every other line holds x y z".into());
        }
        IoError::MissingBlock(label) => {
            hints.push(format!("Neither dump contains a 'Grad {label}' block"));
            hints.push("Labels are case sensitive: EB, EA, EVQMMM, ETOT, ...".into());
        }
        IoError::System(e) => system_hints(e, hints),
        IoError::Validation(e) => check_hints(e, hints),
    }
}

fn system_hints(err: &SystemError, hints: &mut Vec<String>) {
    match err {
        SystemError::Parse(_) => {
            hints.push("The system description is not valid TOML".into());
            hints.push("Check [[atoms]] tables and the spelling of every key".into());
        }
        SystemError::EmptySystem => {
            hints.push("Add at least one [[atoms]] entry".into());
        }
        SystemError::InvalidAtomIndex { term, .. } => {
            hints.push(format!("Atom indices in [[{term}s]] entries are zero based"));
            hints.push("QM indices count from the first [[qm.atoms]] entry".into());
        }
        SystemError::InvalidParameter(_) => {
            hints.push("Force constants and radii must be finite; radii positive".into());
        }
        SystemError::NotConverged { .. } => {
            hints.push("Raise [polarization] max_iterations or loosen tolerance".into());
            hints.push("Or switch to solver = \"inversion\"".into());
        }
        SystemError::SingularPolarization => {
            hints.push("Two polarizable sites may be too close together".into());
        }
        SystemError::DegenerateGeometry { .. } => {
            hints.push("Look for coincident atoms or linear angles and torsions".into());
        }
        SystemError::FieldShape { expected, .. } => {
            hints.push(format!("The field file needs exactly {expected} rows"));
        }
    }
}

fn check_hints(err: &CheckError, hints: &mut Vec<String>) {
    match err {
        CheckError::InvalidStep(_) => {
            hints.push("--step must be a positive number, typically 1e-5 bohr".into());
        }
        CheckError::MissingQmRegion(_) | CheckError::MissingShadow => {
            hints.push("QM/MM checks need a [qm] section in the system file".into());
        }
        CheckError::Config(_) => {
            hints.push("Known checks: the term names (bond, polelec, ...)".into());
            hints.push("or their labels (EB, EP, ...), EVQMMM and shadow".into());
        }
        CheckError::Evaluation { .. } => {
            hints.push("The energy model failed at a perturbed geometry".into());
            hints.push("Try a smaller --step".into());
        }
        CheckError::AtomCountMismatch { .. } | CheckError::AtomOutOfRange { .. } => {
            hints.push("Internal wiring error; please report if reproducible".into());
        }
    }
}

fn std_io_hints(err: &io::Error, hints: &mut Vec<String>) {
    use io::ErrorKind;

    match err.kind() {
        ErrorKind::NotFound => {
            hints.push("Check the path spelling and ensure the file exists".into());
        }
        ErrorKind::PermissionDenied => {
            hints.push("Check file permissions with `ls -la`".into());
        }
        ErrorKind::InvalidData => {
            hints.push("The file is not valid UTF-8 text".into());
        }
        ErrorKind::WriteZero => {
            hints.push("Check available disk space".into());
        }
        _ => {
            hints.push("Check file path, permissions, and disk space".into());
        }
    }
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        let fits = lines
            .last()
            .is_some_and(|line| line.len() + 1 + word.len() <= width);
        if let (true, Some(line)) = (fits, lines.last_mut()) {
            line.push(' ');
            line.push_str(word);
        } else {
            lines.push(word.to_string());
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(wrap("the quick brown fox", 10), ["the quick", "brown fox"]);
        assert_eq!(wrap("", 10), [""]);
    }

    #[test]
    fn hints_come_from_the_innermost_typed_error() {
        let err = Error::new(IoError::from(SystemError::EmptySystem)).context("Failed to load");
        assert_eq!(hints(&err), ["Add at least one [[atoms]] entry"]);
    }

    #[test]
    fn untyped_errors_have_no_hints() {
        assert!(hints(&anyhow::anyhow!("plain")).is_empty());
    }
}
