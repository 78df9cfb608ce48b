use crate::io::{Error, Format};
use std::io::BufRead;

/// Reads the rows of the last `Grad <label>` block, `MM:` rows followed by
/// `QM:` rows, in the units they were written in.
///
/// A later block with the same label replaces an earlier one, so a dump that
/// was appended to across runs yields its newest gradient. Rows end at the
/// first blank line. A leading `MM:<i>`/`QM:<i>` token is optional so bare
/// three-column dumps are accepted too.
pub fn read<R: BufRead>(reader: R, label: &str) -> Result<Vec<[f64; 3]>, Error> {
    let header = format!("Grad {label}");
    let mut block: Option<Vec<[f64; 3]>> = None;
    let mut in_block = false;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if in_block {
            if trimmed.is_empty() {
                in_block = false;
            } else if let Some(rows) = block.as_mut() {
                rows.push(parse_row(trimmed, idx + 1)?);
            }
        } else if trimmed == header {
            block = Some(Vec::new());
            in_block = true;
        }
    }

    block.ok_or_else(|| Error::MissingBlock(label.to_string()))
}

fn parse_row(line: &str, line_no: usize) -> Result<[f64; 3], Error> {
    let mut parts = line.split_whitespace().peekable();
    if parts
        .peek()
        .is_some_and(|p| p.starts_with("MM:") || p.starts_with("QM:"))
    {
        parts.next();
    }
    let values: Vec<_> = parts.collect();
    if values.len() != 3 {
        return Err(Error::parse(
            Format::Dump,
            line_no,
            "gradient rows must have exactly three components",
        ));
    }
    let mut row = [0.0; 3];
    for (k, value) in values.iter().enumerate() {
        row[k] = value.parse::<f64>().map_err(|_| {
            Error::parse(
                Format::Dump,
                line_no,
                format!("invalid gradient component '{value}'"),
            )
        })?;
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::Session;
    use crate::io::dump::writer;
    use crate::model::gradient::GradientBuffer;
    use crate::model::units::GRAD_AU2KCALMOL_ANG;
    use crate::reference::fixtures;
    use std::io::BufReader;

    #[test]
    fn reads_the_requested_block() {
        let text = "Grad EM\nMM:0 1.0 2.0 3.0\n\nGrad EB\nMM:0 -1.0 0.5 0.0\nMM:1 4.0 5.0 6.0\n\n";
        let rows = read(text.as_bytes(), "EB").unwrap();
        assert_eq!(rows, vec![[-1.0, 0.5, 0.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn repeated_label_yields_the_last_block() {
        let text = "Grad ETOT\nMM:0 1.0 1.0 1.0\n\nGrad EB\nMM:0 0.0 0.0 0.0\n\n\
                    Grad ETOT\nMM:0 2.0 -2.0 0.5\nMM:1 3.0 0.0 0.0\n\n";
        let rows = read(text.as_bytes(), "ETOT").unwrap();
        assert_eq!(rows, vec![[2.0, -2.0, 0.5], [3.0, 0.0, 0.0]]);
    }

    #[test]
    fn header_must_match_exactly() {
        let text = "Grad ETOT\n1 2 3\n";
        assert!(matches!(
            read(text.as_bytes(), "ET"),
            Err(Error::MissingBlock(label)) if label == "ET"
        ));
    }

    #[test]
    fn bare_rows_are_accepted() {
        let text = "Grad EP\n+1.0 -2.0 +3.0\n";
        assert_eq!(read(text.as_bytes(), "EP").unwrap(), vec![[1.0, -2.0, 3.0]]);
    }

    #[test]
    fn malformed_row_reports_its_line() {
        let text = "Grad EA\nMM:0 1.0 2.0\n";
        assert!(matches!(
            read(text.as_bytes(), "EA"),
            Err(Error::Parse {
                format: Format::Dump,
                line: 2,
                ..
            })
        ));
    }

    #[test]
    fn round_trips_through_a_file() {
        let grad = GradientBuffer::from_rows(vec![[1.25e-3, -4.0e-7, 0.0], [3.5, 0.0, -1.0]]);
        let qm = GradientBuffer::from_rows(vec![[0.5, 0.25, -0.125]]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writer::write_block(&mut file, "EVQMMM", &grad, Some(&qm)).unwrap();

        let rows = read(BufReader::new(file.reopen().unwrap()), "EVQMMM").unwrap();
        let expected: Vec<_> = grad.iter().chain(qm.iter()).collect();
        assert_eq!(rows.len(), expected.len());
        for (r, e) in rows.iter().zip(expected) {
            for k in 0..3 {
                let want = e[k] * GRAD_AU2KCALMOL_ANG;
                assert!((r[k] - want).abs() <= 1e-8 * want.abs());
            }
        }
    }

    #[test]
    fn composed_total_has_no_gradient_left_on_link_atoms() {
        let (mm, qm) = fixtures::qmmm_system();
        let mm_atoms = mm.atoms().len();
        let link = qm.links()[0].link;
        let mut session = Session::with_qm(mm, Box::new(qm)).unwrap();
        let mut out = Vec::new();
        writer::write(&mut out, &mut session).unwrap();

        let rows = read(out.as_slice(), "ETOT").unwrap();
        assert_eq!(rows.len(), mm_atoms + 5);
        assert_eq!(rows[mm_atoms + link], [0.0; 3]);
    }
}
