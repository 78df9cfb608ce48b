use crate::io::{Error, Format};
use std::io::BufRead;

/// Reads an external electric field, one `Ex Ey Ez` row per atom in atomic
/// units. Blank lines and `#` comments are skipped.
pub fn read<R: BufRead>(reader: R, atom_count: usize) -> Result<Vec<[f64; 3]>, Error> {
    let mut rows = Vec::with_capacity(atom_count);
    let mut last_line = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        last_line = line_no;

        let data = line.split('#').next().unwrap_or_default().trim();
        if data.is_empty() {
            continue;
        }
        let parts: Vec<_> = data.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(Error::parse(
                Format::Field,
                line_no,
                "field rows must have exactly three components",
            ));
        }
        let mut row = [0.0; 3];
        for (k, part) in parts.iter().enumerate() {
            row[k] = part.parse::<f64>().map_err(|_| {
                Error::parse(
                    Format::Field,
                    line_no,
                    format!("invalid field component '{part}'"),
                )
            })?;
        }
        rows.push(row);
    }

    if rows.len() != atom_count {
        return Err(Error::parse(
            Format::Field,
            last_line,
            format!("expected {atom_count} field rows, found {}", rows.len()),
        ));
    }
    Ok(rows)
}
