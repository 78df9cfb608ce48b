use crate::check::{Check, Session};
use crate::io::Error;
use crate::model::gradient::GradientBuffer;
use crate::model::system::MolecularSystem;
use crate::model::term::Term;
use crate::model::units::GRAD_AU2KCALMOL_ANG;
use std::io::Write;

/// Label of the link-atom correction block.
pub const LINK_ATOM_LABEL: &str = "ELA";

/// Writes one `Grad <LABEL>` block: `MM:` rows, then `QM:` rows if any,
/// converted from hartree/bohr to kcal/mol/Å.
pub fn write_block<W: Write>(
    writer: &mut W,
    label: &str,
    mm: &GradientBuffer,
    qm: Option<&GradientBuffer>,
) -> Result<(), Error> {
    writeln!(writer, "Grad {label}")?;
    write_rows(writer, "MM", mm)?;
    if let Some(qm) = qm {
        write_rows(writer, "QM", qm)?;
    }
    writeln!(writer)?;
    Ok(())
}

fn write_rows<W: Write>(writer: &mut W, side: &str, grad: &GradientBuffer) -> Result<(), Error> {
    for (i, row) in grad.iter().enumerate() {
        let [x, y, z] = row.map(|v| v * GRAD_AU2KCALMOL_ANG);
        writeln!(writer, "{side}:{i:<8} {x:+20.8e} {y:+20.8e} {z:+20.8e}")?;
    }
    Ok(())
}

/// Dumps every analytic gradient of `session`.
///
/// Each individual term comes first, MM rows only. Without a QM region the
/// dump ends with the full MM gradient. With one, the QM/MM stages follow:
/// the van der Waals cross term, then (only with link atoms) the shadow
/// internal gradient and the link-atom correction, then the composed total.
pub fn write<W: Write, S: MolecularSystem>(
    mut writer: W,
    session: &mut Session<S>,
) -> Result<(), Error> {
    let atoms = session.system().atom_count();
    for term in Term::INDIVIDUAL {
        let mut grad = GradientBuffer::zeros(atoms);
        session.system_mut().gradient(term, &mut grad)?;
        write_block(&mut writer, term.label(), &grad, None)?;
    }

    match session.qm().map(|qm| qm.uses_link_atoms()) {
        Some(link_atoms) => {
            let mut composer = session.composer();
            let part = composer.qmmm_vdw()?;
            write_block(&mut writer, Check::QmmmVdw.label(), &part.mm, Some(&part.qm))?;
            if link_atoms {
                let part = composer.shadow_internal()?;
                write_block(
                    &mut writer,
                    Check::ShadowInternal.label(),
                    &part.mm,
                    Some(&part.qm),
                )?;
                let part = composer.link_atom_stage()?;
                write_block(&mut writer, LINK_ATOM_LABEL, &part.mm, Some(&part.qm))?;
            }
            let total = composer.total()?;
            write_block(&mut writer, Term::Total.label(), &total.mm, Some(&total.qm))?;
        }
        None => {
            let mut grad = GradientBuffer::zeros(atoms);
            session.system_mut().full_gradient(&mut grad)?;
            write_block(&mut writer, Term::Total.label(), &grad, None)?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::fixtures;

    fn headers(text: &str) -> Vec<&str> {
        text.lines()
            .filter_map(|l| l.strip_prefix("Grad "))
            .collect()
    }

    #[test]
    fn mm_only_dump_ends_with_total() {
        let mut session = Session::new(fixtures::mm_system());
        let mut out = Vec::new();
        write(&mut out, &mut session).unwrap();
        let text = String::from_utf8(out).unwrap();
        let labels = headers(&text);
        assert_eq!(labels.len(), 15);
        assert_eq!(labels[0], "EM");
        assert_eq!(labels[14], "ETOT");
        assert!(!text.contains("QM:"));
    }

    #[test]
    fn qmmm_dump_has_every_stage() {
        let (mm, qm) = fixtures::qmmm_system();
        let mut session = Session::with_qm(mm, Box::new(qm)).unwrap();
        let mut out = Vec::new();
        write(&mut out, &mut session).unwrap();
        let text = String::from_utf8(out).unwrap();
        let labels = headers(&text);
        assert_eq!(&labels[14..], ["EVQMMM", "EQM", "ELA", "ETOT"]);
    }

    #[test]
    fn rows_are_converted_to_kcal_per_angstrom() {
        let grad = GradientBuffer::from_rows(vec![[1.0, 0.0, -0.5]]);
        let mut out = Vec::new();
        write_block(&mut out, "EB", &grad, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with("MM:0        "));
        let values: Vec<f64> = row
            .split_whitespace()
            .skip(1)
            .map(|v| v.parse().unwrap())
            .collect();
        assert!((values[0] - GRAD_AU2KCALMOL_ANG).abs() < 1e-5);
        assert_eq!(values[1], 0.0);
        assert!((values[2] + 0.5 * GRAD_AU2KCALMOL_ANG).abs() < 1e-5);
    }
}
