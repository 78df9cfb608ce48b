mod check;
mod compare;
mod grad;

use check::run_check;
use compare::run_compare;
use grad::run_grad;

use anyhow::{Context, Result};
use mmpol_gradcheck::io::{field, system};
use mmpol_gradcheck::{MolecularSystem, ReferenceSystem, Session};

use crate::cli::{Command, SystemFiles};
use crate::display::Context as DisplayContext;
use crate::io::open_input;

/// Runs `command` and returns the process exit status.
pub fn dispatch(command: Command, ctx: DisplayContext) -> Result<u8> {
    match command {
        Command::Check(args) => run_check(args, ctx),
        Command::Grad(args) => run_grad(args, ctx),
        Command::Compare(args) => run_compare(args),
    }
}

/// Loads the system, applies the optional external field and, for a QM/MM
/// partition with link atoms, builds the shadow system.
fn load_session(files: &SystemFiles) -> Result<Session<ReferenceSystem>> {
    let input = open_input(&files.system)?;
    let (mut mm, qm) = system::reader::read(input)
        .with_context(|| format!("Failed to load system from {}", files.system.display()))?;

    if let Some(path) = &files.field {
        let rows = field::reader::read(open_input(path)?, mm.atom_count())
            .with_context(|| format!("Failed to read external field from {}", path.display()))?;
        mm.set_external_field(Some(rows))
            .context("External field does not match the system")?;
    }

    match qm {
        Some(qm) => Session::with_qm(mm, Box::new(qm)).context("Failed to set up the QM region"),
        None => Ok(Session::new(mm)),
    }
}

fn load_substeps(session: &Session<ReferenceSystem>, files: &SystemFiles) -> Vec<String> {
    let mut steps = vec![format!(
        "{} MM atoms from {}",
        session.system().atom_count(),
        files.system.display()
    )];
    if let Some(path) = &files.field {
        steps.push(format!("External field from {}", path.display()));
    }
    if let Some(qm) = session.qm() {
        let shadow = if session.shadow().is_some() {
            "shadow system built"
        } else {
            "no link atoms"
        };
        steps.push(format!("{} QM atoms, {shadow}", qm.qm_atom_count()));
    }
    steps
}
