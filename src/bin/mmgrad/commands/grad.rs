use anyhow::{Context, Result};
use mmpol_gradcheck::io::dump;

use super::{load_session, load_substeps};
use crate::cli::GradArgs;
use crate::display::{Context as DisplayContext, Progress, print_system_summary};
use crate::io::create_output;

const TOTAL_STEPS: u8 = 2;

pub fn run_grad(args: GradArgs, ctx: DisplayContext) -> Result<u8> {
    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Loading system");
    let mut session = load_session(&args.files)?;
    progress.complete_step("Loading system", &load_substeps(&session, &args.files));

    if ctx.interactive {
        print_system_summary(&session);
    }

    progress.step("Writing analytic gradients");
    let output = create_output(&args.files.report)?;
    dump::writer::write(output, &mut session)
        .with_context(|| format!("Failed to write {}", args.files.report.display()))?;
    progress.complete_step(
        "Writing analytic gradients",
        &[format!("kcal/mol/Å to {}", args.files.report.display())],
    );

    progress.finish(true);
    Ok(0)
}
