use anyhow::{Context, Result};
use mmpol_gradcheck::io::{report, system};
use mmpol_gradcheck::{TermResult, ValidationConfig, ValidationReport};
use tracing::info;

use super::{load_session, load_substeps};
use crate::cli::{CheckArgs, ValidationOptions};
use crate::display::{Context as DisplayContext, Progress, print_results, print_system_summary};
use crate::io::{create_output, open_input};

const TOTAL_STEPS: u8 = 3;

pub fn run_check(args: CheckArgs, ctx: DisplayContext) -> Result<u8> {
    let config = resolve_config(&args.validation)?;
    let mut progress = Progress::new(ctx.interactive, TOTAL_STEPS);

    progress.step("Loading system");
    let mut session = load_session(&args.files)?;
    progress.complete_step("Loading system", &load_substeps(&session, &args.files));

    if ctx.interactive {
        print_system_summary(&session);
    }

    progress.step("Comparing numerical and analytic gradients");
    let report = session.validate_with(&config, |check| {
        progress.detail(&format!("Differentiating {}...", check.name()));
    })?;
    progress.complete_step(
        "Comparing numerical and analytic gradients",
        &[format!(
            "{} checks, step {:e} bohr",
            report.results().len(),
            config.step
        )],
    );

    if ctx.interactive {
        print_results(&report);
    }

    progress.step("Writing report");
    let output = create_output(&args.files.report)?;
    report::writer::write(output, &report)
        .with_context(|| format!("Failed to write {}", args.files.report.display()))?;
    progress.complete_step("Writing report", &failure_substeps(&report));

    let status = report.status();
    info!(%status, "validation finished");
    progress.finish(report.all_passed());
    Ok(status.exit_byte())
}

/// Config file values, overridden by `--step` and `--terms`.
fn resolve_config(options: &ValidationOptions) -> Result<ValidationConfig> {
    let mut config = match &options.config {
        Some(path) => system::reader::read_config(open_input(path)?)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ValidationConfig::default(),
    };
    if let Some(step) = options.step {
        config.step = step;
    }
    if !options.terms.is_empty() {
        config.terms = options.terms.clone();
    }
    Ok(config)
}

fn failure_substeps(report: &ValidationReport) -> Vec<String> {
    let failed: Vec<&TermResult> = report.failed().collect();
    if failed.is_empty() {
        return vec!["All checks within tolerance".to_string()];
    }
    failed
        .iter()
        .map(|r| {
            format!(
                "{} exceeds tolerance: {:.3e} > {:.3e}",
                r.check().name(),
                r.max_deviation(),
                r.threshold()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn options(config: Option<std::path::PathBuf>) -> ValidationOptions {
        ValidationOptions {
            step: None,
            terms: Vec::new(),
            config,
        }
    }

    #[test]
    fn defaults_without_config() {
        let config = resolve_config(&options(None)).unwrap();
        assert_eq!(config.step, 1e-5);
        assert!(config.terms.is_empty());
    }

    #[test]
    fn command_line_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "step = 2e-5\nterms = [\"bond\"]").unwrap();

        let mut opts = options(Some(file.path().to_path_buf()));
        let config = resolve_config(&opts).unwrap();
        assert_eq!(config.step, 2e-5);
        assert_eq!(config.terms, ["bond"]);

        opts.step = Some(1e-4);
        opts.terms = vec!["angle".into(), "EVQMMM".into()];
        let config = resolve_config(&opts).unwrap();
        assert_eq!(config.step, 1e-4);
        assert_eq!(config.terms, ["angle", "EVQMMM"]);
    }
}
