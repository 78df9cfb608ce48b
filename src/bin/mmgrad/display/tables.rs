use std::io::{self, Write};

use mmpol_gradcheck::{MolecularSystem, ReferenceSystem, Session, ValidationReport};

const INDENT: &str = "      ";

pub fn print_system_summary(session: &Session<ReferenceSystem>) {
    let system = session.system();
    let mut rows = vec![
        ("MM Atoms", system.atom_count().to_string()),
        ("Bonds", system.bonds().count().to_string()),
        ("Polarizable", system.polarizable_sites().len().to_string()),
    ];
    if let Some(qm) = session.qm() {
        rows.push(("QM Atoms", qm.qm_atom_count().to_string()));
        let links = if qm.uses_link_atoms() { "yes" } else { "no" };
        rows.push(("Link Atoms", links.to_string()));
    }

    let mut out = io::stderr().lock();
    print_kv_table(&mut out, "System Summary", &rows);
}

pub fn print_results(report: &ValidationReport) {
    let name_w = 10usize;
    let num_w = 10usize;
    let mark_w = 4usize;
    let line = |l: &str, m: &str, r: &str| {
        format!(
            "{INDENT}{l}{}{m}{}{m}{}{m}{}{r}",
            "─".repeat(name_w + 2),
            "─".repeat(num_w + 2),
            "─".repeat(num_w + 2),
            "─".repeat(mark_w + 2),
        )
    };

    let mut out = io::stderr().lock();
    let _ = writeln!(out, "{INDENT}┌─ Gradient Deviations ─┐");
    let _ = writeln!(out, "{}", line("┌", "┬", "┐"));
    let _ = writeln!(
        out,
        "{INDENT}│ {:<name_w$} │ {:>num_w$} │ {:>num_w$} │ {:^mark_w$} │",
        "Check", "Max |Δ|", "Threshold", "OK"
    );
    let _ = writeln!(out, "{}", line("├", "┼", "┤"));
    for result in report.results() {
        let mark = if result.passed() { "✓" } else { "✗" };
        let _ = writeln!(
            out,
            "{INDENT}│ {:<name_w$} │ {:>num_w$.2e} │ {:>num_w$.1e} │ {:^mark_w$} │",
            result.check().name(),
            result.max_deviation(),
            result.threshold(),
            mark
        );
    }
    let _ = writeln!(out, "{}", line("└", "┴", "┘"));
    let _ = writeln!(out);
}

fn print_kv_table(out: &mut impl Write, title: &str, rows: &[(&str, String)]) {
    let key_w = 16usize;
    let val_w = 12usize;

    let _ = writeln!(out, "{INDENT}┌─ {title} ─┐");
    let _ = writeln!(
        out,
        "{INDENT}┌{}┬{}┐",
        "─".repeat(key_w + 2),
        "─".repeat(val_w + 2)
    );
    for (key, val) in rows {
        let _ = writeln!(out, "{INDENT}│ {key:<key_w$} │ {val:>val_w$} │");
    }
    let _ = writeln!(
        out,
        "{INDENT}└{}┴{}┘",
        "─".repeat(key_w + 2),
        "─".repeat(val_w + 2)
    );
    let _ = writeln!(out);
}
