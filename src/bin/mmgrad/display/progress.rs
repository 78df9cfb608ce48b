use std::io::{self, Write};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Spinner with one line per completed stage, drawn on stderr.
pub struct StageSpinner {
    bar: Option<ProgressBar>,
    start: Instant,
    stage: u8,
    stages: u8,
    stage_start: Instant,
}

impl StageSpinner {
    pub fn new(stages: u8) -> Self {
        let now = Instant::now();
        Self {
            bar: None,
            start: now,
            stage: 0,
            stages,
            stage_start: now,
        }
    }

    pub fn step(&mut self, description: &str) {
        self.clear();
        self.stage += 1;
        self.stage_start = Instant::now();

        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
            bar.set_style(style.tick_chars(TICKS));
        }
        bar.enable_steady_tick(Duration::from_millis(80));
        bar.set_message(format!("[{}/{}] {}...", self.stage, self.stages, description));
        self.bar = Some(bar);
    }

    /// Updates the message of the running stage, e.g. with the check in flight.
    pub fn detail(&self, detail: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("[{}/{}] {}", self.stage, self.stages, detail));
        }
    }

    pub fn complete_step(&mut self, description: &str, substeps: &[String]) {
        self.clear();

        let elapsed = self.stage_start.elapsed();
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "  \x1b[32m✓\x1b[0m {:<44} {:>5.1}s",
            description,
            elapsed.as_secs_f64()
        );
        for substep in substeps {
            let _ = writeln!(stderr, "      \x1b[2m·\x1b[0m {substep}");
        }
    }

    pub fn finish(mut self, passed: bool) {
        self.clear();
        print_footer(self.start.elapsed(), passed);
    }

    fn clear(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

fn print_footer(elapsed: Duration, passed: bool) {
    let mut stderr = io::stderr().lock();
    let (mark, verdict) = if passed {
        ("\x1b[32m✓\x1b[0m", "Gradients consistent")
    } else {
        ("\x1b[31m✗\x1b[0m", "Gradients inconsistent")
    };

    let _ = writeln!(stderr);
    let _ = writeln!(
        stderr,
        "  \x1b[2m╺━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━╸\x1b[0m"
    );
    let _ = writeln!(stderr);
    let _ = writeln!(
        stderr,
        "  {mark} {verdict:<24} {:>27}",
        format!("Total: {:.2}s", elapsed.as_secs_f64())
    );
    let _ = writeln!(stderr);
}

/// Stage reporting for interactive runs; a no-op otherwise.
pub enum Progress {
    Interactive(StageSpinner),
    Silent,
}

impl Progress {
    pub fn new(interactive: bool, stages: u8) -> Self {
        if interactive {
            Self::Interactive(StageSpinner::new(stages))
        } else {
            Self::Silent
        }
    }

    pub fn step(&mut self, description: &str) {
        if let Self::Interactive(s) = self {
            s.step(description);
        }
    }

    pub fn detail(&self, detail: &str) {
        if let Self::Interactive(s) = self {
            s.detail(detail);
        }
    }

    pub fn complete_step(&mut self, description: &str, substeps: &[String]) {
        if let Self::Interactive(s) = self {
            s.complete_step(description, substeps);
        }
    }

    pub fn finish(self, passed: bool) {
        if let Self::Interactive(s) = self {
            s.finish(passed);
        }
    }
}
