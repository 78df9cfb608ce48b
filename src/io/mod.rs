//! File formats read and written by the validation harness.
//!
//! | Format | Direction | Content |
//! |--------|-----------|---------|
//! | System | read | TOML description of a reference system and its QM region |
//! | Field | read | one `Ex Ey Ez` row per atom, atomic units |
//! | Config | read | TOML validation settings |
//! | Report | write | `DELTA NUM - ANA` blocks of signed deviations |
//! | Dump | read/write | `Grad` blocks of analytic gradients in kcal/mol/Å |

use std::fmt;

pub mod error;

pub mod dump {
    pub mod reader;
    pub mod writer;
}
pub mod field {
    pub mod reader;
}
pub mod report {
    pub mod writer;
}
pub mod system {
    pub mod reader;
}

pub use error::Error;

/// Line-oriented text formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Field,
    Dump,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Field => write!(f, "field"),
            Format::Dump => write!(f, "gradient dump"),
        }
    }
}
