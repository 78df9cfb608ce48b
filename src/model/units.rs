//! Unit conversions between atomic units and the kcal/mol/Å convention
//! used in gradient dumps.

/// Hartree to kcal/mol.
pub const AU2KCALMOL: f64 = 627.5096080306;

/// Ångström to bohr.
pub const ANG2AU: f64 = 1.8897261245650;

/// Hartree/bohr to kcal/mol/Å.
pub const GRAD_AU2KCALMOL_ANG: f64 = AU2KCALMOL * ANG2AU;

/// Default distance between a QM boundary atom and its link atom, in Å.
pub const DEFAULT_LINK_DISTANCE_ANG: f64 = 1.1;
