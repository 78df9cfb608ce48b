//! Shared test systems.

use super::{QmRegion, ReferenceSystem, SystemSpec};

pub(crate) const MM: &str = r#"
[[atoms]]
position = [0.0, 0.0, 0.0]
charge = 0.15
polarizability = 0.5
vdw_radius = 1.9
vdw_epsilon = 1e-3

[[atoms]]
position = [2.6, 0.3, -0.2]
charge = -0.2
polarizability = 0.6
vdw_radius = 2.0
vdw_epsilon = 2e-3

[[atoms]]
position = [3.4, 2.7, 0.4]
charge = 0.1
vdw_radius = 1.8
vdw_epsilon = 1.5e-3

[[atoms]]
position = [5.9, 3.1, 1.2]
charge = 0.12
polarizability = 0.4
vdw_radius = 1.7
vdw_epsilon = 1e-3

[[atoms]]
position = [2.9, -1.6, 2.1]
charge = -0.08
polarizability = 0.5
vdw_radius = 1.6
vdw_epsilon = 5e-4

[[atoms]]
position = [-1.5, 4.8, 3.3]
charge = 0.2
polarizability = 0.7
vdw_radius = 2.1
vdw_epsilon = 2e-3

[[atoms]]
position = [-2.2, 6.9, 2.5]
charge = -0.19
polarizability = 0.3
vdw_radius = 1.5
vdw_epsilon = 1e-3

[[bonds]]
atoms = [0, 1]
k = 0.3
r0 = 2.5

[[bonds]]
atoms = [1, 2]
k = 0.35
r0 = 2.55

[[bonds]]
atoms = [2, 3]
k = 0.28
r0 = 2.7

[[bonds]]
atoms = [1, 4]
k = 0.25
r0 = 2.9

[[bonds]]
atoms = [5, 6]
k = 0.4
r0 = 2.3

[[angles]]
atoms = [0, 1, 2]
k = 0.08
theta0 = 109.5

[[angles]]
atoms = [1, 2, 3]
k = 0.07
theta0 = 120.5

[[angles]]
atoms = [0, 1, 4]
k = 0.06
theta0 = 95.0

[[strbnds]]
atoms = [0, 1, 2]
k1 = 0.02
k2 = 0.03
r1 = 2.5
r2 = 2.55
theta0 = 110.0

[[ureys]]
atoms = [0, 2]
k = 0.02
r0 = 4.2

[[torsions]]
atoms = [0, 1, 2, 3]
terms = [
    { amplitude = 0.004, periodicity = 1, phase = 0.0 },
    { amplitude = 0.0015, periodicity = 2, phase = 180.0 },
    { amplitude = 0.0007, periodicity = 3, phase = 30.0 },
]

[[imptorsions]]
atoms = [0, 2, 1, 4]
terms = [{ amplitude = 0.003, periodicity = 2, phase = 180.0 }]
"#;

/// QM region capped by one link atom (QM atom 3) on the bond to MM atom 3.
pub(crate) const QM: &str = r#"
[qm]

[[qm.atoms]]
position = [8.7, 3.6, 1.6]
charge = -0.1
polarizability = 0.5
vdw_radius = 1.8
vdw_epsilon = 1e-3

[[qm.atoms]]
position = [9.6, 5.9, 2.2]
charge = 0.05
polarizability = 0.4
vdw_radius = 1.5
vdw_epsilon = 8e-4

[[qm.atoms]]
position = [9.9, 2.0, -0.5]
charge = 0.08
vdw_radius = 1.6
vdw_epsilon = 1e-3

[[qm.atoms]]
position = [0.0, 0.0, 0.0]
charge = 0.03
polarizability = 0.3
vdw_radius = 1.2
vdw_epsilon = 5e-4

[[qm.atoms]]
position = [10.1, 8.3, 3.4]
charge = -0.06
vdw_radius = 1.7
vdw_epsilon = 1.2e-3

[[qm.bonds]]
atoms = [0, 1]
k = 0.3
r0 = 2.4

[[qm.bonds]]
atoms = [0, 2]
k = 0.3
r0 = 2.6

[[qm.bonds]]
atoms = [0, 3]
k = 0.35
r0 = 2.08

[[qm.bonds]]
atoms = [1, 4]
k = 0.32
r0 = 2.7

[[qm.angles]]
atoms = [1, 0, 2]
k = 0.07
theta0 = 110.0

[[qm.angles]]
atoms = [1, 0, 3]
k = 0.06
theta0 = 109.5

[[qm.links]]
qm = 0
mm = 3
link = 3
"#;

/// Single QM atom far from the MM atoms, no link atoms.
pub(crate) const QM_WITHOUT_LINKS: &str = r#"
[qm]

[[qm.atoms]]
position = [12.0, 9.0, 4.0]
charge = -0.1
polarizability = 0.5
vdw_radius = 1.8
vdw_epsilon = 1e-3
"#;

pub(crate) fn mm_spec() -> SystemSpec {
    SystemSpec::from_toml_str(MM).unwrap()
}

pub(crate) fn mm_system() -> ReferenceSystem {
    ReferenceSystem::from_spec(&mm_spec()).unwrap()
}

pub(crate) fn qmmm_system() -> (ReferenceSystem, QmRegion) {
    let spec = SystemSpec::from_toml_str(&format!("{MM}\n{QM}")).unwrap();
    let (mm, qm) = super::build(&spec).unwrap();
    (mm, qm.unwrap())
}

pub(crate) fn qmmm_system_without_links() -> (ReferenceSystem, QmRegion) {
    let spec = SystemSpec::from_toml_str(&format!("{MM}\n{QM_WITHOUT_LINKS}")).unwrap();
    let (mm, qm) = super::build(&spec).unwrap();
    (mm, qm.unwrap())
}
