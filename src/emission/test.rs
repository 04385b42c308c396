use super::*;
use std::convert::Infallible;

struct Describe;

impl EmissionFactory for Describe {
    type Emission = String;
    type Error = Infallible;

    fn silent(&self) -> Result<String, Infallible> {
        Ok("S".to_string())
    }

    fn uniform(&self) -> Result<String, Infallible> {
        Ok("U".to_string())
    }

    fn discrete(&self, ess: f64) -> Result<String, Infallible> {
        Ok(format!("D{ess}"))
    }

    fn phylo_discrete(&self, ess: f64, tree: PhyloTree) -> Result<String, Infallible> {
        Ok(format!("P{ess}{tree:?}"))
    }

    fn reference_discrete(
        &self, ess: f64, reference: usize, condition_init: Option<&[Vec<f64>]>,
    ) -> Result<String, Infallible> {
        Ok(format!("R{ess}@{reference}:{}", condition_init.map_or(0, <[Vec<f64>]>::len)))
    }
}

#[test]
fn dispatches_each_kind() {
    let cases = [
        (EmissionSpec::new(EmissionKind::Silent, 0.0), "S"),
        (EmissionSpec::new(EmissionKind::Uniform, 3.0), "U"),
        (EmissionSpec::new(EmissionKind::Discrete, 2.5), "D2.5"),
        (
            EmissionSpec::new(
                EmissionKind::PhyloDiscrete {
                    tree: PhyloTree::Motif,
                },
                1.0,
            ),
            "P1Motif",
        ),
        (
            EmissionSpec {
                kind:           EmissionKind::ReferenceDiscrete { reference: 4 },
                ess:            2.0,
                condition_init: Some(vec![vec![1.0, 1.0]; 3]),
            },
            "R2@4:3",
        ),
    ];

    for (spec, expected) in cases {
        assert_eq!(spec.instantiate(&Describe), Ok(expected.to_string()));
    }
}

#[test]
fn silence() {
    assert!(EmissionKind::Silent.is_silent());
    assert!(!EmissionKind::ReferenceDiscrete { reference: 0 }.is_silent());
    assert_eq!(EmissionKind::ReferenceDiscrete { reference: 7 }.to_string(), "reference-discrete (7)");
}
