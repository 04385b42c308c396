use ctxhmm::prelude::*;

fn main() {
    let config = SunflowerConfig {
        ess: 10.0,
        motif_lengths: vec![5, 3],
        motif_probs: Some(vec![0.02, 0.05]),
        ..SunflowerConfig::default()
    };

    let topology = config.build().unwrap_or_fail();
    let blueprint = topology.assemble().unwrap_or_fail();

    println!("{} states", blueprint.names.len());
    for (name, spec) in blueprint.names.iter().zip(&blueprint.emissions) {
        println!("{name:>20}\t{:.3}", spec.ess);
    }
}
