use std::env;
use ctxhmm::prelude::*;

// Builds a profile HMM and prints its states and transition hyperparameters.
// Usage: demo_profile [ARCHITECTURE] [LAYERS] [JOINING STATES]

fn main() {
    let args: Vec<String> = env::args().collect();

    let architecture = args
        .get(1)
        .map_or(Ok(ProfileArchitecture::Plan7), |s| s.parse())
        .unwrap_or_fail();
    let num_layers = args.get(2).map_or(Ok(4), |s| s.parse()).unwrap_or_die("Invalid number of layers!");
    let joining_states = args
        .get(3)
        .map_or(Ok(0), |s| s.parse())
        .unwrap_or_die("Invalid number of joining states!");

    let config = ProfileConfig {
        architecture,
        num_layers,
        joining_states,
        ..ProfileConfig::default()
    };

    let blueprint = config.build().and_then(|t| t.assemble()).unwrap_or_fail();
    print!("{blueprint}");
}
