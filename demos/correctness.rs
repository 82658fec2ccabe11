//! Check every index configuration against brute force on a regular grid.

use bbox_bench::{
    adapters::{available_configurations, make_index},
    constants::{DOMAIN_LENGTH, QUERY_SEED},
    dataset::regular_grid_data,
    queries::{generate_random_queries, generate_small_fixed_queries},
    types::Features,
    verify::{brute_force_ground_truth, check_library},
};

pub fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let mut out = std::io::stdout().lock();
    let mut failures = 0;

    for (library, data_type, option) in available_configurations() {
        // Regular grid data of the matching type.
        let data = regular_grid_data(data_type, DOMAIN_LENGTH).unwrap();

        // The two fixed queries followed by random ones.
        let mut queries = generate_small_fixed_queries();
        queries.extend(generate_random_queries(&data.domain, 100, QUERY_SEED).unwrap());

        let features = Features::from_flat(data_type, data.points).unwrap();
        let truth = brute_force_ground_truth(&features, &queries);

        let (name, mut index) = make_index(library, data_type, option).unwrap();
        index.build(&features).unwrap();

        failures += check_library(&name, &index, &queries, &features, &truth, &mut out).unwrap();
    }

    if failures > 0 {
        println!("{} queries gave wrong results", failures);
        std::process::exit(1);
    }
    println!("all libraries give correct results");
}
