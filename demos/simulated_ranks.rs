//! Gather the benchmark results of several ranks simulated with threads.
//!
//! Every rank benchmarks its own random point cloud. Rank 0 writes the rows of
//! all ranks, ordered by rank.

use bbox_bench::{
    benchmark::{run_configuration, RunOptions},
    collective::{Collective, ThreadComm},
    constants::QUERY_SEED,
    dataset::random_mesh_data,
    geometry::BoundingBox,
    report::Reporter,
    types::{DataType, Library, TestingConfig},
};

pub fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let nranks = 4;
    let options = RunOptions {
        distributed: true,
        ..RunOptions::default()
    };

    let outputs = ThreadComm::run(nranks, |comm| {
        let rank = comm.rank();

        // Each rank owns a slab of the unit cube along x.
        let lower = rank as f64 / nranks as f64;
        let upper = (rank + 1) as f64 / nranks as f64;
        let domain = BoundingBox::new([lower, 0.0, 0.0], [upper, 1.0, 1.0]).unwrap();
        let data = random_mesh_data(DataType::Points, &domain, 10000, QUERY_SEED + rank as u64)
            .unwrap();

        let config = TestingConfig::new(
            &data.domain,
            data.num_data_pts,
            100,
            Library::BruteForce,
            DataType::Points,
            0,
        );

        let mut reporter = Reporter::new(Vec::new(), &comm, options.distributed);
        reporter.print_header().unwrap();
        let rows = run_configuration(&data, &config, &options, &mut reporter).unwrap();
        reporter.barrier().unwrap();

        (rows, reporter.into_inner())
    });

    // Only rank 0 has output.
    for (rank, (rows, output)) in outputs.into_iter().enumerate() {
        if rank == 0 {
            assert_eq!(rows, 5 * nranks);
            print!("{}", String::from_utf8(output).unwrap());
        } else {
            assert!(output.is_empty());
        }
    }
}
