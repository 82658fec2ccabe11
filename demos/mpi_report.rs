//! Test the consolidation of benchmark rows on rank 0 across MPI ranks.

use bbox_bench::{
    collective::{Collective, MpiCollective},
    geometry::BoundingBox,
    report::{Category, Reporter},
    types::{DataType, Library, TestingConfig},
};

pub fn main() {
    // Initialise MPI
    let universe = mpi::initialize().unwrap();

    // Get the world communicator
    let world = universe.world();
    let comm = MpiCollective::new(&world);

    let rank = comm.rank();

    // Every rank reports a different time and configuration.
    let domain = BoundingBox::new([rank as f64, 0.0, 0.0], [rank as f64 + 1.0, 1.0, 1.0]).unwrap();
    let config = TestingConfig::new(
        &domain,
        100 * (rank + 1),
        10,
        Library::BruteForce,
        DataType::Points,
        0,
    );

    let mut reporter = Reporter::new(Vec::new(), &comm, true);
    reporter.print_header().unwrap();
    let rows = reporter
        .report_timing(
            Category::Query {
                nominal_percent: 1.0,
            },
            "Brute Force",
            1000 + rank as u64,
            rank as f64,
            &config,
        )
        .unwrap();
    reporter.barrier().unwrap();

    let output = String::from_utf8(reporter.into_inner()).unwrap();

    if comm.is_root() {
        // One header line and one row per rank, in rank order.
        assert_eq!(rows, comm.size());
        let lines: Vec<&str> = output.lines().skip(1).collect();
        assert_eq!(lines.len(), comm.size());
        for (index, line) in lines.iter().enumerate() {
            let fields: Vec<&str> = line.split(", ").collect();
            assert_eq!(fields[2], (1000 + index).to_string());
            assert_eq!(fields[6], (100 * (index + 1)).to_string());
        }
        print!("{}", output);
    } else {
        assert_eq!(rows, 0);
        assert!(output.is_empty());
    }
}
