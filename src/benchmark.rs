//! Benchmark driver for one configuration.

use std::{io::Write, time::Instant};

use tracing::{info, warn};

use crate::{
    adapters::make_index,
    collective::Collective,
    constants::QUERY_SEED,
    dataset::MeshData,
    error::{Error, Result},
    evaluate::{evaluate_batch, NodeCounting},
    queries::{generate_stratified_queries, STANDARD_TIERS},
    report::{Category, Reporter},
    types::{DataType, Features, Library, TestingConfig},
};

/// Options of one benchmark invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Gather results on rank 0.
    pub distributed: bool,
    /// Skip the queries after the build and write placeholder rows instead.
    ///
    /// Gives memory profilers time to see memory usage drop after the build.
    pub profiling: bool,
    /// Count mesh nodes instead of elements for box data.
    pub node_counting: bool,
    /// Seed of the query generators.
    pub seed: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            distributed: false,
            profiling: false,
            node_counting: false,
            seed: QUERY_SEED,
        }
    }
}

fn nanos(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

/// Skip warnings, pass everything else on.
fn skip_on_warning<T>(result: Result<T>, config: &TestingConfig) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_warning() => {
            warn!(
                library = %config.library,
                option = config.library_option,
                data_type = %config.data_type,
                "{e}, skipping configuration"
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Take part in the reports of a configuration this rank skips.
///
/// The other ranks report a build row, then one row per tier or, when
/// profiling, one placeholder row per query. A skipping rank makes the same
/// collective calls without rows so rank 0 stays in step with everyone.
/// Outside distributed mode nothing is reported.
pub fn skip_configuration<W: Write, C: Collective>(
    library: Library,
    data_type: DataType,
    library_option: u16,
    num_queries: usize,
    options: &RunOptions,
    reporter: &mut Reporter<'_, W, C>,
) -> Result<usize> {
    if !options.distributed {
        return Ok(0);
    }

    // Rank 0 labels all rows, so it needs the label even when skipping.
    let label = make_index(library, data_type, library_option)
        .map(|(label, _)| label)
        .unwrap_or_default();

    let mut rows = reporter.report_skipped(Category::Build, &label)?;
    if options.profiling {
        for _ in 0..num_queries {
            rows += reporter.report_skipped(
                Category::Query {
                    nominal_percent: 0.0,
                },
                "dummy",
            )?;
        }
    } else {
        for tier in &STANDARD_TIERS {
            rows += reporter.report_skipped(
                Category::Query {
                    nominal_percent: tier.nominal_percent,
                },
                &label,
            )?;
        }
    }
    Ok(rows)
}

/// Build the index of `config` over `data`, then time every query tier in order.
///
/// Returns the number of rows this rank wrote. Degenerate data and unknown
/// library options are logged and produce no rows of this rank, see
/// [skip_configuration].
pub fn run_configuration<W: Write, C: Collective>(
    data: &MeshData,
    config: &TestingConfig,
    options: &RunOptions,
    reporter: &mut Reporter<'_, W, C>,
) -> Result<usize> {
    let Some((label, mut index)) = skip_on_warning(
        make_index(config.library, config.data_type, config.library_option),
        config,
    )?
    else {
        return skip_configuration(
            config.library,
            config.data_type,
            config.library_option,
            config.num_queries,
            options,
            reporter,
        );
    };

    let Some(features) = skip_on_warning(
        Features::from_flat(config.data_type, data.points.clone()),
        config,
    )?
    else {
        return skip_configuration(
            config.library,
            config.data_type,
            config.library_option,
            config.num_queries,
            options,
            reporter,
        );
    };

    let mut rows = 0;

    let start = Instant::now();
    index.build(&features)?;
    rows += reporter.report_timing(Category::Build, &label, nanos(start), 0.0, config)?;

    if options.profiling {
        for _ in 0..config.num_queries {
            let start = Instant::now();
            rows += reporter.report_timing(
                Category::Query {
                    nominal_percent: 0.0,
                },
                "dummy",
                nanos(start),
                0.0,
                config,
            )?;
        }
        return Ok(rows);
    }

    let counting = match (&data.node_ids, options.node_counting) {
        (Some(node_ids), true) => NodeCounting::Nodes(node_ids),
        (None, true) if config.data_type == DataType::Boxes => {
            return Err(Error::Mesh(
                "node counting needs the node ids of every element".to_string(),
            ))
        }
        _ => NodeCounting::Elements,
    };

    let batches =
        generate_stratified_queries(&data.domain, config.num_queries, &STANDARD_TIERS, options.seed)?;

    for batch in &batches {
        let stats = evaluate_batch(&index, batch, &features, config, counting);
        info!(
            label = %label,
            tier = batch.tier,
            queries = batch.queries.len(),
            coverage = stats.avg_percent_covered,
            "batch done"
        );
        rows += reporter.report_timing(
            Category::Query {
                nominal_percent: batch.nominal_percent,
            },
            &label,
            u64::try_from(stats.elapsed.as_nanos()).unwrap_or(u64::MAX),
            stats.avg_percent_covered,
            config,
        )?;
    }

    Ok(rows)
}

#[cfg(test)]
mod test {
    use super::{run_configuration, RunOptions};
    use crate::{
        collective::{Collective, LocalComm, ThreadComm},
        dataset::{regular_grid_data, MeshData},
        error::Error,
        geometry::Point,
        report::Reporter,
        types::{DataType, Library, TestingConfig},
    };

    fn five_points() -> MeshData {
        let points = vec![
            Point::new([0.0, 0.0, 0.0]),
            Point::new([1.0, 2.0, 3.0]),
            Point::new([4.0, 4.0, 4.0]),
            Point::new([2.0, 1.0, 0.0]),
            Point::new([3.0, 3.0, 1.0]),
        ];
        MeshData::from_points(points, 5).unwrap()
    }

    #[test]
    fn test_odd_box_data_is_skipped() {
        let data = five_points();
        let comm = LocalComm;
        let mut reporter = Reporter::new(Vec::new(), &comm, false);
        let options = RunOptions::default();

        let boxes = TestingConfig::new(&data.domain, 5, 10, Library::BruteForce, DataType::Boxes, 0);
        assert_eq!(run_configuration(&data, &boxes, &options, &mut reporter).unwrap(), 0);

        // The next configuration still runs: one build row and four tiers.
        let points = TestingConfig::new(&data.domain, 5, 10, Library::BruteForce, DataType::Points, 0);
        assert_eq!(run_configuration(&data, &points, &options, &mut reporter).unwrap(), 5);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("build time, Brute Force, "));
        assert!(lines[1].starts_with("query time 0.001000, Brute Force, "));
        assert!(lines[4].starts_with("query time 10.000000, Brute Force, "));
    }

    #[test]
    fn test_skipping_rank_keeps_distributed_run_going() {
        let options = RunOptions {
            distributed: true,
            ..RunOptions::default()
        };

        let outputs = ThreadComm::run(2, |comm| {
            // Six points make three boxes, five points make no boxes.
            let data = if comm.rank() == 0 {
                let points = vec![
                    Point::new([0.0, 0.0, 0.0]),
                    Point::new([1.0, 2.0, 3.0]),
                    Point::new([2.0, 1.0, 0.0]),
                    Point::new([3.0, 3.0, 1.0]),
                    Point::new([3.0, 3.0, 3.0]),
                    Point::new([4.0, 4.0, 4.0]),
                ];
                MeshData::from_points(points, 3).unwrap()
            } else {
                five_points()
            };
            let mut reporter = Reporter::new(Vec::new(), &comm, options.distributed);

            let boxes = TestingConfig::new(&data.domain, 3, 10, Library::BruteForce, DataType::Boxes, 0);
            let box_rows = run_configuration(&data, &boxes, &options, &mut reporter).unwrap();

            // Both ranks run the next configuration.
            let points = TestingConfig::new(&data.domain, 5, 10, Library::BruteForce, DataType::Points, 0);
            let point_rows = run_configuration(&data, &points, &options, &mut reporter).unwrap();

            reporter.barrier().unwrap();
            (box_rows, point_rows, String::from_utf8(reporter.into_inner()).unwrap())
        });

        // Rank 0 writes only its own box rows, then the point rows of both ranks.
        let (box_rows, point_rows, text) = &outputs[0];
        assert_eq!(*box_rows, 5);
        assert_eq!(*point_rows, 10);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 15);
        assert!(lines[0].starts_with("build time, Brute Force Bboxes, "));
        assert!(lines[5].starts_with("build time, Brute Force, "));
        assert!(lines[6].starts_with("build time, Brute Force, "));

        assert_eq!((outputs[1].0, outputs[1].1), (0, 0));
        assert!(outputs[1].2.is_empty());
    }

    #[test]
    fn test_unknown_option_is_skipped() {
        let data = five_points();
        let comm = LocalComm;
        let mut reporter = Reporter::new(Vec::new(), &comm, false);

        let config = TestingConfig::new(&data.domain, 5, 10, Library::BruteForce, DataType::Points, 9);
        let rows = run_configuration(&data, &config, &RunOptions::default(), &mut reporter).unwrap();
        assert_eq!(rows, 0);

        let config = TestingConfig::new(&data.domain, 5, 10, Library::Flann, DataType::Points, 0);
        let result = run_configuration(&data, &config, &RunOptions::default(), &mut reporter);
        assert!(matches!(result, Err(Error::LibraryUnavailable(Library::Flann))));
    }

    #[test]
    fn test_profiling_rows() {
        let data = five_points();
        let comm = LocalComm;
        let mut reporter = Reporter::new(Vec::new(), &comm, false);
        let options = RunOptions {
            profiling: true,
            ..RunOptions::default()
        };

        let config = TestingConfig::new(&data.domain, 5, 3, Library::BruteForce, DataType::Points, 2);
        assert_eq!(run_configuration(&data, &config, &options, &mut reporter).unwrap(), 4);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let dummies = text
            .lines()
            .filter(|line| line.starts_with("query time 0.000000, dummy, "))
            .count();
        assert_eq!(dummies, 3);
    }

    #[test]
    fn test_grid_coverage() {
        let data = regular_grid_data(DataType::Points, 5).unwrap();
        let comm = LocalComm;
        let mut reporter = Reporter::new(Vec::new(), &comm, false);

        for option in 0..3 {
            let config = TestingConfig::new(
                &data.domain,
                data.num_data_pts,
                20,
                Library::BruteForce,
                DataType::Points,
                option,
            );
            let rows = run_configuration(&data, &config, &RunOptions::default(), &mut reporter).unwrap();
            assert_eq!(rows, 5);
        }

        // Exact and inexact options agree on coverage.
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let coverage: Vec<&str> = text
            .lines()
            .map(|line| line.split(", ").nth(3).unwrap())
            .collect();
        assert_eq!(coverage[0..5], coverage[5..10]);
        assert_eq!(coverage[0..5], coverage[10..15]);
    }

    #[test]
    fn test_node_counting_needs_node_ids() {
        let data = regular_grid_data(DataType::Boxes, 5).unwrap();
        let comm = LocalComm;
        let mut reporter = Reporter::new(Vec::new(), &comm, false);
        let options = RunOptions {
            node_counting: true,
            ..RunOptions::default()
        };

        let config = TestingConfig::new(&data.domain, 8, 10, Library::BruteForce, DataType::Boxes, 0);
        assert!(run_configuration(&data, &config, &options, &mut reporter).is_err());
    }
}
