//! Command line benchmark of one library configuration.
//!
//! Writes the result table to stdout and logs to stderr.

use std::io;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, warn};

use bbox_bench::{
    benchmark::{run_configuration, skip_configuration, RunOptions},
    collective::{Collective, LocalComm},
    constants::{DOMAIN_LENGTH, QUERY_SEED},
    dataset::{random_mesh_data, MeshData},
    error::Result,
    geometry::BoundingBox,
    mesh::{load_vtk, mesh_path_for_rank},
    report::Reporter,
    types::{DataType, Library, TestingConfig},
};

/// Time bounding box intersection queries on a spatial index
#[derive(Parser, Debug)]
#[command(name = "bbox-bench", version, about)]
struct Cli {
    /// Base path of the mesh folders
    mesh_path: String,

    /// Mesh file name, without the rank suffix
    mesh_name: String,

    /// Library code
    library: u16,

    /// Data type code: 0 points, 1 boxes, 2 triangles
    data_type: u16,

    /// Library option code
    library_option: u16,

    /// Base number of queries per selectivity tier
    num_queries: usize,

    /// 1 to gather the results of all ranks on rank 0
    #[arg(default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    distributed: u8,

    /// Number of ranks the mesh is decomposed into.
    /// Without a rank id, every rank is run in turn.
    num_ranks: Option<usize>,

    /// Rank whose part of the mesh is loaded
    rank: Option<usize>,

    /// 1 to skip the queries and write placeholder rows, for memory profiling
    #[arg(default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    profiling: u8,

    /// Use this many random features instead of the mesh files
    #[arg(long, value_name = "N")]
    synthetic: Option<usize>,

    /// Coverage of box data relative to mesh nodes instead of elements
    #[arg(long)]
    count_nodes: bool,

    /// Seed of the query generators
    #[arg(long, default_value_t = QUERY_SEED)]
    seed: u64,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            distributed: self.distributed == 1,
            profiling: self.profiling == 1,
            node_counting: self.count_nodes,
            seed: self.seed,
        }
    }
}

/// Load the data of `rank` out of `size` ranks.
fn load_data(cli: &Cli, data_type: DataType, rank: usize, size: usize) -> Result<MeshData> {
    if let Some(count) = cli.synthetic {
        let domain = BoundingBox::new([0.0; 3], [DOMAIN_LENGTH as f64; 3])?;
        return random_mesh_data(data_type, &domain, count, cli.seed.wrapping_add(rank as u64));
    }
    let path = mesh_path_for_rank(&cli.mesh_path, &cli.mesh_name, rank, size)?;
    load_vtk(&path, data_type, cli.count_nodes)
}

/// Load the data of one rank and benchmark it.
fn run_rank<C: Collective>(
    cli: &Cli,
    library: Library,
    data_type: DataType,
    (rank, size): (usize, usize),
    reporter: &mut Reporter<'_, io::StdoutLock<'_>, C>,
) -> anyhow::Result<usize> {
    let data = match load_data(cli, data_type, rank, size) {
        Ok(data) => data,
        Err(e) if e.is_warning() => {
            warn!(rank, "{e}, skipping rank");
            return Ok(skip_configuration(
                library,
                data_type,
                cli.library_option,
                cli.num_queries,
                &cli.run_options(),
                reporter,
            )?);
        }
        Err(e) => return Err(e).with_context(|| format!("loading the data of rank {rank}")),
    };

    let config = TestingConfig::new(
        &data.domain,
        data.num_data_pts,
        cli.num_queries,
        library,
        data_type,
        cli.library_option,
    );
    Ok(run_configuration(&data, &config, &cli.run_options(), reporter)?)
}

fn run_local(cli: &Cli, library: Library, data_type: DataType) -> anyhow::Result<()> {
    let (size, ranks) = match (cli.num_ranks, cli.rank) {
        (None, None) => (1, 0..1),
        (Some(0), _) => bail!("the number of ranks must be positive"),
        (Some(size), None) => (size, 0..size),
        (Some(size), Some(rank)) => (size, rank..rank + 1),
        (None, Some(_)) => bail!("a rank id needs the number of ranks"),
    };

    let comm = LocalComm;
    let mut reporter = Reporter::new(io::stdout().lock(), &comm, false);
    reporter.print_header()?;

    for rank in ranks {
        run_rank(cli, library, data_type, (rank, size), &mut reporter)?;
    }
    Ok(())
}

#[cfg(feature = "mpi")]
fn run_distributed(cli: &Cli, library: Library, data_type: DataType) -> anyhow::Result<()> {
    use bbox_bench::collective::MpiCollective;

    let universe = mpi::initialize().context("MPI is already initialised")?;
    let world = universe.world();
    let comm = MpiCollective::new(&world);

    let size = cli.num_ranks.unwrap_or(comm.size());
    let rank = cli.rank.unwrap_or(comm.rank());

    let mut reporter = Reporter::new(io::stdout().lock(), &comm, true);
    reporter.print_header()?;
    run_rank(cli, library, data_type, (rank, size), &mut reporter)?;

    reporter.barrier()?;
    Ok(())
}

#[cfg(not(feature = "mpi"))]
fn run_distributed(_cli: &Cli, _library: Library, _data_type: DataType) -> anyhow::Result<()> {
    bail!("distributed mode needs a build with the `mpi` feature")
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let library = Library::try_from(cli.library)?;
    let data_type = DataType::try_from(cli.data_type)?;

    if cli.run_options().distributed {
        run_distributed(cli, library, data_type)
    } else {
        run_local(cli, library, data_type)
    }
}

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(-1);
        }
        // Help and version.
        Err(e) => e.exit(),
    };

    if let Err(e) = run(&cli) {
        error!("{e:#}");
        std::process::exit(-1);
    }
}
