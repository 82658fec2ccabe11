//! Tabular result output.
//!
//! Every timing becomes one comma separated row. In distributed mode every rank
//! hands its row to rank 0, which writes one row per rank in rank order. A rank
//! that skipped the configuration still joins the gathers, without a row.

use std::io::Write;

use crate::{
    collective::Collective,
    error::{Error, Result},
    types::TestingConfig,
};

/// Column names of the result table.
pub const HEADER: &str = "category, library option name, time elapsed (ns), avg perc data pts intersected, library, library option, num data pts written, num queries, x min, x max, y min, y max, z min, z max";

/// What a row measures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Category {
    /// Index construction.
    Build,
    /// One query batch, labelled with its nominal coverage in percent.
    Query {
        /// Nominal coverage of the batch.
        nominal_percent: f64,
    },
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Build => write!(f, "build time"),
            Category::Query { nominal_percent } => write!(f, "query time {:.6}", nominal_percent),
        }
    }
}

/// One row of the result table.
#[derive(Clone, Debug, PartialEq)]
pub struct RunStatistic {
    /// What was measured.
    pub category: Category,
    /// Library and option label.
    pub label: String,
    /// Elapsed wall clock time.
    pub elapsed_ns: u64,
    /// Average percent of data intersected. Zero for build rows.
    pub avg_percent: f64,
    /// The configuration the row belongs to.
    pub config: TestingConfig,
}

impl std::fmt::Display for RunStatistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}{}",
            self.category, self.label, self.elapsed_ns, self.avg_percent, self.config
        )
    }
}

/// Writes result rows, gathering them on rank 0 in distributed mode.
pub struct Reporter<'c, W: Write, C: Collective> {
    out: W,
    comm: &'c C,
    distributed: bool,
}

impl<'c, W: Write, C: Collective> Reporter<'c, W, C> {
    /// Create a reporter. Without `distributed` every rank writes its own rows.
    pub fn new(out: W, comm: &'c C, distributed: bool) -> Self {
        Self {
            out,
            comm,
            distributed,
        }
    }

    /// True if this rank writes output.
    pub fn writes_output(&self) -> bool {
        !self.distributed || self.comm.is_root()
    }

    /// Write the header line.
    pub fn print_header(&mut self) -> Result<()> {
        if self.writes_output() {
            writeln!(self.out, "{}", HEADER)?;
        }
        Ok(())
    }

    /// Report one timing. Returns the number of rows this rank wrote.
    ///
    /// In distributed mode this is a collective call. Rank 0 writes one row per
    /// reporting rank, the other ranks write nothing.
    pub fn report_timing(
        &mut self,
        category: Category,
        label: &str,
        elapsed_ns: u64,
        coverage_percent: f64,
        config: &TestingConfig,
    ) -> Result<usize> {
        self.report_row(category, label, elapsed_ns, coverage_percent, Some(config))
    }

    /// Take part in a report without a row of this rank.
    ///
    /// In distributed mode this matches a [Reporter::report_timing] call on the
    /// other ranks and rank 0 leaves this rank out. Otherwise nothing happens.
    pub fn report_skipped(&mut self, category: Category, label: &str) -> Result<usize> {
        self.report_row(category, label, 0, 0.0, None)
    }

    fn write_row(
        &mut self,
        category: Category,
        label: &str,
        elapsed_ns: u64,
        avg_percent: f64,
        config: TestingConfig,
    ) -> Result<()> {
        let row = RunStatistic {
            category,
            label: label.to_string(),
            elapsed_ns,
            avg_percent,
            config,
        };
        writeln!(self.out, "{}", row)?;
        Ok(())
    }

    fn report_row(
        &mut self,
        category: Category,
        label: &str,
        elapsed_ns: u64,
        coverage_percent: f64,
        config: Option<&TestingConfig>,
    ) -> Result<usize> {
        if !self.distributed {
            let Some(config) = config else {
                return Ok(0);
            };
            self.write_row(category, label, elapsed_ns, coverage_percent, config.clone())?;
            self.out.flush()?;
            return Ok(1);
        }

        let times = self.comm.gather_scalar(elapsed_ns)?;
        let coverages = self.comm.gather_scalar(coverage_percent.to_bits())?;

        // Root keeps its own config in memory and sends nothing. Other ranks
        // send `null` if they have no row.
        let payload = if self.comm.is_root() {
            Vec::new()
        } else {
            serde_json::to_vec(&config)?
        };
        let payloads = self.comm.gather_variable(&payload)?;

        let (times, coverages, payloads) = match (times, coverages, payloads) {
            (Some(times), Some(coverages), Some(payloads)) => (times, coverages, payloads),
            (None, None, None) => return Ok(0),
            _ => {
                return Err(Error::Transport(
                    "gathers disagree on the root rank".to_string(),
                ))
            }
        };

        let own_rank = self.comm.rank();
        let configs = payloads
            .iter()
            .enumerate()
            .map(|(rank, bytes)| {
                if rank == own_rank {
                    Ok(config.cloned())
                } else {
                    serde_json::from_slice::<Option<TestingConfig>>(bytes).map_err(Error::from)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        if times.len() != configs.len() || coverages.len() != configs.len() {
            return Err(Error::GatherMismatch {
                scalars: times.len().min(coverages.len()),
                configs: configs.len(),
            });
        }

        let mut rows = 0;
        for ((elapsed_ns, coverage_bits), config) in times.into_iter().zip(coverages).zip(configs) {
            let Some(config) = config else {
                continue;
            };
            self.write_row(category, label, elapsed_ns, f64::from_bits(coverage_bits), config)?;
            rows += 1;
        }
        self.out.flush()?;

        Ok(rows)
    }

    /// Block until every rank arrived. A no-op outside distributed mode.
    pub fn barrier(&self) -> Result<()> {
        if self.distributed {
            self.comm.barrier()?;
        }
        Ok(())
    }

    /// Return the output stream.
    pub fn into_inner(self) -> W {
        self.out
    }
}
