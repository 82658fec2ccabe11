//! Correctness checks of an index against a brute force oracle.

use std::io::Write;

use itertools::{EitherOrBoth, Itertools};

use crate::{
    error::Result,
    geometry::BoundingBox,
    index::SpatialIndex,
    types::Features,
};

/// Sorted identities of the features intersecting each query, by linear scan.
pub fn brute_force_ground_truth(features: &Features, queries: &[BoundingBox]) -> Vec<Vec<usize>> {
    queries
        .iter()
        .map(|query| {
            (0..features.len())
                .filter(|&id| features.intersects(id, query))
                .collect()
        })
        .collect()
}

/// How the result of one query compared to the oracle.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Identical identity sets.
    Match,
    /// The sets differ.
    Mismatch {
        /// Whether the index declared itself exact.
        expected_exact: bool,
        /// Sorted identities reported by the index, after filtering if inexact.
        found: Vec<usize>,
        /// Sorted identities from the oracle.
        expected: Vec<usize>,
        /// Found but not expected.
        extra: Vec<usize>,
        /// Expected but not found.
        missing: Vec<usize>,
    },
}

/// Verdict for one query.
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    /// Position of the query in the batch.
    pub query_index: usize,
    /// The query box.
    pub query: BoundingBox,
    /// Outcome of the comparison.
    pub outcome: Outcome,
}

impl Verdict {
    /// True if the index agreed with the oracle.
    pub fn is_match(&self) -> bool {
        matches!(self.outcome, Outcome::Match)
    }

    /// Write a multi line report of a mismatch. Matches write nothing.
    pub fn write_diagnostic<W: Write>(&self, out: &mut W, features: &Features) -> Result<()> {
        let Outcome::Mismatch {
            expected_exact,
            found,
            expected,
            extra,
            missing,
        } = &self.outcome
        else {
            return Ok(());
        };

        writeln!(out, "query {}: {}", self.query_index, self.query)?;
        writeln!(
            out,
            "error. results do not match. the library finds {} results when it should find {}",
            found.len(),
            expected.len()
        )?;
        writeln!(out, "query found:")?;
        for &id in found {
            writeln!(out, "index: {}, {}", id, features.describe(id))?;
        }
        writeln!(out, "correct result:")?;
        for &id in expected {
            writeln!(out, "index: {}, {}", id, features.describe(id))?;
        }
        writeln!(out, "extra: {:?}", extra)?;
        writeln!(out, "missing: {:?}", missing)?;
        if *expected_exact {
            writeln!(out, "the results were expected to be exact")?;
        } else {
            writeln!(out, "the results were NOT expected to be exact")?;
        }
        Ok(())
    }
}

/// Compare every query result of `index` with the precomputed oracle result.
///
/// Inexact results are filtered through the exact predicate before comparing.
pub fn verify_batch<I: SpatialIndex + ?Sized>(
    index: &I,
    queries: &[BoundingBox],
    features: &Features,
    ground_truth: &[Vec<usize>],
) -> Vec<Verdict> {
    assert_eq!(queries.len(), ground_truth.len());

    queries
        .iter()
        .zip(ground_truth)
        .enumerate()
        .map(|(query_index, (query, expected))| {
            let mut found = index.query_intersections(query);
            if !index.is_exact() {
                found.retain(|&id| features.intersects(id, query));
            }
            found.sort_unstable();

            let outcome = if found == *expected {
                Outcome::Match
            } else {
                let mut extra = Vec::new();
                let mut missing = Vec::new();
                for entry in found.iter().merge_join_by(expected.iter(), |a, b| a.cmp(b)) {
                    match entry {
                        EitherOrBoth::Left(&id) => extra.push(id),
                        EitherOrBoth::Right(&id) => missing.push(id),
                        EitherOrBoth::Both(_, _) => {}
                    }
                }
                Outcome::Mismatch {
                    expected_exact: index.is_exact(),
                    found,
                    expected: expected.clone(),
                    extra,
                    missing,
                }
            };

            Verdict {
                query_index,
                query: *query,
                outcome,
            }
        })
        .collect()
}

/// Verify `index` and write a diagnostic for every mismatch.
///
/// Returns the number of mismatching queries. Mismatches do not stop the check.
pub fn check_library<I: SpatialIndex + ?Sized, W: Write>(
    name: &str,
    index: &I,
    queries: &[BoundingBox],
    features: &Features,
    ground_truth: &[Vec<usize>],
    out: &mut W,
) -> Result<usize> {
    writeln!(out, "testing {}", name)?;

    let mut failures = 0;
    for verdict in verify_batch(index, queries, features, ground_truth) {
        if verdict.is_match() {
            tracing::debug!(name, query = verdict.query_index, "correct results");
            continue;
        }
        failures += 1;
        tracing::error!(name, query = verdict.query_index, "results do not match");
        verdict.write_diagnostic(out, features)?;
    }

    Ok(failures)
}
