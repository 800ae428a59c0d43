//! The top-level orchestrator (spec.md §6.3, §4) — component I. Wires the
//! parser adapter, the candidate ranker, the dialect selector, the
//! requirement graph builder, the heuristic resolver, the SAT fallback, and
//! the install-plan extractor into one call: [`infer`].

#![deny(missing_docs)]

use std::time::{Duration, Instant};

use cre_graph::RequireGraph;
use cre_kg::KnowledgeGraph;
use cre_parser::{Dialect, DialectParser};
use cre_plan::InstallPair;
use cre_ranker::{select_dialect, DialectAttempt};

/// Failure from one of the pipeline's fallible stages. Anything reaching
/// here is an infrastructure problem (a bad KG query, an unparsable
/// requirement string) — a snippet this engine simply can't resolve is not
/// an error, it's a [`Status::ParseFailed`] or [`Status::Degraded`] output.
#[derive(Debug, thiserror::Error)]
pub enum InferError {
    /// A knowledge-graph query failed outright.
    #[error(transparent)]
    Kg(#[from] cre_kg::KgError),
    /// Building the requirement graph failed (also wraps KG errors and bad
    /// `REQUIRES` requirement strings).
    #[error(transparent)]
    Graph(#[from] cre_graph::GraphError),
    /// The CDCL solver reported an internal error.
    #[error(transparent)]
    Sat(#[from] cre_sat::SatError),
}

/// How the final plan was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The heuristic backtracking resolver found a solution (spec.md §4.F).
    Heuristic,
    /// The heuristic resolver failed; the SAT fallback found one (§4.G).
    Sat,
    /// Both failed; this is a degraded best-effort plan with no
    /// compatibility guarantee (§4.H).
    Degraded,
    /// Neither dialect could parse the snippet at all.
    ParseFailed,
}

impl serde::Serialize for Status {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Status::Heuristic => serializer.serialize_i32(1),
            Status::Sat => serializer.serialize_i32(0),
            Status::Degraded => serializer.serialize_i32(-1),
            Status::ParseFailed => serializer.serialize_str("error"),
        }
    }
}

/// Wall-clock spent in each stage (spec.md §6.3 `timings`).
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct Timings {
    /// Time spent in the parser adapter, both dialects.
    pub parse: Duration,
    /// Time spent ranking candidates against the knowledge graph.
    pub r#match: Duration,
    /// Time spent resolving (heuristic, and SAT/degraded if it fell back).
    pub solving: Duration,
}

/// The engine's output record (spec.md §6.3).
#[derive(Debug, Clone, serde::Serialize)]
pub struct InferOutput {
    /// The dialect picked, or `None` if neither parsed.
    pub dialect: Option<Dialect>,
    /// A representative interpreter version string for the chosen dialect.
    pub interpreter_version: Option<&'static str>,
    /// `None` only when [`Status::ParseFailed`]; otherwise always present,
    /// possibly empty.
    pub install_pairs: Option<Vec<InstallPair>>,
    /// Per-stage timings.
    pub timings: Timings,
    /// How the plan was produced.
    pub status: Status,
}

fn interpreter_version(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::D2 => "2.7.18",
        Dialect::D3 => "3.8.11",
    }
}

/// Run the full pipeline over one snippet's source text.
pub fn infer(
    kg: &dyn KnowledgeGraph,
    source: &str,
    d2: &dyn DialectParser,
    d3: &dyn DialectParser,
) -> Result<InferOutput, InferError> {
    let parse_start = Instant::now();
    let parsed_d2 = d2.parse(source);
    let parsed_d3 = d3.parse(source);
    let parse_time = parse_start.elapsed();

    if parsed_d2.is_none() && parsed_d3.is_none() {
        tracing::warn!("neither dialect could parse the snippet");
        return Ok(InferOutput {
            dialect: None,
            interpreter_version: None,
            install_pairs: None,
            timings: Timings {
                parse: parse_time,
                ..Timings::default()
            },
            status: Status::ParseFailed,
        });
    }

    let match_start = Instant::now();
    let attempt_d2: DialectAttempt = parsed_d2.map(|p| cre_ranker::rank(kg, &p)).transpose()?;
    let attempt_d3: DialectAttempt = parsed_d3.map(|p| cre_ranker::rank(kg, &p)).transpose()?;
    let match_time = match_start.elapsed();

    let selection = select_dialect(attempt_d2, attempt_d3).expect("at least one dialect parsed");
    tracing::info!(dialect = %selection.dialect, "dialect selected");

    let timings_so_far = Timings {
        parse: parse_time,
        r#match: match_time,
        solving: Duration::default(),
    };

    if selection.outcome.candidates.is_empty() {
        return Ok(InferOutput {
            dialect: Some(selection.dialect),
            interpreter_version: Some(interpreter_version(selection.dialect)),
            install_pairs: Some(Vec::new()),
            timings: timings_so_far,
            status: Status::Heuristic,
        });
    }

    let solve_start = Instant::now();
    let graph: RequireGraph = cre_graph::build(kg, &selection.outcome.candidates)?;

    let (solved, status) = if let Some(solved) = cre_resolver::resolve(&graph) {
        (solved, Status::Heuristic)
    } else if let Some(solved) = cre_sat::solve(&graph)? {
        tracing::info!("heuristic resolver failed, SAT fallback found a solution");
        (solved, Status::Sat)
    } else {
        tracing::warn!("heuristic and SAT both failed, emitting a degraded best-effort plan");
        (cre_plan::best_effort(&graph), Status::Degraded)
    };
    let solving_time = solve_start.elapsed();

    let plan = cre_plan::extract(&graph, &solved);
    if plan.cyclic {
        tracing::warn!("install plan has a requirement cycle; flushed remaining explicit packages in name order");
    }

    Ok(InferOutput {
        dialect: Some(selection.dialect),
        interpreter_version: Some(interpreter_version(selection.dialect)),
        install_pairs: Some(plan.pairs),
        timings: Timings {
            parse: parse_time,
            r#match: match_time,
            solving: solving_time,
        },
        status,
    })
}
