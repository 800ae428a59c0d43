//! Dialect selection (spec.md §4.D): pick the best of the two per-dialect
//! ranking attempts.

use cre_parser::Dialect;

use crate::rank::RankOutcome;

/// The result of ranking a snippet under one dialect, or `None` if the
/// snippet does not parse under it at all.
pub type DialectAttempt = Option<RankOutcome>;

/// Picked dialect plus the ranking outcome that won.
#[derive(Debug, Clone)]
pub struct DialectSelection {
    /// The chosen dialect.
    pub dialect: Dialect,
    /// That dialect's ranking outcome.
    pub outcome: RankOutcome,
}

/// Compare the D2 and D3 ranking attempts and pick a dialect. Primary key:
/// higher `module_score`; tiebreak: higher `attr_score`; final tiebreak:
/// prefer D3. `None` for both means the snippet parsed under neither
/// dialect, which the caller must treat as `ParseFailed`.
pub fn select_dialect(d2: DialectAttempt, d3: DialectAttempt) -> Option<DialectSelection> {
    match (d2, d3) {
        (None, None) => None,
        (Some(outcome), None) => Some(DialectSelection {
            dialect: Dialect::D2,
            outcome,
        }),
        (None, Some(outcome)) => Some(DialectSelection {
            dialect: Dialect::D3,
            outcome,
        }),
        (Some(d2), Some(d3)) => {
            let pick_d3 = match d3.module_score.partial_cmp(&d2.module_score) {
                Some(std::cmp::Ordering::Greater) => true,
                Some(std::cmp::Ordering::Less) => false,
                _ => match d3.attr_score.partial_cmp(&d2.attr_score) {
                    Some(std::cmp::Ordering::Less) => false,
                    _ => true,
                },
            };
            if pick_d3 {
                Some(DialectSelection {
                    dialect: Dialect::D3,
                    outcome: d3,
                })
            } else {
                Some(DialectSelection {
                    dialect: Dialect::D2,
                    outcome: d2,
                })
            }
        }
    }
}
