//! Column–value alignment for positional INSERTs.
//!
//! A positional row was written against the schema as it was at dump time.
//! Instead of zipping values onto today's columns, the aligner runs a
//! weighted sequence alignment (Needleman–Wunsch style) between the live
//! column sequence and the row's values:
//!
//! - **match** column `i` with value `j` when the value is compatible,
//!   scoring higher for type-distinctive columns;
//! - **skip a column**, leaving it to a placeholder, cheaper for optional
//!   columns than for required ones;
//! - **skip a value**, dropping a legacy value that no longer has a home.
//!
//! Trailing values are free to drop: the best score is taken over every
//! `dp[n][j]`, not only `dp[n][m]`.

use super::policy::{is_compatible_value, placeholder_for_column};
use crate::parser::RawToken;
use crate::schema::{ColumnMeta, DataType};

/// Reward for matching an enum, date, datetime or json column
pub const DISTINCTIVE_MATCH_SCORE: i64 = 8;
/// Reward for matching a numeric or boolean column
pub const NUMERIC_MATCH_SCORE: i64 = 5;
/// Reward for matching a string or time column
pub const GENERIC_MATCH_SCORE: i64 = 3;
/// Cost of leaving a nullable, defaulted or auto-increment column unmapped
pub const OPTIONAL_SKIP_PENALTY: i64 = 1;
/// Cost of leaving a required column unmapped
pub const REQUIRED_SKIP_PENALTY: i64 = 6;
/// Cost of dropping a value before the last matched one
pub const SKIP_VALUE_PENALTY: i64 = 7;

/// Knobs that change which columns may receive values.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlignOptions {
    /// Let auto-increment columns take dump values instead of regenerating them
    pub preserve_identity: bool,
}

/// Per live column, the index of the value it takes, or `None` for a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub mapping: Vec<Option<usize>>,
    pub score: i64,
}

impl Alignment {
    /// Number of columns that received a source value.
    pub fn mapped_count(&self) -> usize {
        self.mapping.iter().filter(|m| m.is_some()).count()
    }

    /// Value indices that no column took.
    pub fn dropped_values(&self, value_count: usize) -> Vec<usize> {
        (0..value_count)
            .filter(|j| !self.mapping.contains(&Some(*j)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Start,
    Match,
    SkipColumn,
    SkipValue,
}

pub fn match_score(column: &ColumnMeta) -> i64 {
    match column.data_type {
        DataType::Enum | DataType::Date | DataType::DateTime | DataType::Json => {
            DISTINCTIVE_MATCH_SCORE
        }
        DataType::Integer | DataType::Decimal | DataType::Boolean => NUMERIC_MATCH_SCORE,
        DataType::Time | DataType::String => GENERIC_MATCH_SCORE,
    }
}

pub fn skip_column_penalty(column: &ColumnMeta) -> i64 {
    if column.is_required() {
        REQUIRED_SKIP_PENALTY
    } else {
        OPTIONAL_SKIP_PENALTY
    }
}

/// Whether the aligner may assign a dump value to this column at all.
fn is_target(column: &ColumnMeta, options: AlignOptions) -> bool {
    if column.generated {
        return false;
    }
    !column.auto_increment || options.preserve_identity
}

/// Align live `columns` against one row of raw `values`.
pub fn align(columns: &[ColumnMeta], values: &[RawToken], options: AlignOptions) -> Alignment {
    let n = columns.len();
    let m = values.len();
    let width = m + 1;

    let mut score = vec![0i64; (n + 1) * width];
    let mut step = vec![Step::Start; (n + 1) * width];
    let at = |i: usize, j: usize| i * width + j;

    for j in 1..=m {
        score[at(0, j)] = score[at(0, j - 1)] - SKIP_VALUE_PENALTY;
        step[at(0, j)] = Step::SkipValue;
    }

    for i in 1..=n {
        let column = &columns[i - 1];
        let skip_col = skip_column_penalty(column);
        let target = is_target(column, options);

        score[at(i, 0)] = score[at(i - 1, 0)] - skip_col;
        step[at(i, 0)] = Step::SkipColumn;

        for j in 1..=m {
            // Preference on ties: match, then skip column, then skip value
            let mut best = score[at(i - 1, j)] - skip_col;
            let mut best_step = Step::SkipColumn;

            if target && is_compatible_value(column, &values[j - 1]) {
                let candidate = score[at(i - 1, j - 1)] + match_score(column);
                if candidate >= best {
                    best = candidate;
                    best_step = Step::Match;
                }
            }

            let candidate = score[at(i, j - 1)] - SKIP_VALUE_PENALTY;
            if candidate > best {
                best = candidate;
                best_step = Step::SkipValue;
            }

            score[at(i, j)] = best;
            step[at(i, j)] = best_step;
        }
    }

    // Best end point over all consumed-value counts; ties keep more values
    let mut end_j = 0;
    for j in 1..=m {
        if score[at(n, j)] >= score[at(n, end_j)] {
            end_j = j;
        }
    }
    let best_score = score[at(n, end_j)];

    let mut mapping = vec![None; n];
    let (mut i, mut j) = (n, end_j);
    while i > 0 || j > 0 {
        match step[at(i, j)] {
            Step::Match => {
                mapping[i - 1] = Some(j - 1);
                i -= 1;
                j -= 1;
            }
            Step::SkipColumn => i -= 1,
            Step::SkipValue => j -= 1,
            Step::Start => break,
        }
    }

    Alignment {
        mapping,
        score: best_score,
    }
}

/// Apply an alignment to a tuple, filling unmapped columns with placeholders.
pub fn apply_alignment(
    columns: &[ColumnMeta],
    alignment: &Alignment,
    tuple: &[RawToken],
) -> Vec<RawToken> {
    columns
        .iter()
        .zip(&alignment.mapping)
        .map(|(column, mapped)| {
            mapped
                .and_then(|j| tuple.get(j))
                .filter(|token| is_compatible_value(column, token))
                .cloned()
                .unwrap_or_else(|| placeholder_for_column(column))
        })
        .collect()
}
