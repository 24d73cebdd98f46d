//! Reads named matrix literals from descriptor files written in a small MATLAB-like dialect:
//!
//! ```text
//! % Comments run to the end of the line
//! DH = [ -pi/2  0.35  0  0.675; ...
//!         0     1.15  0  0    ];
//! T_TCP = [1 0 0 0; 0 1 0 0; 0 0 1 0.2; 0 0 0 1]';
//! T_TCP = eye(4);
//! ```
//!
//! Rows are separated by `;` or by a line break, cells by whitespace or commas. A line ending
//! in `...` continues on the next one. A trailing `'` transposes the matrix. Cells are
//! evaluated with the restricted arithmetic of [`crate::expression`].

use std::sync::LazyLock;

use nalgebra::DMatrix;
use regex::Regex;

use crate::descriptor_error::DescriptorError;
use crate::expression::evaluate;

/// Largest `eye(n)` accepted, well above the 4x4 transforms descriptors use.
const MAX_IDENTITY_SIZE: usize = 16;

static MATRIX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?:\[(?P<body>[^\]]*)\]\s*(?P<transpose>'?)|eye\(\s*(?P<eye>\d+)\s*\))\s*;",
    )
    .unwrap()
});

/// Matrix literal found in the descriptor text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMatrix {
    pub name: String,
    pub value: DMatrix<f64>,
}

fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| match line.find('%') {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_body(body: &str) -> Result<DMatrix<f64>, DescriptorError> {
    // Continuation marker joins the physical lines; anything after it is ignored.
    let mut joined = String::with_capacity(body.len());
    for line in body.split('\n') {
        match line.find("...") {
            Some(pos) => {
                joined.push_str(&line[..pos]);
                joined.push(' ');
            }
            None => {
                joined.push_str(line);
                joined.push('\n');
            }
        }
    }
    let body = joined;

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for row_text in body.split(|c: char| c == ';' || c == '\n') {
        let cells = row_text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|cell| !cell.is_empty())
            .map(evaluate)
            .collect::<Result<Vec<_>, _>>()?;
        if !cells.is_empty() {
            rows.push(cells);
        }
    }

    let Some(first) = rows.first() else {
        return Err(DescriptorError::ParseError("No rows detected in matrix".to_string()));
    };
    let columns = first.len();
    if let Some(bad) = rows.iter().find(|row| row.len() != columns) {
        return Err(DescriptorError::ParseError(format!(
            "Inconsistent row lengths: expected {} columns, found {}",
            columns,
            bad.len()
        )));
    }

    Ok(DMatrix::from_fn(rows.len(), columns, |i, j| rows[i][j]))
}

/// Parse all matrix literals, in the order they appear in the text. A malformed literal fails
/// the whole text.
pub fn parse_matrices(text: &str) -> Result<Vec<ParsedMatrix>, DescriptorError> {
    let cleaned = strip_comments(text);
    let mut matrices = Vec::new();
    for captures in MATRIX_PATTERN.captures_iter(&cleaned) {
        let name = captures["name"].to_string();
        let value = if let Some(size) = captures.name("eye") {
            let n = size
                .as_str()
                .parse::<usize>()
                .ok()
                .filter(|n| *n <= MAX_IDENTITY_SIZE)
                .ok_or_else(|| {
                    DescriptorError::ParseError(format!(
                        "Bad identity size in {}: eye({}), at most {} supported",
                        name,
                        size.as_str(),
                        MAX_IDENTITY_SIZE
                    ))
                })?;
            DMatrix::identity(n, n)
        } else {
            let body = captures.name("body").map_or("", |m| m.as_str());
            let matrix = parse_body(body)
                .map_err(|e| DescriptorError::ParseError(format!("{}: {}", name, e)))?;
            if captures.name("transpose").is_some_and(|t| !t.as_str().is_empty()) {
                matrix.transpose()
            } else {
                matrix
            }
        };
        matrices.push(ParsedMatrix { name, value });
    }
    Ok(matrices)
}

/// Find the matrix to use. Candidate names are tried in priority order, and the first one that
/// exists with the expected shape wins (if a name is assigned more than once, the last
/// assignment counts). Failing that, the first literal of any name with the expected shape is
/// taken.
pub fn extract_matrix(
    text: &str,
    candidate_names: &[&str],
    expected_shape: (usize, usize),
) -> Result<ParsedMatrix, DescriptorError> {
    let matrices = parse_matrices(text)?;

    for name in candidate_names {
        if let Some(found) = matrices.iter().rev().find(|m| m.name == *name) {
            if found.value.shape() == expected_shape {
                return Ok(found.clone());
            }
        }
    }

    matrices
        .into_iter()
        .find(|m| m.value.shape() == expected_shape)
        .ok_or_else(|| DescriptorError::MatrixNotFound {
            names: candidate_names.iter().map(|n| n.to_string()).collect(),
            shape: expected_shape,
        })
}

/// Render the matrix as a literal of this dialect, one row per line.
pub fn render_matrix(name: &str, m: &DMatrix<f64>) -> String {
    let rows = m
        .row_iter()
        .map(|row| row.iter().map(|v| format!("{}", v)).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("; ...\n    ");
    format!("{} = [{}];\n", name, rows)
}
