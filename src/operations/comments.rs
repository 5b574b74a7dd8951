//! A9: find the two most similar comments in `comments.txt` using embeddings.

use crate::core::classifier::contains_all;
use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::params::ResolvedParams;
use crate::core::registry::{Capability, OperationDescriptor, Outcome, no_params};

const INPUT: &str = "comments.txt";
const OUTPUT: &str = "comments-similar.txt";

pub const DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "A9",
    summary: "Write the most similar pair of comments",
    matches,
    extract: no_params,
    handler,
    capabilities: &[Capability::Read, Capability::Write, Capability::Network],
};

fn matches(text: &str) -> bool {
    contains_all(text, &[INPUT, "similar"])
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Indices `(i, j)`, `i < j`, of the pair with the largest raw dot product; self
/// pairs never count. Vectors are not normalized. Ties keep the first pair found.
pub fn most_similar_pair(vectors: &[Vec<f64>]) -> Option<(usize, usize)> {
    let mut best: Option<((usize, usize), f64)> = None;
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            let score = dot(&vectors[i], &vectors[j]);
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some(((i, j), score));
            }
        }
    }
    best.map(|(pair, _)| pair)
}

fn handler(ctx: &ExecutionContext<'_>, _params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let input = ctx.path(INPUT)?;
    let output = ctx.path(OUTPUT)?;
    let content = ctx.read_to_string(&input)?;
    let comments: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if comments.len() < 2 {
        return Err(TaskError::ValidationError(format!(
            "{} needs at least two comments, found {}",
            INPUT,
            comments.len()
        )));
    }

    let vectors = ctx.remote()?.embeddings(&comments)?;
    let (i, j) = most_similar_pair(&vectors)
        .ok_or_else(|| TaskError::ValidationError("no comment pair to compare".to_string()))?;
    let mut pair = [comments[i].as_str(), comments[j].as_str()];
    pair.sort();
    let body = format!("{}\n{}\n", pair[0], pair[1]);
    let published = ctx.write_output(&output, body.as_bytes())?;
    Ok(Outcome::new(format!("Found most similar comments and wrote to {}", OUTPUT)).with_output(published))
}
