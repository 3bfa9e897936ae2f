//! Reduction of parallel relationships before compression.
//!
//! A node's batch may name the same target several times. Unless the aggregation is
//! [`Aggregation::None`], such runs collapse into one relationship whose property values are
//! reduced channel by channel.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{AdjacencyError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregation {
    #[default]
    Default,
    None,
    Single,
    Sum,
    Min,
    Max,
    Count,
}

impl Aggregation {
    /// Replaces [`Aggregation::Default`] by the aggregation it stands for.
    #[inline(always)]
    pub fn resolve(self) -> Aggregation {
        match self {
            Aggregation::Default => Aggregation::None,
            other => other,
        }
    }

    /// Value of a run holding only `value`.
    #[inline(always)]
    pub fn initial(self, value: f64) -> f64 {
        match self {
            Aggregation::Count => 1.0,
            _ => value,
        }
    }

    /// Folds `value` into the running value of a run.
    #[inline(always)]
    pub fn merge(self, running: f64, value: f64) -> f64 {
        match self {
            Aggregation::Sum => running + value,
            Aggregation::Min => running.min(value),
            Aggregation::Max => running.max(value),
            Aggregation::Count => running + 1.0,
            Aggregation::Default | Aggregation::None | Aggregation::Single => running,
        }
    }

    /// Parses a comma separated list, as found in configuration files.
    pub fn parse_list(list: &str) -> Result<Vec<Aggregation>> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Aggregation::from_str)
            .collect()
    }
}

impl FromStr for Aggregation {
    type Err = AdjacencyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "DEFAULT" => Ok(Aggregation::Default),
            "NONE" => Ok(Aggregation::None),
            "SINGLE" => Ok(Aggregation::Single),
            "SUM" => Ok(Aggregation::Sum),
            "MIN" => Ok(Aggregation::Min),
            "MAX" => Ok(Aggregation::Max),
            "COUNT" => Ok(Aggregation::Count),
            other => Err(AdjacencyError::Config(format!("Unknown aggregation {}", other))),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Default => "DEFAULT",
            Aggregation::None => "NONE",
            Aggregation::Single => "SINGLE",
            Aggregation::Sum => "SUM",
            Aggregation::Min => "MIN",
            Aggregation::Max => "MAX",
            Aggregation::Count => "COUNT",
        };
        write!(f, "{}", name)
    }
}

/// Sorts the batch of `node` by target and applies the aggregations, in place.
///
/// Returns the degree of the node after aggregation; `targets` and every property channel are
/// truncated to it.
///
/// # Arguments
///
/// * `node` - The node owning the batch, only used to report errors
/// * `targets` - Target ids in any order
/// * `properties` - One vector per channel, as long as `targets`
/// * `topology` - Aggregation of parallel relationships; `None` keeps them all
/// * `channels` - Aggregation of each channel; missing, `Default` and `None` entries use `topology`
pub fn prepare(
    node: u64,
    targets: &mut Vec<u64>,
    properties: &mut [Vec<f64>],
    topology: Aggregation,
    channels: &[Aggregation],
) -> Result<usize> {
    let len = targets.len();
    for (channel, values) in properties.iter().enumerate() {
        if values.len() != len {
            return Err(AdjacencyError::PropertyLengthMismatch {
                node,
                channel,
                len: values.len(),
                degree: len,
            });
        }
    }

    sort_batch(targets, properties);

    let topology = topology.resolve();
    if topology == Aggregation::None {
        return Ok(len);
    }

    let channel_aggregation = |channel: usize| match channels.get(channel).map(|a| a.resolve()) {
        Some(Aggregation::None) | None => topology,
        Some(aggregation) => aggregation,
    };

    let mut write = 0;
    let mut read = 0;
    while read < len {
        let target = targets[read];
        let mut end = read + 1;
        while end < len && targets[end] == target {
            end += 1;
        }

        for (channel, values) in properties.iter_mut().enumerate() {
            let aggregation = channel_aggregation(channel);
            let reduced = values[read + 1..end]
                .iter()
                .fold(aggregation.initial(values[read]), |acc, &v| aggregation.merge(acc, v));
            values[write] = reduced;
        }
        targets[write] = target;

        write += 1;
        read = end;
    }

    targets.truncate(write);
    for values in properties.iter_mut() {
        values.truncate(write);
    }

    Ok(write)
}

/// Stable sort of the targets, carrying the property channels along.
fn sort_batch(targets: &mut [u64], properties: &mut [Vec<f64>]) {
    if targets.windows(2).all(|w| w[0] <= w[1]) {
        return;
    }

    if properties.is_empty() {
        targets.sort_unstable();
        return;
    }

    let mut order: Vec<usize> = (0..targets.len()).collect();
    order.sort_by_key(|&i| targets[i]);

    let sorted: Vec<u64> = order.iter().map(|&i| targets[i]).collect();
    targets.copy_from_slice(&sorted);

    for values in properties.iter_mut() {
        let sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();
        *values = sorted;
    }
}

#[cfg(test)]
mod tests;
