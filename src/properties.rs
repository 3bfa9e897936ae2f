use std::{collections::HashMap, fs::File, io::BufReader, path::Path, str::FromStr, thread};

use serde::{Deserialize, Serialize};

use crate::{
    aggregation::Aggregation,
    arena::DEFAULT_PAGE_SIZE,
    compression::{CompressionStrategy, DEFAULT_PACKED_THRESHOLD},
    packing::BLOCK_SIZE,
    error::{AdjacencyError, Result},
};

/// Settings of a build.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub strategy: CompressionStrategy,
    /// Multiple of the block size above which the mixed strategy packs a list.
    pub packed_threshold: usize,
    pub aggregation: Aggregation,
    pub property_aggregations: Vec<Aggregation>,
    pub property_count: usize,
    pub concurrency: usize,
    pub arena_page_size: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            strategy: CompressionStrategy::Mixed,
            packed_threshold: DEFAULT_PACKED_THRESHOLD,
            aggregation: Aggregation::None,
            property_aggregations: Vec::new(),
            property_count: 0,
            concurrency: thread::available_parallelism().map_or(1, |n| n.get()),
            arena_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CompressionConfig {
    /// Reads a java-properties file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let map = java_properties::read(BufReader::new(file))
            .map_err(|e| AdjacencyError::Config(e.to_string()))?;
        CompressionConfig::try_from(map)
    }

    /// Aggregation applied to `channel`.
    #[inline(always)]
    pub fn property_aggregation(&self, channel: usize) -> Aggregation {
        self.property_aggregations.get(channel).copied().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(AdjacencyError::Config("concurrency has to be at least 1".to_owned()));
        }
        if self.arena_page_size == 0 || self.arena_page_size > u32::MAX as usize {
            return Err(AdjacencyError::Config(format!(
                "arena page size {} is outside of [1, 2^32)",
                self.arena_page_size
            )));
        }
        if self.packed_threshold.checked_mul(BLOCK_SIZE).is_none() {
            return Err(AdjacencyError::Config(format!(
                "packed threshold {} overflows once scaled by the block size {}",
                self.packed_threshold, BLOCK_SIZE
            )));
        }
        if self.property_aggregations.len() > self.property_count {
            return Err(AdjacencyError::Config(format!(
                "{} property aggregations given for {} property channels",
                self.property_aggregations.len(),
                self.property_count
            )));
        }
        Ok(())
    }
}

fn parse_key<T: FromStr>(map: &HashMap<String, String>, key: &str) -> Result<Option<T>> {
    match map.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| AdjacencyError::Config(format!("Failed in reading {} from properties: {}", key, v))),
    }
}

impl TryFrom<HashMap<String, String>> for CompressionConfig {
    type Error = AdjacencyError;

    fn try_from(value: HashMap<String, String>) -> Result<Self> {
        let mut config = CompressionConfig::default();

        if let Some(strategy) = parse_key(&value, "strategy")? {
            config.strategy = strategy;
        }
        if let Some(packed_threshold) = parse_key(&value, "packedthreshold")? {
            config.packed_threshold = packed_threshold;
        }
        if let Some(aggregation) = parse_key(&value, "aggregation")? {
            config.aggregation = aggregation;
        }
        if let Some(property_count) = parse_key(&value, "propertycount")? {
            config.property_count = property_count;
        }
        if let Some(concurrency) = parse_key(&value, "concurrency")? {
            config.concurrency = concurrency;
        }
        if let Some(arena_page_size) = parse_key(&value, "arenapagesize")? {
            config.arena_page_size = arena_page_size;
        }
        if let Some(aggregations) = value.get("propertyaggregations") {
            config.property_aggregations = Aggregation::parse_list(aggregations)?;
        }

        config.validate()?;

        Ok(config)
    }
}

impl From<CompressionConfig> for String {
    fn from(val: CompressionConfig) -> Self {
        let mut s = String::new();

        s.push_str("#Compressed adjacency properties\n");
        s.push_str(&format!("strategy={}\n", val.strategy));
        s.push_str(&format!("packedthreshold={}\n", val.packed_threshold));
        s.push_str(&format!("aggregation={}\n", val.aggregation));
        s.push_str(&format!("propertycount={}\n", val.property_count));
        s.push_str(&format!(
            "propertyaggregations={}\n",
            val.property_aggregations
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(",")
        ));
        s.push_str(&format!("concurrency={}\n", val.concurrency));
        s.push_str(&format!("arenapagesize={}\n", val.arena_page_size));

        s
    }
}
