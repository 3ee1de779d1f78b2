use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generates the wire-name conversions for the option enums sent with a start call.
macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw.trim().to_ascii_lowercase().as_str() {
                    $($wire => Ok($name::$variant),)+
                    other => Err(format!(
                        "unknown {} '{}' (expected one of: {})",
                        stringify!($name),
                        other,
                        [$($wire),+].join(", ")
                    )),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    #[default]
    Greedy,
    Mcts,
}
wire_enum!(SearchStrategy { Greedy => "greedy", Mcts => "mcts" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMethod {
    #[default]
    Tree,
    Radius,
}
wire_enum!(SamplingMethod { Tree => "tree", Radius => "radius" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    Directed,
    #[default]
    Undirected,
}
wire_enum!(GraphType { Directed => "directed", Undirected => "undirected" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Representative,
    Instance,
}
wire_enum!(OutputFormat { Representative => "representative", Instance => "instance" });

/// Parameters of one mining run, serialized as the start-call body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningParams {
    pub min_pattern_size: u32,
    pub max_pattern_size: u32,
    pub min_neighborhood_size: u32,
    pub max_neighborhood_size: u32,
    pub n_neighborhoods: u32,
    pub n_trials: u32,
    pub out_batch_size: u32,
    pub search_strategy: SearchStrategy,
    pub sample_method: SamplingMethod,
    pub graph_type: GraphType,
    pub output_format: OutputFormat,
}

impl Default for MiningParams {
    fn default() -> Self {
        Self {
            min_pattern_size: 5,
            max_pattern_size: 10,
            min_neighborhood_size: 5,
            max_neighborhood_size: 10,
            n_neighborhoods: 2000,
            n_trials: 1000,
            out_batch_size: 3,
            search_strategy: SearchStrategy::default(),
            sample_method: SamplingMethod::default(),
            graph_type: GraphType::default(),
            output_format: OutputFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamField {
    MinPatternSize,
    MaxPatternSize,
    MinNeighborhoodSize,
    MaxNeighborhoodSize,
    NeighborhoodCount,
    TrialCount,
    OutputBatchSize,
}

impl ParamField {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamField::MinPatternSize => "min_pattern_size",
            ParamField::MaxPatternSize => "max_pattern_size",
            ParamField::MinNeighborhoodSize => "min_neighborhood_size",
            ParamField::MaxNeighborhoodSize => "max_neighborhood_size",
            ParamField::NeighborhoodCount => "n_neighborhoods",
            ParamField::TrialCount => "n_trials",
            ParamField::OutputBatchSize => "out_batch_size",
        }
    }
}

impl fmt::Display for ParamField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-supplied parameter outside its allowed range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: ParamField,
    pub reason: String,
}

impl ValidationError {
    fn new(field: ParamField, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl MiningParams {
    /// Checks every field, reporting the first one out of range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        at_least_one(ParamField::MinPatternSize, self.min_pattern_size)?;
        at_least_one(ParamField::MaxPatternSize, self.max_pattern_size)?;
        not_below(
            ParamField::MaxPatternSize,
            self.max_pattern_size,
            ParamField::MinPatternSize,
            self.min_pattern_size,
        )?;
        at_least_one(ParamField::MinNeighborhoodSize, self.min_neighborhood_size)?;
        at_least_one(ParamField::MaxNeighborhoodSize, self.max_neighborhood_size)?;
        not_below(
            ParamField::MaxNeighborhoodSize,
            self.max_neighborhood_size,
            ParamField::MinNeighborhoodSize,
            self.min_neighborhood_size,
        )?;
        at_least_one(ParamField::NeighborhoodCount, self.n_neighborhoods)?;
        at_least_one(ParamField::TrialCount, self.n_trials)?;
        at_least_one(ParamField::OutputBatchSize, self.out_batch_size)?;
        Ok(())
    }
}

fn at_least_one(field: ParamField, value: u32) -> Result<(), ValidationError> {
    if value >= 1 {
        Ok(())
    } else {
        Err(ValidationError::new(field, "must be at least 1"))
    }
}

fn not_below(
    field: ParamField,
    value: u32,
    lower_field: ParamField,
    lower: u32,
) -> Result<(), ValidationError> {
    if value >= lower {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("must be at least {lower_field} ({lower}), got {value}"),
        ))
    }
}
