use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};

pub const DEFAULT_FEW_SHOT: u32 = 5;
pub const DEFAULT_BATCH_SIZE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    Lighteval,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Lighteval => "lighteval",
        }
    }
}

impl FromStr for Framework {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lighteval" => Ok(Framework::Lighteval),
            other => Err(anyhow!("Framework '{}' is not supported", other)),
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inference engine lighteval drives during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Accelerate,
    Vllm,
    Nanotron,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Accelerate, Backend::Vllm, Backend::Nanotron];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Accelerate => "accelerate",
            Backend::Vllm => "vllm",
            Backend::Nanotron => "nanotron",
        }
    }

    /// Sub-command passed to the `lighteval` launcher.
    pub fn launcher(&self) -> &'static str {
        self.as_str()
    }

    /// Only vLLM takes an explicit numeric precision.
    pub fn requires_dtype(&self) -> bool {
        matches!(self, Backend::Vllm)
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Backend::as_str).collect()
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|backend| backend.as_str() == s)
            .ok_or_else(|| anyhow!("Backend '{}' is not recognized for lighteval", s))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dtype {
    Bfloat16,
    Float16,
    Float32,
    #[default]
    Auto,
}

impl Dtype {
    pub const ALL: [Dtype; 4] = [Dtype::Bfloat16, Dtype::Float16, Dtype::Float32, Dtype::Auto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Bfloat16 => "bfloat16",
            Dtype::Float16 => "float16",
            Dtype::Float32 => "float32",
            Dtype::Auto => "auto",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Dtype::as_str).collect()
    }
}

impl FromStr for Dtype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|dtype| dtype.as_str() == s)
            .ok_or_else(|| anyhow!("Invalid dtype '{}'", s))
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a runner needs to launch one benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    pub model_id: String,
    pub backend: Backend,
    pub dtype: Option<Dtype>,
    /// Fully qualified `suite|name` identifier.
    pub task: String,
    pub few_shot: u32,
    pub allow_truncation: bool,
    /// Additional `key=value` pairs for the model arguments.
    pub extra_model_args: Vec<String>,
    pub batch_size: u32,
}

impl RunConfiguration {
    pub fn new(model_id: impl Into<String>, backend: Backend, task: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            backend,
            dtype: None,
            task: task.into(),
            few_shot: DEFAULT_FEW_SHOT,
            allow_truncation: true,
            extra_model_args: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_dtype(mut self, dtype: Dtype) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn with_few_shot(mut self, few_shot: u32) -> Self {
        self.few_shot = few_shot;
        self
    }

    pub fn with_truncation(mut self, allow_truncation: bool) -> Self {
        self.allow_truncation = allow_truncation;
        self
    }

    pub fn with_extra_model_args(mut self, extra: Vec<String>) -> Self {
        self.extra_model_args = extra;
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }
}
