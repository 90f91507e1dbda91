use anyhow::Result;
use bench_runner::{Backend, Dtype, RunConfiguration, DEFAULT_FEW_SHOT};
use std::io::{BufRead, Write};
use system_probe::{display, recommend, HardwareProber};
use tracing::{info, instrument};

use crate::catalog::CatalogCache;
use crate::config::{AppConfig, HF_TOKEN_VAR, LIGHTEVAL_TASKS_URL};
use crate::hub::{ModelLookup, ModelRegistry};
use crate::prompt::Prompter;

const TASK_PREVIEW_LIMIT: usize = 20;

pub fn parse_backend(answer: &str, default: Backend) -> Result<Backend, String> {
    let answer = answer.to_lowercase();
    if answer.is_empty() {
        return Ok(default);
    }
    answer
        .parse()
        .map_err(|_| format!("Invalid backend. Please choose from: {:?}", Backend::names()))
}

pub fn parse_dtype(answer: &str) -> Result<Dtype, String> {
    let answer = answer.to_lowercase();
    if answer.is_empty() {
        return Ok(Dtype::Auto);
    }
    answer
        .parse()
        .map_err(|_| format!("Invalid dtype. Please choose from: {:?}", Dtype::names()))
}

pub fn parse_few_shot(answer: &str) -> Result<u32, String> {
    if answer.is_empty() {
        return Ok(DEFAULT_FEW_SHOT);
    }
    match answer.parse::<i64>() {
        Ok(n) if n < 0 => Err("Number of few-shot examples cannot be negative.".to_string()),
        Ok(n) => u32::try_from(n).map_err(|_| "Number of few-shot examples is too large.".to_string()),
        Err(_) => Err("Invalid input. Please enter an integer.".to_string()),
    }
}

pub fn parse_truncation(answer: &str) -> Result<bool, String> {
    match answer {
        "" | "1" => Ok(true),
        "0" => Ok(false),
        _ => Err("Invalid input. Please enter 0 or 1.".to_string()),
    }
}

/// Walks the user from model id to a validated `RunConfiguration`.
///
/// States run in a fixed order and each one loops until its input is
/// accepted. `run` yields `None` when the user aborts.
pub struct Wizard<'a, R, W> {
    prompter: Prompter<R, W>,
    config: &'a AppConfig,
    registry: &'a dyn ModelRegistry,
    prober: &'a HardwareProber,
    catalog: &'a CatalogCache,
}

impl<'a, R: BufRead, W: Write> Wizard<'a, R, W> {
    pub fn new(
        prompter: Prompter<R, W>,
        config: &'a AppConfig,
        registry: &'a dyn ModelRegistry,
        prober: &'a HardwareProber,
        catalog: &'a CatalogCache,
    ) -> Self {
        Self {
            prompter,
            config,
            registry,
            prober,
            catalog,
        }
    }

    #[instrument(skip(self))]
    pub fn run(&mut self) -> Result<Option<RunConfiguration>> {
        if !self.check_credentials()? {
            return Ok(None);
        }

        let model_id = self.select_model()?;
        let recommended = self.offer_hardware_probe()?;
        let backend = self.select_backend(recommended)?;
        let dtype = if backend.requires_dtype() {
            Some(self.select_dtype()?)
        } else {
            None
        };

        let task = match self.select_task()? {
            Some(task) => task,
            None => return Ok(None),
        };

        let few_shot = self
            .prompter
            .ask_until("Enter number of few-shot examples [default: 5]: ", parse_few_shot)?;
        let allow_truncation = self.prompter.ask_until(
            "Allow truncation if context is too small? (0 for No, 1 for Yes) [default: 1]: ",
            parse_truncation,
        )?;

        let mut run_config = RunConfiguration::new(model_id, backend, task)
            .with_few_shot(few_shot)
            .with_truncation(allow_truncation)
            .with_batch_size(self.config.batch_size)
            .with_extra_model_args(self.config.extra_model_args.clone());
        if let Some(dtype) = dtype {
            run_config = run_config.with_dtype(dtype);
        }

        info!(?run_config, "Run configuration assembled");
        Ok(Some(run_config))
    }

    fn check_credentials(&mut self) -> Result<bool> {
        if self.config.hf_token.is_some() {
            return Ok(true);
        }
        self.prompter
            .say(format!("\nError: Hugging Face token ({}) not found in your environment.", HF_TOKEN_VAR))?;
        self.prompter
            .say("Please create a .env file in the root directory with your token:")?;
        self.prompter.say(format!("{}=your_actual_token", HF_TOKEN_VAR))?;
        self.prompter
            .say("You can get a token from https://huggingface.co/settings/tokens")?;
        self.prompter
            .say("Benchmarking gated models like Gemma will likely fail without it.")?;
        self.prompter.confirm("Proceed anyway? (y/N): ")
    }

    fn select_model(&mut self) -> Result<String> {
        let registry = self.registry;
        self.prompter.ask_until(
            "Enter the Hugging Face model ID (e.g., google/gemma-7b): ",
            |answer| {
                if answer.is_empty() {
                    return Err("Model ID cannot be empty.".to_string());
                }
                match registry.lookup(answer) {
                    ModelLookup::Found => Ok(answer.to_string()),
                    ModelLookup::NotFound => Err(format!(
                        "Error: Model '{}' not found on Hugging Face Hub.\nPlease try entering the model ID again.",
                        answer
                    )),
                    ModelLookup::Unavailable(reason) => Err(format!(
                        "An unexpected error occurred while checking the model: {}\nPlease try entering the model ID again.",
                        reason
                    )),
                }
            },
        )
    }

    /// Returns the backend to offer as the default.
    fn offer_hardware_probe(&mut self) -> Result<Backend> {
        if !self.prompter.confirm("Check system resources (CPU/RAM/GPU)? (y/N): ")? {
            return Ok(Backend::Accelerate);
        }

        self.prompter.say("Gathering system info...")?;
        let descriptor = self.prober.probe();
        self.prompter.say(display::render(&descriptor))?;

        let recommendation = recommend(&descriptor);
        self.prompter.say(format!("Recommendation: {}", recommendation.reason))?;
        self.prompter.say(format!(
            "Recommended backend based on system info: '{}'",
            recommendation.backend
        ))?;
        Ok(recommendation.backend)
    }

    fn select_backend(&mut self, default: Backend) -> Result<Backend> {
        self.prompter.say(format!(
            "\nAvailable backends for {}: {:?}",
            self.config.framework,
            Backend::names()
        ))?;
        let backend = self.prompter.ask_until(
            &format!("Choose a backend or press Enter to use '{}': ", default),
            |answer| parse_backend(answer, default),
        )?;
        self.prompter.say(format!("Selected backend: {}", backend))?;
        Ok(backend)
    }

    fn select_dtype(&mut self) -> Result<Dtype> {
        self.prompter
            .say(format!("\nAvailable dtypes for vLLM: {:?}", Dtype::names()))?;
        let dtype = self
            .prompter
            .ask_until("Choose dtype for vLLM [default: auto]: ", parse_dtype)?;
        self.prompter.say(format!("Selected dtype: {}", dtype))?;
        Ok(dtype)
    }

    fn select_task(&mut self) -> Result<Option<String>> {
        let cache = self.catalog;
        let catalog = cache.get();
        let suites = catalog.suites();

        if suites.is_empty() {
            self.prompter
                .say("No task suites available. Check the task catalog file.")?;
            return Ok(None);
        }

        self.prompter.say("\n--- Task Selection ---")?;
        self.prompter
            .say(format!("Available task suites: {}", suites.join(", ")))?;

        let suite = self.prompter.ask_until(
            "Enter the task suite you want to run (e.g., 'mmlu', 'bigbench'): ",
            |answer| {
                let suite = answer.to_lowercase();
                if suite.is_empty() {
                    Err("Task suite cannot be empty.".to_string())
                } else if suites.contains(&suite) {
                    Ok(suite)
                } else {
                    Err(format!(
                        "Error: '{}' is not a valid task suite. Please choose from: {}",
                        suite,
                        suites.join(", ")
                    ))
                }
            },
        )?;

        let suite_tasks = catalog.tasks_in_suite(&suite);
        self.prompter
            .say(format!("\nAvailable tasks for suite '{}':", suite))?;
        for task in suite_tasks.iter().take(TASK_PREVIEW_LIMIT) {
            self.prompter.say(format!("  - {}", task))?;
        }
        if suite_tasks.len() > TASK_PREVIEW_LIMIT {
            self.prompter.say(format!(
                "  ... and {} more tasks.",
                suite_tasks.len() - TASK_PREVIEW_LIMIT
            ))?;
        }

        let example = suite_tasks
            .first()
            .map(|task| task.to_string())
            .unwrap_or_else(|| format!("{}|example", suite));
        let question = format!("Enter the full task identifier (e.g., '{}'): ", example);

        loop {
            let task = self.prompter.ask(&question)?;
            if task.is_empty() {
                self.prompter.say("Task identifier cannot be empty.")?;
                continue;
            }

            if catalog.validate(&task) {
                self.prompter.say(format!("Task '{}' is supported.", task))?;
                self.prompter.say(format!("Proceeding with task: {}", task))?;
                return Ok(Some(task));
            }

            self.prompter
                .say(format!("Error: Task '{}' is not supported.", task))?;
            self.prompter
                .say(format!("For a full list of tasks in lighteval, see: {}", LIGHTEVAL_TASKS_URL))?;
            if !self
                .prompter
                .confirm("Would you like to try a different task? (y/N): ")?
            {
                return Ok(None);
            }
        }
    }

    pub fn into_prompter(self) -> Prompter<R, W> {
        self.prompter
    }
}
