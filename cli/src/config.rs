//! Settings shared by every subcommand
//!
//! Values come from command-line flags (or their `GED_*` environment
//! variables) and fall back to an optional TOML file:
//!
//! ```toml
//! models = "models/demo.json"
//! syntax = "models/demo_syntax.json"
//! model = "demo"
//! log = "ged_xcoder=debug"
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use ged_disasm::SyntaxDatabase;
use ged_xcoder::{ModelDatabase, ModelId};

pub const DEFAULT_LOG: &str = "warn";

#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub models: Option<PathBuf>,
    pub syntax: Option<PathBuf>,
    pub model: Option<String>,
    pub log: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[derive(clap::Args, Debug, Default)]
pub struct GlobalArgs {
    /// TOML config file
    #[clap(short, long, env = "GED_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Model database (JSON)
    #[clap(long, env = "GED_MODELS", global = true)]
    pub models: Option<PathBuf>,

    /// Disassembly syntax tables (JSON)
    #[clap(long, env = "GED_SYNTAX", global = true)]
    pub syntax: Option<PathBuf>,

    /// Model name or id, the first model of the database by default
    #[clap(short, long, env = "GED_MODEL", global = true)]
    pub model: Option<String>,

    /// Log filter directive, e.g. `ged_xcoder=debug`
    #[clap(long, global = true)]
    pub log: Option<String>,
}

/// Flags merged over the config file
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Settings {
    pub models: Option<PathBuf>,
    pub syntax: Option<PathBuf>,
    pub model: Option<String>,
    pub log: Option<String>,
}

impl Settings {
    pub fn resolve(args: &GlobalArgs) -> Result<Self> {
        let config = match &args.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        Ok(Self::merge(args, config))
    }

    pub fn merge(args: &GlobalArgs, config: Config) -> Self {
        Self {
            models: args.models.clone().or(config.models),
            syntax: args.syntax.clone().or(config.syntax),
            model: args.model.clone().or(config.model),
            log: args.log.clone().or(config.log),
        }
    }

    pub fn load_models(&self) -> Result<ModelDatabase> {
        let path = self
            .models
            .as_ref()
            .ok_or_else(|| anyhow!("No model database given (use --models or GED_MODELS)"))?;
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model database {}", path.display()))?;
        ModelDatabase::from_json(&json)
            .with_context(|| format!("Invalid model database {}", path.display()))
    }

    pub fn load_syntax(&self) -> Result<SyntaxDatabase> {
        let path = self
            .syntax
            .as_ref()
            .ok_or_else(|| anyhow!("No syntax tables given (use --syntax or GED_SYNTAX)"))?;
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read syntax tables {}", path.display()))?;
        SyntaxDatabase::from_json(&json)
            .with_context(|| format!("Invalid syntax tables {}", path.display()))
    }

    pub fn model_id(&self, db: &ModelDatabase) -> Result<ModelId> {
        let Some(model) = &self.model else {
            if db.is_empty() {
                return Err(anyhow!("The model database is empty"));
            }
            return Ok(ModelId::new(0));
        };
        if let Ok(id) = model.parse::<u32>() {
            let id = ModelId::new(id);
            db.model(id)?;
            return Ok(id);
        }
        db.model_by_name(model).ok_or_else(|| anyhow!("Unknown model {model}"))
    }
}
