//! CLI command definitions and handlers

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimizuku_el::{
    Change, CompletionEvent, ConceptFormatter, DlSyntaxFormatter, DlSyntaxLoader, EventLog,
    JsonLoader, MalformedAxiom, OntologyLoader, Reasoner, ReasonerConfig, TBox, TracingObserver,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "mimizuku")]
#[command(about = "EL description logic reasoner (completion-based subsumption)")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Reasoner configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Fail on the first malformed axiom instead of skipping it
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List the subsumers of a concept name
    Subsumers {
        /// Ontology file (.json or DL syntax)
        #[arg(short, long)]
        ontology: PathBuf,

        /// Concept name to query
        #[arg(short, long)]
        concept: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Include the completion events in the output
        #[arg(long)]
        trace: bool,
    },

    /// Compute the subsumers of every concept name
    Classify {
        /// Ontology file (.json or DL syntax)
        #[arg(short, long)]
        ontology: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Check whether SUB ⊑ SUP is entailed (exit code 1 if not)
    Entails {
        /// Ontology file (.json or DL syntax)
        #[arg(short, long)]
        ontology: PathBuf,

        /// Concept name on the left-hand side
        #[arg(long)]
        sub: String,

        /// Concept expression in DL syntax, e.g. "∃hasParent.Person"
        #[arg(long)]
        sup: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show ontology statistics
    Info {
        /// Ontology file (.json or DL syntax)
        #[arg(short, long)]
        ontology: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    JsonPretty,
}

/// Command execution result
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
    /// Rendered output for stdout
    pub output: String,
}

/// Execute CLI commands
pub struct CommandExecutor {
    config: ReasonerConfig,
    strict: bool,
}

impl CommandExecutor {
    pub fn new(config: ReasonerConfig, strict: bool) -> Self {
        Self { config, strict }
    }

    /// Build an executor from the global flags
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => load_config(path)?,
            None => ReasonerConfig::default(),
        };
        Ok(Self::new(config, cli.strict))
    }

    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    /// Execute a CLI command
    pub fn execute(&self, command: Commands) -> Result<CommandResult> {
        match command {
            Commands::Subsumers { ontology, concept, format, trace } => {
                self.execute_subsumers(&ontology, &concept, format, trace)
            }
            Commands::Classify { ontology, format } => self.execute_classify(&ontology, format),
            Commands::Entails { ontology, sub, sup, format } => {
                self.execute_entails(&ontology, &sub, &sup, format)
            }
            Commands::Info { ontology, format } => self.execute_info(&ontology, format),
        }
    }

    /// Load a TBox, choosing the loader by file extension
    pub fn load_ontology(&self, path: &Path) -> Result<(TBox, Vec<MalformedAxiom>)> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ontology {}", path.display()))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let loaded = if is_json {
            JsonLoader.load_tbox(&source).map(|tbox| (tbox, Vec::new()))
        } else if self.strict {
            DlSyntaxLoader::strict().load_with_report(&source)
        } else {
            DlSyntaxLoader::new().load_with_report(&source)
        };
        let (tbox, skipped) = loaded.with_context(|| format!("failed to load {}", path.display()))?;

        info!(path = %path.display(), axioms = tbox.len(), skipped = skipped.len(), "ontology loaded");
        Ok((tbox, skipped))
    }

    fn execute_subsumers(
        &self,
        ontology: &Path,
        concept: &str,
        format: OutputFormat,
        trace: bool,
    ) -> Result<CommandResult> {
        let (tbox, skipped) = self.load_ontology(ontology)?;
        let log = Arc::new(EventLog::new());
        let mut reasoner = Reasoner::with_config(tbox, self.config.clone());
        if trace {
            reasoner = reasoner.with_observer(log.clone());
        } else if tracing::enabled!(tracing::Level::TRACE) {
            reasoner = reasoner.with_observer(Arc::new(TracingObserver));
        }

        let subsumers = reasoner
            .subsumers_of(concept)
            .with_context(|| format!("failed to compute subsumers of {}", concept))?;
        let rendered: Vec<String> = subsumers.iter().map(ToString::to_string).collect();
        let events = log.events();

        let mut text = rendered.join("\n");
        if trace {
            for event in &events {
                text.push_str(&format!("\n  {}", describe_event(event)));
            }
        }

        let mut data = json!({
            "concept": concept,
            "subsumers": rendered,
            "skipped_axioms": skipped.len(),
        });
        if trace {
            data["trace"] = serde_json::to_value(&events)?;
        }

        Ok(CommandResult {
            success: true,
            message: format!("{} subsumers of {}", subsumers.len(), concept),
            output: render(format, text, &data)?,
            data: Some(data),
        })
    }

    fn execute_classify(&self, ontology: &Path, format: OutputFormat) -> Result<CommandResult> {
        let (tbox, skipped) = self.load_ontology(ontology)?;
        let reasoner = Reasoner::with_config(tbox, self.config.clone());
        let hierarchy = reasoner.classify().context("classification failed")?;

        let mut text = String::new();
        let mut classes = serde_json::Map::new();
        for (name, subsumers) in &hierarchy {
            let rendered: Vec<String> = subsumers.iter().map(ToString::to_string).collect();
            text.push_str(&format!("{} ⊑ {}\n", name, rendered.join(", ")));
            classes.insert(name.clone(), json!(rendered));
        }

        let data = json!({
            "classes": classes,
            "skipped_axioms": skipped.len(),
        });

        Ok(CommandResult {
            success: true,
            message: format!("Classified {} concepts", hierarchy.len()),
            output: render(format, text.trim_end().to_string(), &data)?,
            data: Some(data),
        })
    }

    fn execute_entails(
        &self,
        ontology: &Path,
        sub: &str,
        sup: &str,
        format: OutputFormat,
    ) -> Result<CommandResult> {
        let (tbox, _) = self.load_ontology(ontology)?;
        let superclass = DlSyntaxFormatter
            .format(sup)
            .with_context(|| format!("invalid concept expression {:?}", sup))?;

        let reasoner = Reasoner::with_config(tbox, self.config.clone());
        let entailed = reasoner.is_subsumed_by(sub, &superclass)?;

        let text = format!(
            "{} ⊑ {}: {}",
            sub,
            superclass,
            if entailed { "entailed" } else { "not entailed" }
        );
        let data = json!({
            "sub": sub,
            "sup": superclass.to_string(),
            "entailed": entailed,
        });

        Ok(CommandResult {
            success: entailed,
            message: text.clone(),
            output: render(format, text, &data)?,
            data: Some(data),
        })
    }

    fn execute_info(&self, ontology: &Path, format: OutputFormat) -> Result<CommandResult> {
        let (tbox, skipped) = self.load_ontology(ontology)?;
        let reasoner = Reasoner::with_config(tbox, self.config.clone());
        let index = reasoner.relevance_index();

        let data = json!({
            "axioms": reasoner.tbox().len(),
            "inclusions": reasoner.terminology().inclusion_count(),
            "concept_names": reasoner.tbox().concept_names().len(),
            "role_names": reasoner.tbox().role_names().len(),
            "relevant_expressions": index.len(),
            "relevant_conjunctions": index.conjunctions().len(),
            "relevant_existentials": index.existentials().len(),
            "skipped_axioms": skipped.len(),
        });

        let text = format!(
            "Axioms: {}\nInclusions: {}\nConcept names: {}\nRole names: {}\nRelevant expressions: {} ({} conjunctions, {} existentials)\nSkipped axioms: {}",
            data["axioms"],
            data["inclusions"],
            data["concept_names"],
            data["role_names"],
            data["relevant_expressions"],
            data["relevant_conjunctions"],
            data["relevant_existentials"],
            data["skipped_axioms"],
        );

        Ok(CommandResult {
            success: true,
            message: "Ontology information".to_string(),
            output: render(format, text, &data)?,
            data: Some(data),
        })
    }
}

/// Read a TOML reasoner configuration
pub fn load_config(path: &Path) -> Result<ReasonerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: ReasonerConfig =
        toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

fn render(format: OutputFormat, text: String, data: &serde_json::Value) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => text,
        OutputFormat::Json => serde_json::to_string(data)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(data)?,
    })
}

fn describe_event(event: &CompletionEvent) -> String {
    let change = match &event.change {
        Change::ConceptAdded(expr) => format!("+ {}", expr),
        Change::RoleAdded { relation, successor } => format!("{} → {}", relation, successor),
        Change::IndividualCreated { initial_concept } => format!("new individual for {}", initial_concept),
    };
    format!("[{}] {}: {}", event.rule, event.individual, change)
}
