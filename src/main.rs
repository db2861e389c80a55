use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;

use capstone_grader::config::{self, Config};
use capstone_grader::context::{self, AccessError, AppContext, Capability, ColorPreference, Role};
use capstone_grader::feed::{ChangeEvent, ChangeKind, ALL_SCOPES};
use capstone_grader::output;
use capstone_grader::scoring::{self, AggregateResult};
use capstone_grader::session::{GradeStore, GradingSession, SessionError};

const EXIT_SUCCESS: i32 = 0;
const EXIT_ACCESS: i32 = 1;
const EXIT_BLOCKED: i32 = 2;
const EXIT_STORAGE: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Tsv,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter config with the default capstone rubric
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Sign in under a name and role
    Login {
        name: String,
        #[arg(long, value_enum)]
        role: Role,
        /// Colour output preference, kept across sign-outs
        #[arg(long, value_enum)]
        color: Option<ColorPreference>,
    },
    /// Sign out (display preferences are kept)
    Logout,
    /// Show who is signed in
    Whoami,
    #[command(flatten)]
    Grading(GradingCommands),
}

/// Commands that need a loaded, validated config
#[derive(Subcommand, Debug)]
enum GradingCommands {
    /// List the criteria of a rubric
    Criteria {
        #[arg(short, long)]
        rubric: Option<String>,
    },
    /// Show live totals and validity for a scope
    Show {
        /// Scope key, e.g. "thesis-2026/alice"
        scope: String,
        #[arg(short, long)]
        rubric: Option<String>,
        #[arg(long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Enter the score for one criterion (accepts "7,5" or "7.5")
    Set {
        scope: String,
        criterion: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(long)]
        notes: Option<String>,
        #[arg(short, long)]
        rubric: Option<String>,
    },
    /// Remove the score for one criterion, keeping its notes
    Clear {
        scope: String,
        criterion: String,
        #[arg(short, long)]
        rubric: Option<String>,
    },
    /// Lock a scope's grades once every criterion is validly scored
    Finalize {
        scope: String,
        #[arg(short, long)]
        rubric: Option<String>,
    },
    /// List saved grade sheets
    List,
}

#[derive(Parser, Debug)]
#[command(name = "capstone-grader")]
#[command(about = "Weighted rubric grading for capstone projects", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/capstone-grader/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Grading(#[from] SessionError),

    #[error("{0:#}")]
    Config(anyhow::Error),

    #[error("{}", .0.join("\n  - "))]
    InvalidRubrics(Vec<String>),

    #[error("{0:#}")]
    Storage(anyhow::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Access(_) => EXIT_ACCESS,
            CliError::Grading(_) => EXIT_BLOCKED,
            CliError::Config(_) | CliError::InvalidRubrics(_) => EXIT_CONFIG,
            CliError::Storage(_) => EXIT_STORAGE,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = capstone_grader::logging::init_tracing(cli.verbose) {
        eprintln!("Failed to initialise logging: {}", e);
    }

    let code = match run(cli) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            match &e {
                CliError::InvalidRubrics(_) => eprintln!("Rubric config errors:\n  - {}", e),
                _ => eprintln!("Error: {}", e),
            }
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<(), CliError> {
    let session_path = context::get_session_path().map_err(CliError::Config)?;
    let mut ctx = AppContext::load(&session_path).map_err(CliError::Storage)?;

    match cli.command {
        Commands::Init { force } => {
            // Bootstrapping needs no sign-in; once signed in only admins may rewrite rubrics
            if ctx.is_signed_in() {
                ctx.require(Capability::ManageCriteria)?;
            }
            let path = match cli.config {
                Some(p) => p,
                None => config::get_config_path().map_err(CliError::Config)?,
            };
            config::write_default_config(&path, force).map_err(CliError::Config)?;
            println!("Config written to {}", path.display());
            Ok(())
        }
        Commands::Login { name, role, color } => {
            if let Some(color) = color {
                ctx.preferences.color = color;
            }
            let profile = ctx.sign_in(name, role).clone();
            ctx.save(&session_path).map_err(CliError::Storage)?;
            println!("Signed in as {} ({})", profile.name, profile.role);
            Ok(())
        }
        Commands::Logout => {
            match ctx.sign_out() {
                Some(profile) => {
                    ctx.save(&session_path).map_err(CliError::Storage)?;
                    println!("Signed out {}", profile.name);
                }
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Commands::Whoami => {
            match &ctx.profile {
                Some(profile) => println!(
                    "{} ({}), signed in {}",
                    profile.name,
                    profile.role,
                    profile.signed_in_at.format("%Y-%m-%d %H:%M UTC")
                ),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Commands::Grading(command) => {
            let config = load_validated_config(cli.config)?;
            run_grading(command, &config, &ctx)
        }
    }
}

fn load_validated_config(path: Option<PathBuf>) -> Result<Config, CliError> {
    let config = config::load_config(path).map_err(CliError::Config)?;
    scoring::validate_rubrics(&config.rubrics).map_err(CliError::InvalidRubrics)?;

    for rubric in &config.rubrics {
        let total = rubric.weight_total();
        if (total - 1.0).abs() >= scoring::WEIGHT_TOLERANCE {
            tracing::warn!(rubric = %rubric.name, weight_total = total, "Rubric weights do not sum to 1; grades cannot be finalized");
        }
    }
    Ok(config)
}

fn open_store(config: &Config, use_colors: bool) -> Result<GradeStore, CliError> {
    let root = config::grades_dir(config).map_err(CliError::Config)?;
    let mut store = GradeStore::new(root);
    store.feed_mut().on_change(ALL_SCOPES, move |event: &ChangeEvent| {
        let message = match &event.kind {
            ChangeKind::Saved { records } => {
                format!("Saved {} records for {}", records, event.scope_key)
            }
            ChangeKind::Finalized => format!("Finalized grades for {}", event.scope_key),
        };
        if use_colors {
            use owo_colors::OwoColorize;
            println!("{}", message.green());
        } else {
            println!("{}", message);
        }
    });
    Ok(store)
}

/// Resume a scope from its saved sheet, or start a fresh one.
///
/// A saved sheet pins its rubric; asking for a different one is an error.
fn open_session(
    config: &Config,
    store: &GradeStore,
    scope: &str,
    rubric_arg: Option<&str>,
) -> Result<GradingSession, CliError> {
    let existing = store.load(scope).map_err(CliError::Storage)?;

    let rubric_name = match (&existing, rubric_arg) {
        (Some(sheet), Some(arg)) if arg != sheet.rubric => {
            return Err(CliError::Config(anyhow::anyhow!(
                "'{}' was graded with rubric '{}', not '{}'",
                scope,
                sheet.rubric,
                arg
            )));
        }
        (Some(sheet), _) => Some(sheet.rubric.as_str()),
        (None, arg) => arg,
    };

    let rubric = config.rubric(rubric_name).ok_or_else(|| {
        CliError::Config(match rubric_name {
            Some(name) => anyhow::anyhow!("Rubric '{}' is not defined in the config", name),
            None => anyhow::anyhow!("Several rubrics are defined; pick one with --rubric or set default_rubric"),
        })
    })?;

    Ok(match existing {
        Some(sheet) => GradingSession::from_sheet(&sheet, rubric.criteria.clone()),
        None => GradingSession::new(scope, rubric.name.clone(), rubric.criteria.clone()),
    })
}

fn print_session(session: &GradingSession, result: &AggregateResult, use_colors: bool) {
    println!("{}", output::format_breakdown(session, result, use_colors));
    println!();
    println!("{}", output::format_summary(result, use_colors));

    if let Some(at) = session.finalized_at() {
        println!(
            "Finalized {} by {}",
            at.format("%Y-%m-%d %H:%M UTC"),
            session.finalized_by().unwrap_or("unknown")
        );
    } else {
        let blockers = output::format_blockers(result, use_colors);
        if !blockers.is_empty() {
            println!("{}", blockers);
        }
    }
}

fn run_grading(command: GradingCommands, config: &Config, ctx: &AppContext) -> Result<(), CliError> {
    let use_colors = ctx.preferences.color.use_colors(output::should_use_colors());

    match command {
        GradingCommands::Criteria { rubric } => {
            ctx.require(Capability::ViewCriteria)?;
            match config.rubric(rubric.as_deref()) {
                Some(r) => println!("{}", output::format_criteria(r, use_colors)),
                None if rubric.is_none() => {
                    let all: Vec<String> = config
                        .rubrics
                        .iter()
                        .map(|r| output::format_criteria(r, use_colors))
                        .collect();
                    println!("{}", all.join("\n\n"));
                }
                None => {
                    return Err(CliError::Config(anyhow::anyhow!(
                        "Rubric '{}' is not defined in the config",
                        rubric.unwrap_or_default()
                    )));
                }
            }
        }
        GradingCommands::Show { scope, rubric, format } => {
            ctx.require(Capability::ViewGrades)?;
            let store = open_store(config, use_colors)?;
            let session = open_session(config, &store, &scope, rubric.as_deref())?;
            let result = session.evaluate();

            match format {
                Format::Table => print_session(&session, &result, use_colors),
                Format::Tsv => println!("{}", output::format_tsv(&result)),
                Format::Json => {
                    let json = serde_json::to_string_pretty(&result)
                        .map_err(|e| CliError::Storage(e.into()))?;
                    println!("{}", json);
                }
            }
        }
        GradingCommands::Set { scope, criterion, value, notes, rubric } => {
            ctx.require(Capability::EditGrades)?;
            let mut store = open_store(config, use_colors)?;
            let mut session = open_session(config, &store, &scope, rubric.as_deref())?;

            session.set_raw(&criterion, value.as_str())?;
            let normalised = session.blur(&criterion)?;
            if normalised.is_empty() && !value.trim().is_empty() {
                eprintln!("'{}' is not a number; {} left empty", value, criterion);
            } else if normalised != value.trim() {
                eprintln!("'{}' adjusted to {}", value, normalised);
            }
            if notes.is_some() {
                session.set_notes(&criterion, notes)?;
            }

            store.save(&session.to_sheet()).map_err(CliError::Storage)?;
            print_session(&session, &session.evaluate(), use_colors);
        }
        GradingCommands::Clear { scope, criterion, rubric } => {
            ctx.require(Capability::EditGrades)?;
            let mut store = open_store(config, use_colors)?;
            let mut session = open_session(config, &store, &scope, rubric.as_deref())?;

            session.clear(&criterion)?;
            store.save(&session.to_sheet()).map_err(CliError::Storage)?;
            print_session(&session, &session.evaluate(), use_colors);
        }
        GradingCommands::Finalize { scope, rubric } => {
            let profile = ctx.require(Capability::FinalizeGrades)?;
            let mut store = open_store(config, use_colors)?;
            let mut session = open_session(config, &store, &scope, rubric.as_deref())?;

            let sheet = session.finalize(&profile.name)?;
            store.save(&sheet).map_err(CliError::Storage)?;
            print_session(&session, &session.evaluate(), use_colors);
        }
        GradingCommands::List => {
            ctx.require(Capability::ViewGrades)?;
            let store = open_store(config, use_colors)?;
            let sheets = store.list().map_err(CliError::Storage)?;
            println!("{}", output::format_sheet_list(&sheets, use_colors));
        }
    }

    Ok(())
}
