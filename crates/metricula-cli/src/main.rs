//! Metricula CLI - check and evaluate metric formulas

mod workspace;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use metricula::prelude::*;
use metricula::{tokenize, TokenKind, ValidatedExpr};
use tracing_subscriber::EnvFilter;

use crate::workspace::Workspace;

#[derive(Parser)]
#[command(name = "metricula")]
#[command(author, version, about = "Custom metric formula tool")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tokens of a formula
    Tokens {
        /// Formula text
        formula: String,
    },

    /// Parse and validate a formula, reporting every problem
    Check {
        /// Formula text
        formula: String,

        /// Schema field as name:type (repeatable)
        #[arg(short, long = "field", value_name = "NAME:TYPE", value_parser = parse_field)]
        fields: Vec<Field>,
    },

    /// Evaluate a formula against the given values
    Eval {
        /// Formula text
        formula: String,

        /// Field value as name=number (repeatable)
        #[arg(long = "value", value_name = "NAME=NUMBER", value_parser = parse_value)]
        values: Vec<(String, f64)>,
    },

    /// Evaluate every formula of a workspace file and print the results as JSON
    Report {
        /// Workspace JSON file with schema, formulas and record
        workspace: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Tokens { formula } => print_tokens(&formula),
        Commands::Check { formula, fields } => check(&formula, Schema::new(fields)),
        Commands::Eval { formula, values } => eval(&formula, values),
        Commands::Report { workspace } => report(workspace),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_field(arg: &str) -> Result<Field, String> {
    let (name, field_type) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:TYPE, got '{arg}'"))?;
    let field_type: FieldType = field_type.parse().map_err(|e| format!("{e}"))?;
    Ok(Field::new(name.trim(), field_type))
}

fn parse_value(arg: &str) -> Result<(String, f64), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=NUMBER, got '{arg}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", value.trim()))?;
    Ok((name.trim().to_string(), value))
}

fn print_tokens(formula: &str) -> Result<ExitCode> {
    match tokenize(formula) {
        Ok(tokens) => {
            for token in tokens {
                println!("{:>4}  {:<10}  {}", token.position, kind_name(token.kind), token.text);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprint!("{}", diagnostic(formula, err.position, &err.to_string()));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn check(formula: &str, schema: Schema) -> Result<ExitCode> {
    match compile(formula, &schema) {
        Ok(validated) => {
            println!("{}", validated.expr());
            for line in describe_fields(&validated, &schema)? {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(report) => {
            eprint!("{report}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn eval(formula: &str, values: Vec<(String, f64)>) -> Result<ExitCode> {
    let record: Record = values.into_iter().collect();
    let schema: Schema = record.iter().map(|(name, _)| Field::number(name)).collect();

    let validated = match compile(formula, &schema) {
        Ok(validated) => validated,
        Err(report) => {
            eprint!("{report}");
            return Ok(ExitCode::FAILURE);
        }
    };

    match evaluate(&validated, &record) {
        Ok(value) => {
            println!("{value}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("error: {}", FormulaError::from(err));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn report(path: PathBuf) -> Result<ExitCode> {
    let results = Workspace::open(&path)?.report()?;
    let json = serde_json::to_string_pretty(&results).context("Failed to serialize results")?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

/// Parse and validate, rendering any failure as caret diagnostics
fn compile(formula: &str, schema: &Schema) -> std::result::Result<ValidatedExpr, String> {
    let expr = parse_formula(formula)
        .map_err(|err| diagnostic(formula, err.position, &format!("Parse error: {err}")))?;

    validate(&expr, schema).map_err(|errors| {
        errors
            .iter()
            .map(|err| diagnostic(formula, field_position(formula, err.name()), &err.to_string()))
            .collect()
    })
}

/// One line per referenced field: name, type and description
fn describe_fields(validated: &ValidatedExpr, schema: &Schema) -> Result<Vec<String>> {
    validated
        .fields()
        .iter()
        .map(|name| -> Result<String> {
            let field = schema.field(name)?;
            Ok(match &field.description {
                Some(description) => format!("  {name}: {} ({description})", field.field_type),
                None => format!("  {name}: {}", field.field_type),
            })
        })
        .collect()
}

/// Byte offset of the first reference to `name`
fn field_position(formula: &str, name: &str) -> usize {
    tokenize(formula)
        .ok()
        .and_then(|tokens| {
            tokens
                .into_iter()
                .find(|t| t.kind == TokenKind::Identifier && t.text == name)
        })
        .map_or(0, |t| t.position)
}

/// Message followed by the formula with a caret under `position`
fn diagnostic(formula: &str, position: usize, message: &str) -> String {
    let column = formula
        .get(..position)
        .map_or(position, |prefix| prefix.chars().count());
    format!("error: {message}\n  {formula}\n  {}^\n", " ".repeat(column))
}

fn kind_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Number => "number",
        TokenKind::Identifier => "identifier",
        TokenKind::Operator => "operator",
        TokenKind::LParen => "lparen",
        TokenKind::RParen => "rparen",
    }
}
