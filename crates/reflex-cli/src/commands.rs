use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::Value;
use tracing::info;

use reflex_model::{ClassRef, ClassRole, Doc, DocRef, Query, Session};
use reflex_session::{InMemorySession, SessionConfig};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    match cli.command {
        Command::Check(args) => cmd_check(args, config, &cli.format),
        Command::Get(args) => cmd_get(args, config, &cli.format),
        Command::Find(args) => cmd_find(args, config, &cli.format),
        Command::Show(args) => cmd_show(args, config, &cli.format),
    }
}

/// Read a JSON array of documents and load it on top of the core model.
pub fn open_model(path: &Path, config: SessionConfig) -> anyhow::Result<InMemorySession> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let docs: Vec<Doc> = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    let session = InMemorySession::with_config(config);
    session.load_model(docs)?;
    info!(path = %path.display(), documents = session.len()?, "model opened");
    Ok(session)
}

/// A document that cannot be read through its schema.
#[derive(Debug)]
pub struct Problem {
    pub id: DocRef,
    pub message: String,
}

/// Resolve the schema of every class and of every document's class.
pub fn check_model(session: &InMemorySession) -> anyhow::Result<Vec<Problem>> {
    let mut problems = Vec::new();
    for id in session.ids()? {
        let doc = session.get_instance(&id)?;
        let target = match ClassRole::of(doc.class()) {
            Some(_) => id.cast(),
            None => doc.class().clone(),
        };
        let mut result = session.resolve_schema(&target).map(|_| ());
        for mixin in doc.mixins() {
            result = result.and_then(|_| session.resolve_schema(mixin).map(|_| ()));
        }
        if let Err(e) = result {
            problems.push(Problem { id, message: e.to_string() });
        }
    }
    Ok(problems)
}

fn cmd_check(args: CheckArgs, config: SessionConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let session = open_model(&args.model, config)?;
    let problems = check_model(&session)?;
    match format {
        OutputFormat::Json => {
            let report: Vec<Value> = problems
                .iter()
                .map(|p| serde_json::json!({"id": p.id.as_str(), "error": p.message}))
                .collect();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for p in &problems {
                println!("{} {}: {}", "✗".red().bold(), p.id.as_str().yellow(), p.message);
            }
            if problems.is_empty() {
                println!(
                    "{} {} documents, all schemas resolve",
                    "✓".green().bold(),
                    session.len()?.to_string().bold()
                );
            }
        }
    }
    if !problems.is_empty() {
        anyhow::bail!("{} document(s) failed schema resolution", problems.len());
    }
    Ok(())
}

fn cmd_get(args: GetArgs, config: SessionConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let session = open_model(&args.model, config)?;
    let doc = session.get_instance(&DocRef::new(args.id))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&doc.to_value())?),
        OutputFormat::Text => print_doc(&session, &doc)?,
    }
    Ok(())
}

fn cmd_find(args: FindArgs, config: SessionConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let session = open_model(&args.model, config)?;
    let class = ClassRef::new(args.class);
    let query = args
        .filters
        .into_iter()
        .fold(Query::all(), |q, (key, value)| q.eq(key, value));

    let docs: Vec<Doc> = if args.one {
        session.find_one(&class, &query)?.into_iter().collect()
    } else {
        session.find(&class, &query)?
    };

    match format {
        OutputFormat::Json => {
            let values: Vec<Value> = docs.iter().map(Doc::to_value).collect();
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        OutputFormat::Text => {
            for doc in &docs {
                println!("{}  {}", doc.id().as_str().yellow(), doc.class().as_str().cyan());
            }
            let label = session
                .get_class(&class)
                .map(|c| c.to_intl_string(Some(docs.len() as u64)))
                .unwrap_or_else(|_| class.to_string());
            println!("{} {}", docs.len().to_string().bold(), label);
        }
    }
    Ok(())
}

/// Every declared attribute of a document, exerted and materialized.
pub fn exert_all(
    session: &InMemorySession,
    doc: &Doc,
    mixin: Option<&ClassRef>,
) -> anyhow::Result<serde_json::Map<String, Value>> {
    let instance = match mixin {
        Some(mixin) => session.instantiate_as(doc, mixin)?,
        None => session.instantiate_doc(doc)?,
    };
    let mut out = serde_json::Map::new();
    for name in instance.attribute_names() {
        let value = instance
            .get(session, name)
            .and_then(|exerted| exerted.to_value())
            .with_context(|| format!("reading `{name}` of {}", doc.id()))?;
        out.insert(name.to_string(), value);
    }
    Ok(out)
}

fn cmd_show(args: ShowArgs, config: SessionConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let session = open_model(&args.model, config)?;
    let doc = session.get_instance(&DocRef::new(args.id))?;
    let mixin = args.mixin.map(ClassRef::new);
    let attributes = exert_all(&session, &doc, mixin.as_ref())?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&Value::Object(attributes))?),
        OutputFormat::Text => {
            let through = mixin.as_ref().unwrap_or(doc.class());
            let label = session.get_class(through)?.to_intl_string(None);
            println!("{} {}", label.bold(), doc.id().as_str().yellow());
            for (name, value) in &attributes {
                println!("  {}: {}", name.cyan(), value);
            }
        }
    }
    Ok(())
}

fn print_doc(session: &InMemorySession, doc: &Doc) -> anyhow::Result<()> {
    let label = doc.to_intl_string(session, None)?;
    println!("{} {} ({})", label.bold(), doc.id().as_str().yellow(), doc.class().as_str().dimmed());
    for mixin in doc.mixins() {
        println!("  {} {}", "mixin".dimmed(), mixin.as_str().cyan());
    }
    for (name, value) in doc.as_obj().attributes() {
        println!("  {}: {}", name.cyan(), value);
    }
    Ok(())
}
