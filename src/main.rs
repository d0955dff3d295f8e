use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};

use onboard_form::config::WizardConfig;
use onboard_form::error::Error;
use onboard_form::form::value::{guess_mime_type, record_summary_json};
use onboard_form::form::{DocumentAttachment, EntryId, FieldValue};
use onboard_form::orchestrator::{FormOrchestrator, Outcome};
use onboard_form::steps::professional;

const HELP: &str = "\
Commands:
  view                      show the current step
  set <path> <value>        set a field (JSON value, or bare text)
  attach <path> <file>      attach a document from disk
  add <group>               add an entry to a repeatable group
  remove <group> <token>    remove a group entry by token
  submit                    validate the current step and advance
  skip                      skip the current step if allowed
  save                      save a draft
  discard                   delete the saved draft
  summary                   print all collected data
  quit                      exit";

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = WizardConfig::from_env().context("reading configuration")?;

    eprintln!("Onboard Form v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Drafts: {}", config.draft_dir.display());
    eprintln!("   Attachments on save: {}", config.attachment_policy);

    let mut wizard = match FormOrchestrator::from_config(&config) {
        Ok(wizard) => wizard,
        Err(Error::Draft(e)) => {
            eprintln!("   Warning: could not restore draft ({e}); starting fresh");
            let catalog = professional::catalog().context("building step catalog")?;
            FormOrchestrator::new(Arc::new(catalog), config.draft_store())
        }
        Err(e) => return Err(e).context("starting wizard"),
    };
    eprintln!("   Type `help` for commands.\n");

    print_view(&wizard);
    eprint!("> ");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        match run_command(&mut wizard, line) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("Error: {e:#}"),
        }
        std::io::stdout().flush().ok();
        eprint!("> ");
    }

    Ok(())
}

/// Execute one command line. Returns `false` to stop.
fn run_command(wizard: &mut FormOrchestrator, line: &str) -> anyhow::Result<bool> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "help" => println!("{HELP}"),
        "view" => print_view(wizard),
        "set" => {
            let (path, raw) = rest
                .split_once(' ')
                .context("usage: set <path> <value>")?;
            wizard.set_field(path, parse_value(raw.trim()))?;
        }
        "attach" => {
            let (path, file) = rest
                .split_once(' ')
                .context("usage: attach <path> <file>")?;
            let file = Path::new(file.trim());
            let bytes = std::fs::read(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mime = guess_mime_type(&file_name);
            let attachment = DocumentAttachment::from_bytes(file_name, mime, bytes);
            wizard.set_field(path, attachment.into())?;
        }
        "add" => {
            if rest.is_empty() {
                bail!("usage: add <group>");
            }
            let id = wizard.add_entry(rest)?;
            println!("Added entry {id}");
        }
        "remove" => {
            let (group, token) = rest
                .split_once(' ')
                .context("usage: remove <group> <token>")?;
            let id: EntryId = token.trim().parse().context("invalid entry token")?;
            wizard.remove_entry(group, id)?;
        }
        "submit" => {
            let payload = wizard.current_view().merged_data;
            let outcome = wizard.submit_step(payload);
            report(&outcome);
            if outcome.moved() {
                print_view(wizard);
            }
        }
        "skip" => {
            let outcome = wizard.skip_step();
            report(&outcome);
            if outcome.moved() {
                print_view(wizard);
            }
        }
        "save" => {
            let report = wizard.save_draft()?;
            println!("Draft saved at {}", report.saved_at.to_rfc3339());
            for path in &report.omitted_attachments {
                println!("  not saved (re-upload after resuming): {path}");
            }
        }
        "discard" => {
            if wizard.discard_draft()? {
                println!("Draft discarded");
            } else {
                println!("No draft to discard");
            }
        }
        "summary" => println!("{}", serde_json::to_string_pretty(&wizard.summary())?),
        "quit" | "exit" => return Ok(false),
        other => bail!("unknown command {other:?} (try `help`)"),
    }
    Ok(true)
}

/// Quoted strings, objects, arrays and `null`/`true`/`false` are read as
/// JSON. Anything else, bare numbers included, stays text so years and
/// licence numbers reach their format rules.
fn parse_value(raw: &str) -> FieldValue {
    let looks_like_json = raw.starts_with(['"', '{', '['])
        || matches!(raw, "null" | "true" | "false");
    if looks_like_json && let Ok(value) = serde_json::from_str(raw) {
        return value;
    }
    FieldValue::from(raw)
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Advanced { to, .. } | Outcome::Skipped { to, .. } => {
            println!("Moved to step {}", to + 1)
        }
        Outcome::Stayed(errors) => {
            println!("Please fix {} field(s):", errors.len());
            for (path, message) in errors.iter() {
                println!("  {path}: {message}");
            }
        }
        Outcome::SkipRejected => println!("This step cannot be skipped"),
        Outcome::AtTerminal => println!("Already at the final step"),
    }
}

fn print_view(wizard: &FormOrchestrator) {
    let view = wizard.current_view();
    println!(
        "\n[{}/{}] {}",
        view.index + 1,
        view.step_count,
        view.definition.title
    );
    if let Some(description) = &view.definition.description {
        println!("{description}");
    }
    if view.is_terminal {
        println!(
            "{}",
            serde_json::to_string_pretty(&wizard.summary()).unwrap_or_default()
        );
        return;
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&record_summary_json(&view.merged_data)).unwrap_or_default()
    );
    for (path, message) in view.validation.iter() {
        println!("  ! {path}: {message}");
    }
    if view.can_skip {
        println!("(this step can be skipped)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onboard_form::draft::{DraftStore, MemoryStore};
    use onboard_form::form::record;

    fn wizard_on_professional_details() -> FormOrchestrator {
        let catalog = Arc::new(professional::catalog().unwrap());
        let mut wizard =
            FormOrchestrator::new(catalog, DraftStore::new(Arc::new(MemoryStore::new())));
        wizard.skip_step();
        wizard
    }

    fn qualification(wizard: &FormOrchestrator, field: &str) -> FieldValue {
        wizard.current_view().merged_data["qualifications"]
            .as_record()
            .unwrap()[field]
            .clone()
    }

    #[test]
    fn bare_values_stay_text() {
        assert_eq!(parse_value("2020"), FieldValue::from("2020"));
        assert_eq!(parse_value("12.5"), FieldValue::from("12.5"));
        assert_eq!(parse_value("MAH/1234"), FieldValue::from("MAH/1234"));
        assert_eq!(parse_value("{broken"), FieldValue::from("{broken"));
    }

    #[test]
    fn json_literals_are_parsed() {
        assert_eq!(parse_value("\"2020\""), FieldValue::from("2020"));
        assert_eq!(parse_value("null"), FieldValue::Null);
        assert_eq!(parse_value("true"), FieldValue::Bool(true));
        assert_eq!(
            parse_value(r#"{"a": "b"}"#),
            FieldValue::Record(record([("a", "b")]))
        );
    }

    #[test]
    fn typed_year_passes_year_format() {
        let mut wizard = wizard_on_professional_details();
        assert!(run_command(&mut wizard, "set qualifications.graduationYear 2020").unwrap());
        assert_eq!(
            qualification(&wizard, "graduationYear"),
            FieldValue::from("2020")
        );

        let payload = wizard.current_view().merged_data;
        let Outcome::Stayed(errors) = wizard.submit_step(payload) else {
            panic!("incomplete step advanced");
        };
        assert_eq!(errors.get("qualifications.graduationYear"), None);
        assert_eq!(
            errors.get("qualifications.institutionName"),
            Some("Institution name is required")
        );
    }

    #[test]
    fn set_keeps_spaces_in_text() {
        let mut wizard = wizard_on_professional_details();
        run_command(&mut wizard, "set qualifications.institutionName National Law School").unwrap();
        assert_eq!(
            qualification(&wizard, "institutionName"),
            FieldValue::from("National Law School")
        );
    }

    #[test]
    fn unknown_command_and_quit() {
        let mut wizard = wizard_on_professional_details();
        assert!(run_command(&mut wizard, "dance").is_err());
        assert!(!run_command(&mut wizard, "quit").unwrap());
    }
}
