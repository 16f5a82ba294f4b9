// File: ./src/cli.rs
//! Command-line parsing, help text and logging setup shared by the binary.
use crate::extract::ExtractionResult;
use crate::model::item::truncate_chars;
use crate::model::{Event, EventPatch, MAX_TITLE_CHARS};
use anyhow::Result;
use chrono::NaiveDate;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Extract {
        image: PathBuf,
        year: Option<i32>,
        save: bool,
        json: bool,
    },
    List,
    /// Manually entered event; the store assigns the id.
    Add(Event),
    Update {
        id: String,
        patch: EventPatch,
    },
    Export {
        id: Option<String>,
    },
    Delete {
        id: String,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub command: Command,
    pub root: Option<PathBuf>,
    pub verbose: bool,
}

fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date '{}' (expected YYYY-MM-DD)", value))
}

fn clean_title(value: &str) -> Result<String> {
    let title = value.trim();
    if title.is_empty() {
        return Err(anyhow::anyhow!("Title cannot be empty"));
    }
    Ok(truncate_chars(title, MAX_TITLE_CHARS))
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("{} needs a value", flag))
}

/// Parses `args` (without the program name).
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut root = None;
    let mut verbose = false;
    let mut year = None;
    let mut save = false;
    let mut json = false;
    let mut patch = EventPatch::default();
    let mut positional: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" | "help" => {
                return Ok(CliArgs {
                    command: Command::Help,
                    root,
                    verbose,
                });
            }
            "--root" | "-r" => {
                root = Some(PathBuf::from(value_of(args, i, "--root")?));
                i += 1;
            }
            "--year" | "-y" => {
                let value = value_of(args, i, "--year")?;
                year = Some(
                    value
                        .parse::<i32>()
                        .map_err(|_| anyhow::anyhow!("Invalid year '{}'", value))?,
                );
                i += 1;
            }
            "--title" => {
                patch.title = Some(clean_title(value_of(args, i, "--title")?)?);
                i += 1;
            }
            "--date" => {
                patch.date = Some(parse_day(value_of(args, i, "--date")?)?);
                i += 1;
            }
            "--end-date" => {
                patch.end_date = Some(Some(parse_day(value_of(args, i, "--end-date")?)?));
                i += 1;
            }
            "--clear-end-date" => patch.end_date = Some(None),
            "--description" => {
                patch.description = Some(value_of(args, i, "--description")?.trim().to_string());
                i += 1;
            }
            "--location" => {
                patch.location = Some(value_of(args, i, "--location")?.trim().to_string());
                i += 1;
            }
            "--save" => save = true,
            "--json" => json = true,
            "--verbose" | "-v" => verbose = true,
            arg if arg.starts_with('-') => {
                return Err(anyhow::anyhow!("Unknown option '{}'", arg));
            }
            arg => positional.push(arg),
        }
        i += 1;
    }

    let command = match positional.as_slice() {
        [] => Command::Help,
        ["extract", image] => Command::Extract {
            image: PathBuf::from(image),
            year,
            save,
            json,
        },
        ["extract"] => return Err(anyhow::anyhow!("extract needs an image path")),
        ["list"] => Command::List,
        ["add"] => {
            let title = patch
                .title
                .clone()
                .ok_or_else(|| anyhow::anyhow!("add needs --title"))?;
            let date = patch
                .date
                .ok_or_else(|| anyhow::anyhow!("add needs --date"))?;
            let mut ev = Event::new(String::new(), title, date);
            ev.apply_patch(&patch);
            Command::Add(ev)
        }
        ["update", id] => {
            if patch == EventPatch::default() {
                return Err(anyhow::anyhow!("update needs at least one field to change"));
            }
            Command::Update {
                id: id.to_string(),
                patch,
            }
        }
        ["export"] => Command::Export { id: None },
        ["export", id] => Command::Export {
            id: Some(id.to_string()),
        },
        ["delete", id] => Command::Delete { id: id.to_string() },
        other => return Err(anyhow::anyhow!("Unknown command: {}", other.join(" "))),
    };

    Ok(CliArgs {
        command,
        root,
        verbose,
    })
}

/// Only JPEG and PNG uploads are accepted.
pub fn check_image_extension(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Only JPG/PNG images are accepted (got '{}')",
            path.display()
        ))
    }
}

/// Initializes terminal logging on stderr. `level` is a `log` level name;
/// unknown names fall back to `info`.
pub fn init_logging(level: &str, verbose: bool) {
    let filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::from_str(level).unwrap_or(LevelFilter::Info)
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("sciencecal")
        .build();
    // A second init (e.g. in tests) is harmless.
    let _ = TermLogger::init(filter, config, TerminalMode::Stderr, ColorChoice::Auto);
}

pub fn format_event_line(ev: &Event) -> String {
    let mut line = format!("{}  {}", ev.date.format("%Y-%m-%d"), ev.title);
    if !ev.description.is_empty() {
        line.push_str(&format!("  [{}]", ev.description));
    }
    line
}

pub fn print_result(result: &ExtractionResult) {
    println!("{}", result.raw_text.trim_end());
    println!();
    println!("{} event(s) via {} path:", result.events.len(), result.strategy);
    for ev in &result.events {
        println!("    {}", format_event_line(ev));
    }
}

pub fn print_events(events: &[Event]) {
    if events.is_empty() {
        println!("No stored events.");
        return;
    }
    for ev in events {
        println!("{}  {}", ev.id, format_event_line(ev));
    }
}

pub fn print_help(binary_name: &str) {
    println!(
        "Sciencecal v{} - Extract calendar events from science calendar posters",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} extract <image.jpg|png> [--year <YYYY>] [--save] [--json]", binary_name);
    println!("    {} list", binary_name);
    println!(
        "    {} add --title <text> --date <YYYY-MM-DD> [--end-date <YYYY-MM-DD>] [--description <text>] [--location <text>]",
        binary_name
    );
    println!(
        "    {} update <id> [--title ..] [--date ..] [--end-date .. | --clear-end-date] [--description ..] [--location ..]",
        binary_name
    );
    println!("    {} export [<id>]", binary_name);
    println!("    {} delete <id>", binary_name);
    println!("    {} --help", binary_name);
    println!();
    println!("OPTIONS:");
    println!("    -y, --year <YYYY>     Calendar year of an annual poster (skips title detection).");
    println!("    --save                Append the extracted events to the local events file.");
    println!("    --json                Print the extraction result as JSON.");
    println!("    --clear-end-date      Make an updated event single-day again.");
    println!("    -r, --root <path>     Use a different directory for config and data.");
    println!("    -v, --verbose         Debug logging on stderr.");
    println!("    -h, --help            Show this help message.");
    println!();
    println!("POSTERS:");
    println!("    Landscape images are first read as an annual 6x2 month grid. If fewer");
    println!("    than `min_grid_events` entries come out, the image is read as a poster");
    println!("    with dates in the text (15.03.2025, 15 martie 2025, March 15, 2025).");
    println!();
    println!("EXAMPLES:");
    println!("    {} extract calendar-2026.jpg --save", binary_name);
    println!("    {} extract afis.png --json > afis.json", binary_name);
    println!("    {} export > evenimente.ics", binary_name);
}
