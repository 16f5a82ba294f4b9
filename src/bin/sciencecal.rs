use anyhow::{Context, Result};
use sciencecal::cli::{self, Command};
use sciencecal::config::Config;
use sciencecal::context::StandardContext;
use sciencecal::extract::Extractor;
use sciencecal::model::events_to_ics;
use sciencecal::ocr::recognizer_from_config;
use sciencecal::storage::EventStore;
use std::env;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let parsed = cli::parse_args(&args)?;

    if parsed.command == Command::Help {
        cli::print_help("sciencecal");
        return Ok(());
    }

    let ctx = StandardContext::new(parsed.root.clone());
    let config = Config::load_or_default(&ctx)?;
    cli::init_logging(&config.log_level, parsed.verbose);

    match parsed.command {
        Command::Extract {
            image,
            year,
            save,
            json,
        } => {
            cli::check_image_extension(&image)?;
            let bytes = std::fs::read(&image)
                .with_context(|| format!("Failed to read {}", image.display()))?;

            let extractor = Extractor::new(recognizer_from_config(&config), &config);
            let result = extractor.extract(&bytes, year)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                cli::print_result(&result);
            }

            if save {
                let store = EventStore::new(&ctx)?;
                let added = store.add(result.events)?;
                eprintln!("Saved {} event(s) to {}", added.len(), store.path().display());
            }
        }
        Command::List => {
            let store = EventStore::new(&ctx)?;
            cli::print_events(&store.load()?);
        }
        Command::Add(ev) => {
            let store = EventStore::new(&ctx)?;
            for stored in store.add(vec![ev])? {
                println!("{}  {}", stored.id, cli::format_event_line(&stored));
            }
        }
        Command::Update { id, patch } => {
            let store = EventStore::new(&ctx)?;
            let updated = store.update(&id, &patch)?;
            println!("{}  {}", updated.id, cli::format_event_line(&updated));
        }
        Command::Export { id } => {
            let store = EventStore::new(&ctx)?;
            let ics = match id {
                Some(id) => store
                    .find(&id)?
                    .ok_or_else(|| anyhow::anyhow!("Event {} does not exist", id))?
                    .to_ics(),
                None => events_to_ics(&store.load()?),
            };
            print!("{}", ics);
        }
        Command::Delete { id } => {
            let store = EventStore::new(&ctx)?;
            store.remove(&id)?;
            eprintln!("Deleted {}", id);
        }
        Command::Help => cli::print_help("sciencecal"),
    }

    Ok(())
}
