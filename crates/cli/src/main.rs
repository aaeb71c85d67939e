use clap::{Parser, Subcommand};
use mrb_core::medications::load_catalogue;
use mrb_core::{
    CoreConfig, EnrichmentError, EnrichmentResult, EnrichmentService, FallbackOrchestrator,
    FileMedicationStore, FileRecordStore, MedicationService, NewRecord, RecordId, RecordService,
    RecordUpdate,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mrb")]
#[command(about = "Medical Records Bridge CLI")]
struct Cli {
    /// User whose records are operated on
    #[arg(long, global = true, env = "MRB_USER", default_value = "local")]
    owner: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List records
    List {
        /// Records to skip
        #[arg(long, default_value_t = 0)]
        skip: usize,
        /// Maximum records to show (default 100)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Create a record
    Create {
        /// Record title
        title: String,
        /// Medical text
        text: String,
        /// Record type (default doctor_note)
        #[arg(long)]
        record_type: Option<String>,
    },
    /// Show one record with its cached enrichment
    Show {
        /// Record id
        id: String,
    },
    /// Update a record; changing the text clears cached enrichment
    Update {
        /// Record id
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        record_type: Option<String>,
    },
    /// Delete a record
    Delete {
        /// Record id
        id: String,
    },
    /// Translate a record's text into plain language
    Translate {
        /// Record id
        id: String,
        /// Ignore any cached translation
        #[arg(long)]
        force: bool,
    },
    /// Lifestyle suggestions for a condition, grounded in a record
    Suggest {
        /// Record id
        id: String,
        /// Condition, e.g. "hypertension"
        condition: String,
        /// Ignore any cached suggestions
        #[arg(long)]
        force: bool,
    },
    /// Explain a record
    Explain {
        /// Record id
        id: String,
        /// Ignore any cached explanation
        #[arg(long)]
        force: bool,
    },
    /// Search the medication catalogue by name or uses
    Meds {
        /// Search text
        query: String,
        /// Include discontinued medications
        #[arg(long)]
        all: bool,
    },
    /// Merge a JSON or YAML medication list into the catalogue
    SeedMeds {
        /// Path to the catalogue file
        path: PathBuf,
    },
    /// List catalogue medications mentioned in a record
    RecordMeds {
        /// Record id
        id: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mrb_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let owner = cli.owner;

    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;
    let store = Arc::new(FileRecordStore::open(cfg.records_dir())?);
    let records = RecordService::new(store.clone());
    let enrichment = EnrichmentService::new(store, FallbackOrchestrator::from_config(cfg.ai()));
    let medications =
        MedicationService::new(Arc::new(FileMedicationStore::open(cfg.medications_file())?));

    match cli.command {
        Some(Commands::List { skip, limit }) => {
            let summaries = records.list(&owner, skip, limit)?;
            if summaries.is_empty() {
                println!("No records found.");
            } else {
                for summary in summaries {
                    println!(
                        "ID: {}, Title: {}, Type: {}, Created: {}, Translated: {}, Suggestions: {}",
                        summary.id,
                        summary.title,
                        summary.record_type,
                        summary.created_at,
                        summary.has_translation,
                        summary.has_suggestions
                    );
                }
            }
        }
        Some(Commands::Create {
            title,
            text,
            record_type,
        }) => match records.create(
            &owner,
            NewRecord {
                title,
                original_text: text,
                record_type,
            },
        ) {
            Ok(record) => println!("Created record with ID: {}", record.id),
            Err(e) => eprintln!("Error creating record: {}", e),
        },
        Some(Commands::Show { id }) => {
            let record = records.get(&owner, &RecordId::parse(&id)?)?;
            println!("ID: {}", record.id);
            println!("Title: {}", record.title);
            println!("Type: {}", record.record_type);
            println!("Created: {}", record.created_at);
            println!("Updated: {}", record.updated_at);
            println!("\n{}", record.original_text);
            if let Some(translation) = record.translation() {
                println!("\nTranslation:\n{}", translation);
            }
            if let Some(slot) = &record.lifestyle_suggestions {
                let condition = slot.condition.as_deref().unwrap_or("unspecified");
                println!("\nSuggestions ({}):\n{}", condition, slot.content);
            }
        }
        Some(Commands::Update {
            id,
            title,
            text,
            record_type,
        }) => {
            let update = RecordUpdate {
                title,
                original_text: text,
                record_type,
            };
            match records.update(&owner, &RecordId::parse(&id)?, update) {
                Ok(record) => println!("Updated record with ID: {}", record.id),
                Err(e) => eprintln!("Error updating record: {}", e),
            }
        }
        Some(Commands::Delete { id }) => match records.delete(&owner, &RecordId::parse(&id)?) {
            Ok(()) => println!("Deleted record with ID: {}", id),
            Err(e) => eprintln!("Error deleting record: {}", e),
        },
        Some(Commands::Translate { id, force }) => {
            let mut record = records.get(&owner, &RecordId::parse(&id)?)?;
            print_enrichment(enrichment.translate(&mut record, force));
        }
        Some(Commands::Suggest {
            id,
            condition,
            force,
        }) => {
            let mut record = records.get(&owner, &RecordId::parse(&id)?)?;
            print_enrichment(enrichment.suggest(&mut record, &condition, force));
        }
        Some(Commands::Explain { id, force }) => {
            let mut record = records.get(&owner, &RecordId::parse(&id)?)?;
            print_enrichment(enrichment.explain(&mut record, force));
        }
        Some(Commands::Meds { query, all }) => {
            let found = medications.search(&query, 0, None, all)?;
            if found.is_empty() {
                println!("No medications found.");
            }
            for medication in found {
                println!(
                    "ID: {}, Name: {}, Uses: {}, Discontinued: {}",
                    medication.id,
                    medication.name,
                    medication.uses.as_deref().unwrap_or("-"),
                    medication.discontinued
                );
            }
        }
        Some(Commands::SeedMeds { path }) => {
            let report = medications.seed(load_catalogue(&path)?)?;
            println!(
                "Created: {}, Updated: {}, Skipped: {}",
                report.created, report.updated, report.skipped
            );
        }
        Some(Commands::RecordMeds { id }) => {
            let record = records.get(&owner, &RecordId::parse(&id)?)?;
            let found = medications.mentions_in(&record.original_text)?;
            if found.is_empty() {
                println!("No known medications mentioned.");
            }
            for mention in found {
                match mention.warning {
                    Some(warning) => println!(
                        "{} [{}] {}",
                        mention.name,
                        warning,
                        mention.discontinuation_reason.as_deref().unwrap_or("")
                    ),
                    None => println!(
                        "{}: {}",
                        mention.name,
                        mention.uses.as_deref().unwrap_or("-")
                    ),
                }
            }
        }
        None => {
            println!("Use 'mrb --help' for commands");
        }
    }

    Ok(())
}

fn print_enrichment(result: Result<EnrichmentResult, EnrichmentError>) {
    match result {
        Ok(result) => {
            let source = match (&result.provider_used, result.cached) {
                (_, true) => "cache".to_string(),
                (Some(provider), false) => provider.clone(),
                (None, false) => "unknown".to_string(),
            };
            println!("[{}]\n{}", source, result.content);
        }
        Err(EnrichmentError::Unavailable { attempts }) => {
            eprintln!("AI features unavailable");
            for attempt in attempts {
                eprintln!("  {}", attempt);
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}
