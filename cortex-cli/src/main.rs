use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use cortex::schema::{
    parse_template, CardsViewConfig, FieldType, GalleryViewConfig, MyDayViewConfig, NewDatabase,
    NewField, NewView, SortCondition, SortDirection, TodoViewConfig, ViewType,
};
use cortex::{CortexError, Database, ImportMode, Snapshot, Store, StoreConfig, Value, Values};
use serde::Serialize;
use std::path::PathBuf;
use std::process;

/// Cortex CLI: manage databases, records and views in a Cortex store
#[derive(Parser)]
#[command(name = "cortex", version, about)]
struct Cli {
    /// Path to the store file
    #[arg(long, default_value = "cortex.db")]
    db: PathBuf,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    /// Accept invalid record values with a warning instead of failing
    #[arg(long)]
    lenient: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List all databases
    Databases,

    /// Create a database, empty or from a YAML template
    Create {
        /// Database name (taken from the template when omitted)
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
        /// YAML template with fields and views
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Show a database with its fields, records and views
    Show {
        /// Database id or name
        database: String,
    },

    /// Delete a database and everything in it
    Drop {
        database: String,
    },

    /// Add a field to a database
    AddField {
        database: String,
        name: String,
        /// text, number, select, multiselect, date, checkbox, url, email or relation
        #[arg(long = "type")]
        field_type: FieldType,
        /// Option label for select fields (repeatable)
        #[arg(long = "option")]
        options: Vec<String>,
        /// Target database id or name for relation fields
        #[arg(long)]
        target: Option<String>,
        /// Relation holds a list of ids
        #[arg(long)]
        multiple: bool,
        #[arg(long)]
        required: bool,
    },

    /// Delete a field and strip it from records and views
    DropField {
        database: String,
        /// Field id or name
        field: String,
    },

    /// Insert a record
    Insert {
        database: String,
        /// Field values (e.g. --field Title="Buy milk")
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Merge values into an existing record
    Update {
        database: String,
        record: String,
        /// Field values to set; `null` clears a field
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Delete a record
    Delete {
        database: String,
        record: String,
    },

    /// Set the manual order of records
    Reorder {
        database: String,
        /// Record ids in their new order
        #[arg(required = true)]
        records: Vec<String>,
        /// Reorder through a view (refused when the view is sorted)
        #[arg(long)]
        view: Option<String>,
    },

    /// Add a view to a database
    AddView {
        database: String,
        name: String,
        #[arg(long = "type", default_value = "table")]
        view_type: ViewType,
        #[arg(long)]
        checkbox_field: Option<String>,
        #[arg(long)]
        date_field: Option<String>,
        #[arg(long)]
        streak_field: Option<String>,
        #[arg(long)]
        image_field: Option<String>,
        /// Source database for cards views
        #[arg(long)]
        source: Option<String>,
        /// Relation field on the source database for cards views
        #[arg(long)]
        group_by: Option<String>,
        /// Sort key as `field` or `field:desc` (repeatable)
        #[arg(long = "sort")]
        sorts: Vec<String>,
    },

    /// Delete a view (never the last one)
    DropView {
        database: String,
        view: String,
    },

    /// Compute and print a view's state
    Render {
        database: String,
        view: String,
        /// Evaluate as of this day instead of today
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Flip a record's checkbox in a todo view
    ToggleTodo {
        database: String,
        view: String,
        record: String,
    },

    /// Complete or undo a habit for today in a my_day view
    ToggleHabit {
        database: String,
        view: String,
        record: String,
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Export every database as a JSON snapshot
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import a JSON snapshot
    Import {
        file: PathBuf,
        /// merge (upsert by id) or replace (wipe first)
        #[arg(long, default_value = "merge")]
        mode: ImportMode,
    },

    /// Show store location and per-database counts
    Status,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| {
        format!("Invalid key=value pair: no '=' found in '{s}'")
    })?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = StoreConfig::at(&cli.db);
    if cli.lenient {
        config = config.lenient();
    }
    let store = Store::open(config)?;

    match cli.command {
        Command::Databases => {
            let summary: Vec<serde_json::Value> = store
                .list_databases()?
                .iter()
                .map(|db| {
                    serde_json::json!({
                        "id": db.id,
                        "name": db.name,
                        "icon": db.icon,
                        "records": db.records.len(),
                    })
                })
                .collect();
            print_output(&summary, &cli.format)?;
        }

        Command::Create {
            name,
            description,
            icon,
            color,
            template,
        } => {
            let database = match template {
                Some(path) => {
                    let mut template = parse_template(&path)?;
                    if let Some(name) = name {
                        template.name = name;
                    }
                    store.create_database_from_template(&template)?
                }
                None => {
                    let name = name.ok_or("a database name or --template is required")?;
                    let mut new = NewDatabase::named(name);
                    new.description = description;
                    if let Some(icon) = icon {
                        new.icon = icon;
                    }
                    if let Some(color) = color {
                        new.color = color;
                    }
                    store.create_database(new)?
                }
            };
            print_output(&database, &cli.format)?;
        }

        Command::Show { database } => {
            let db = find(&store, &database)?;
            print_output(&db, &cli.format)?;
        }

        Command::Drop { database } => {
            let db = find(&store, &database)?;
            store.delete_database(&db.id)?;
            print_output(&serde_json::json!({ "ok": true, "deleted": db.id }), &cli.format)?;
        }

        Command::AddField {
            database,
            name,
            field_type,
            options,
            target,
            multiple,
            required,
        } => {
            let db = find(&store, &database)?;
            let mut new = NewField::new(name, field_type);
            if !options.is_empty() {
                new = new.with_options(options);
            }
            if let Some(target) = target {
                let target = find(&store, &target)?;
                new = new.with_relation(target.id, multiple);
            }
            if required {
                new = new.required();
            }
            let field = store.add_field(&db.id, new)?;
            print_output(&field, &cli.format)?;
        }

        Command::DropField { database, field } => {
            let db = find(&store, &database)?;
            let field_id = db
                .resolve_field(&field)
                .map(|f| f.id.clone())
                .ok_or_else(|| format!("no field '{field}' in '{}'", db.name))?;
            store.delete_field(&db.id, &field_id)?;
            print_output(&serde_json::json!({ "ok": true, "deleted": field_id }), &cli.format)?;
        }

        Command::Insert { database, fields } => {
            let db = find(&store, &database)?;
            let record = store.add_record(&db.id, fields_to_values(&db, &fields))?;
            print_output(&record, &cli.format)?;
        }

        Command::Update {
            database,
            record,
            fields,
        } => {
            let db = find(&store, &database)?;
            let record = store.update_record(&db.id, &record, fields_to_values(&db, &fields))?;
            print_output(&record, &cli.format)?;
        }

        Command::Delete { database, record } => {
            let db = find(&store, &database)?;
            store.delete_record(&db.id, &record)?;
            print_output(&serde_json::json!({ "ok": true, "deleted": record }), &cli.format)?;
        }

        Command::Reorder {
            database,
            records,
            view,
        } => {
            let db = find(&store, &database)?;
            match view {
                Some(view) => {
                    let view_id = view_id(&db, &view)?;
                    store.reorder_view_records(&db.id, &view_id, &records)?;
                }
                None => store.reorder_records(&db.id, &records)?,
            }
            print_output(&serde_json::json!({ "ok": true, "order": records }), &cli.format)?;
        }

        Command::AddView {
            database,
            name,
            view_type,
            checkbox_field,
            date_field,
            streak_field,
            image_field,
            source,
            group_by,
            sorts,
        } => {
            let db = find(&store, &database)?;
            let config = match view_type {
                ViewType::Table => cortex::ViewConfig::Table,
                ViewType::Todo => cortex::ViewConfig::Todo {
                    todo_config: TodoViewConfig {
                        checkbox_field_id: required_field(&db, checkbox_field, "--checkbox-field")?,
                        show_completed: true,
                        completed_collapsed: false,
                    },
                },
                ViewType::MyDay => cortex::ViewConfig::MyDay {
                    my_day_config: MyDayViewConfig {
                        date_field_id: required_field(&db, date_field, "--date-field")?,
                        streak_field_id: required_field(&db, streak_field, "--streak-field")?,
                        perfect_streak: 0,
                        last_perfect_day: None,
                    },
                },
                ViewType::Gallery => cortex::ViewConfig::Gallery {
                    gallery_config: GalleryViewConfig {
                        image_field_id: required_field(&db, image_field, "--image-field")?,
                    },
                },
                ViewType::Cards => {
                    let source = find(&store, &source.ok_or("cards views need --source")?)?;
                    cortex::ViewConfig::Cards {
                        cards_config: CardsViewConfig {
                            group_by_field_id: required_field(&source, group_by, "--group-by")?,
                            source_database_id: source.id,
                        },
                    }
                }
            };

            let mut new = NewView::new(name, config);
            for sort in sorts {
                let (field, direction) = match sort.rsplit_once(':') {
                    Some((field, "desc")) => (field, SortDirection::Desc),
                    Some((field, "asc")) => (field, SortDirection::Asc),
                    _ => (sort.as_str(), SortDirection::Asc),
                };
                new.sorts.push(SortCondition {
                    field_id: required_field(&db, Some(field.to_string()), "--sort")?,
                    direction,
                });
            }
            let view = store.add_view(&db.id, new)?;
            print_output(&view, &cli.format)?;
        }

        Command::DropView { database, view } => {
            let db = find(&store, &database)?;
            let view_id = view_id(&db, &view)?;
            store.delete_view(&db.id, &view_id)?;
            print_output(&serde_json::json!({ "ok": true, "deleted": view_id }), &cli.format)?;
        }

        Command::Render {
            database,
            view,
            today,
        } => {
            let db = find(&store, &database)?;
            let view_id = view_id(&db, &view)?;
            let state = match today {
                Some(today) => store.compute_view_on(&db.id, &view_id, today)?,
                None => store.compute_view(&db.id, &view_id)?,
            };
            print_output(&state, &cli.format)?;
        }

        Command::ToggleTodo {
            database,
            view,
            record,
        } => {
            let db = find(&store, &database)?;
            let view_id = view_id(&db, &view)?;
            let record = store.toggle_todo(&db.id, &view_id, &record)?;
            print_output(&record, &cli.format)?;
        }

        Command::ToggleHabit {
            database,
            view,
            record,
            today,
        } => {
            let db = find(&store, &database)?;
            let view_id = view_id(&db, &view)?;
            let toggle = match today {
                Some(today) => store.toggle_habit_on(&db.id, &view_id, &record, today)?,
                None => store.toggle_habit(&db.id, &view_id, &record)?,
            };
            print_output(&toggle, &cli.format)?;
        }

        Command::Export { output } => {
            let json = store.export_snapshot()?.to_json_pretty()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .map_err(|e| format!("Failed to write '{}': {e}", path.display()))?;
                    log::info!("exported snapshot to {}", path.display());
                }
                None => println!("{json}"),
            }
        }

        Command::Import { file, mode } => {
            let content = std::fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read snapshot '{}': {e}", file.display()))?;
            let snapshot = Snapshot::from_json(&content)?;
            let report = store.import_snapshot(&snapshot, mode)?;
            print_output(&report, &cli.format)?;
        }

        Command::Status => {
            let result = store.status()?;
            print_output(&result, &cli.format)?;
        }
    }

    Ok(())
}

fn print_output<T: Serialize>(value: &T, format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

fn find(store: &Store, key: &str) -> Result<Database, CortexError> {
    store.find_database(key)?.ok_or_else(|| CortexError::NotFound {
        entity: "Database",
        id: key.to_string(),
    })
}

fn view_id(database: &Database, key: &str) -> Result<String, CortexError> {
    database
        .views
        .iter()
        .find(|v| v.id == key || v.name.eq_ignore_ascii_case(key.trim()))
        .map(|v| v.id.clone())
        .ok_or_else(|| CortexError::NotFound {
            entity: "View",
            id: key.to_string(),
        })
}

fn required_field(database: &Database, key: Option<String>, flag: &str) -> Result<String, String> {
    let key = key.ok_or_else(|| format!("{flag} is required for this view type"))?;
    database
        .resolve_field(&key)
        .map(|f| f.id.clone())
        .ok_or_else(|| format!("no field '{key}' in '{}'", database.name))
}

/// Build record values from `key=value` pairs. Keys resolve by field id or
/// name; values parse as JSON and fall back to plain text. Select labels
/// become option ids.
fn fields_to_values(database: &Database, fields: &[(String, String)]) -> Values {
    let mut values = Values::new();
    for (key, raw) in fields {
        let field = database.resolve_field(key);
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::text(raw.clone()));
        let value = match (field, value) {
            (Some(f), Value::Text(label)) if f.field_type.has_options() => {
                match f.option_labelled(&label) {
                    Some(o) if f.field_type == FieldType::Multiselect => Value::list([o.id.clone()]),
                    Some(o) => Value::text(o.id.clone()),
                    None => Value::Text(label),
                }
            }
            (_, value) => value,
        };
        let id = field.map_or_else(|| key.clone(), |f| f.id.clone());
        values.insert(id, value);
    }
    values
}
