use clap::{Parser, Subcommand, ValueEnum};
use nocomap::{AuthToken, Client, ClientConfig, HttpTransport, UpdateOutcome};
use std::path::Path;
use std::process;

/// nocomap CLI: read and write NocoDB rows through their schema
#[derive(Parser)]
#[command(name = "nocomap", version, about)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, default_value = "nocomap.yaml")]
    config: String,

    /// Server base URI (overrides the config file)
    #[arg(long)]
    base_uri: Option<String>,

    /// API token (overrides the config file)
    #[arg(long)]
    token: Option<String>,

    /// Organisation segment of data URIs
    #[arg(long)]
    org: Option<String>,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

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
    /// List projects
    Projects,

    /// List the tables of a project
    Tables {
        /// Project name
        project: String,
    },

    /// List the columns of a table
    Columns {
        /// Project name
        project: String,
        /// Table title
        table: String,
    },

    /// List rows of a table
    Rows {
        /// Project name
        project: String,
        /// Table title
        table: String,
    },

    /// Get a single row by id
    Get {
        /// Project name
        project: String,
        /// Table title
        table: String,
        /// Row id
        id: i64,
    },

    /// Create a row
    Create {
        /// Project name
        project: String,
        /// Table title
        table: String,
        /// Field values (e.g. --field Title="Buy milk")
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Update a row; nothing is sent when no field changes
    Update {
        /// Project name
        project: String,
        /// Table title
        table: String,
        /// Row id
        id: i64,
        /// Field values to update (e.g. --field Status=Done)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Delete rows; all fetched rows when no ids are given
    Delete {
        /// Project name
        project: String,
        /// Table title
        table: String,
        /// Row ids
        ids: Vec<i64>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| {
        format!("Invalid key=value pair: no '=' found in '{s}'")
    })?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let path = Path::new(&cli.config);
    let mut config = if path.exists() {
        ClientConfig::load(path)?
    } else {
        let base_uri = cli
            .base_uri
            .clone()
            .ok_or_else(|| format!("Config file '{}' not found and no --base-uri given", cli.config))?;
        ClientConfig::new(base_uri, AuthToken::Api(String::new()))
    };

    if let Some(base_uri) = &cli.base_uri {
        config.base_uri = base_uri.clone();
    }
    if let Some(token) = &cli.token {
        config.auth = AuthToken::Api(token.clone());
    }
    if let Some(org) = &cli.org {
        config.org_name = org.clone();
    }
    config.validate()?;
    Ok(config)
}

fn open(
    client: &mut Client<HttpTransport>,
    project: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if client.open_project(project)?.is_none() {
        return Err(format!("Project '{project}' not found").into());
    }
    client.load_schema(project)?;
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    log::debug!("Connecting to {} as org {}", config.base_uri, config.org_name);
    let mut client = Client::connect(&config)?;

    match &cli.command {
        Command::Projects => {
            let projects = client.list_projects()?;
            print_output(&serde_json::to_value(projects)?, &cli.format);
        }

        Command::Tables { project } => {
            if client.open_project(project)?.is_none() {
                return Err(format!("Project '{project}' not found").into());
            }
            client.load_tables(project)?;
            let tables: Vec<_> = client
                .project(project)
                .map(|p| p.tables.iter().map(|t| t.descriptor.clone()).collect())
                .unwrap_or_default();
            print_output(&serde_json::to_value(tables)?, &cli.format);
        }

        Command::Columns { project, table } => {
            open(&mut client, project)?;
            let handle = table_handle(&mut client, project, table)?;
            let columns: Vec<_> = handle
                .table()
                .columns
                .iter()
                .map(|c| c.descriptor.clone())
                .collect();
            print_output(&serde_json::to_value(columns)?, &cli.format);
        }

        Command::Rows { project, table } => {
            open(&mut client, project)?;
            let mut handle = table_handle(&mut client, project, table)?;
            handle.load_related_rows()?;
            handle.load_rows()?;
            let rows = handle
                .rows()
                .iter()
                .map(|row| handle.view(row).to_json())
                .collect::<Result<Vec<_>, _>>()?;
            print_output(&serde_json::Value::Array(rows), &cli.format);
        }

        Command::Get { project, table, id } => {
            open(&mut client, project)?;
            let mut handle = table_handle(&mut client, project, table)?;
            handle.load_related_rows()?;
            let row = handle.fetch_row(*id)?;
            print_output(&handle.view(&row).to_json()?, &cli.format);
        }

        Command::Create {
            project,
            table,
            fields,
        } => {
            open(&mut client, project)?;
            let mut handle = table_handle(&mut client, project, table)?;
            handle.load_related_rows()?;
            let response = handle.create_row(&fields_to_assignments(fields))?;
            print_output(&response, &cli.format);
        }

        Command::Update {
            project,
            table,
            id,
            fields,
        } => {
            open(&mut client, project)?;
            let mut handle = table_handle(&mut client, project, table)?;
            handle.load_related_rows()?;
            handle.load_rows()?;
            let result = match handle.update_row(*id, &fields_to_assignments(fields))? {
                UpdateOutcome::NotFound => {
                    return Err(format!("Row {id} not found in '{table}'").into());
                }
                UpdateOutcome::Unchanged => serde_json::json!({ "ok": true, "id": id, "changed": [] }),
                UpdateOutcome::Updated { diff, .. } => {
                    serde_json::json!({ "ok": true, "id": id, "changed": diff.changed })
                }
            };
            print_output(&result, &cli.format);
        }

        Command::Delete {
            project,
            table,
            ids,
        } => {
            open(&mut client, project)?;
            let mut handle = table_handle(&mut client, project, table)?;
            let deleted = if ids.is_empty() {
                handle.load_rows()?;
                handle.delete_rows(None)?
            } else {
                handle.delete_rows(Some(ids.as_slice()))?
            };
            print_output(&serde_json::json!({ "ok": true, "deleted": deleted }), &cli.format);
        }
    }

    Ok(())
}

fn table_handle<'a>(
    client: &'a mut Client<HttpTransport>,
    project: &str,
    table: &str,
) -> Result<nocomap::TableHandle<'a, HttpTransport>, Box<dyn std::error::Error>> {
    client
        .table(project, table)
        .ok_or_else(|| format!("Table '{table}' not found in '{project}'").into())
}

fn print_output(value: &serde_json::Value, format: &OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("ERROR:{e}"),
        },
        OutputFormat::Yaml => match serde_yaml::to_string(value) {
            Ok(s) => print!("{s}"),
            Err(e) => eprintln!("ERROR:{e}"),
        },
    }
}

fn fields_to_assignments(fields: &[(String, String)]) -> nocomap::Assignments {
    fields
        .iter()
        .map(|(key, val)| {
            // Numbers, booleans and lists parse as JSON; everything else is text.
            let value = serde_json::from_str(val)
                .unwrap_or_else(|_| serde_json::Value::String(val.clone()));
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("Title=Buy milk").unwrap(),
            ("Title".to_string(), "Buy milk".to_string())
        );
        assert_eq!(parse_key_value("a=b=c").unwrap().1, "b=c");
        assert!(parse_key_value("novalue").is_err());
    }

    #[test]
    fn test_fields_to_assignments() {
        let fields = vec![
            ("Estimate".to_string(), "3".to_string()),
            ("Title".to_string(), "Buy milk".to_string()),
            ("Tags".to_string(), "[\"a\",\"b\"]".to_string()),
        ];
        let assignments = fields_to_assignments(&fields);
        assert_eq!(assignments[0].1, serde_json::json!(3));
        assert_eq!(assignments[1].1, serde_json::json!("Buy milk"));
        assert_eq!(assignments[2].1, serde_json::json!(["a", "b"]));
    }
}
