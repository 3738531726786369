use pgdyn::SortDirection;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Select,
    Write,
    Ddl,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Run(Invocation),
}

/// A parsed command plus the connection flags shared by every command.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub config: PathBuf,
    pub database: Option<String>,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Tables,
    Sequences,
    Schema { table: String },
    Create { file: PathBuf },
    Drop { table: String },
    AddColumn { table: String, name: String, sql_type: String },
    DropColumn { table: String, name: String },
    Select(SelectArgs),
    Write { op: WriteOp, table: String, row: RowSource },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectArgs {
    pub table: String,
    pub columns: Vec<String>,
    pub restriction: Option<String>,
    pub order_by: Vec<String>,
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
    Delete,
    Upsert,
}

/// Where a row's JSON comes from: inline text or `@path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSource {
    Inline(String),
    File(PathBuf),
}

impl RowSource {
    fn parse(arg: &str) -> Self {
        match arg.strip_prefix('@') {
            Some(path) => RowSource::File(PathBuf::from(path)),
            None => RowSource::Inline(arg.to_string()),
        }
    }
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    let topic = match first.as_str() {
        "-h" | "--help" | "help" => return Ok(Command::Help(HelpTopic::Root)),
        "select" => HelpTopic::Select,
        "insert" | "update" | "delete" | "upsert" => HelpTopic::Write,
        "tables" | "sequences" | "schema" | "create" | "drop" | "add-column" | "drop-column" => {
            HelpTopic::Ddl
        }
        _ => anyhow::bail!("unknown command: {first}"),
    };

    let mut config = PathBuf::from("pgdyn.toml");
    let mut database: Option<String> = None;
    let mut positionals: Vec<&str> = Vec::new();

    let mut columns: Option<Vec<String>> = None;
    let mut restriction: Option<String> = None;
    let mut order_by: Option<Vec<String>> = None;
    let mut direction: Option<SortDirection> = None;

    let mut it = it.map(|s| s.as_str());
    while let Some(token) = it.next() {
        match token {
            "-h" | "--help" => return Ok(Command::Help(topic)),
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                config = PathBuf::from(v);
            }
            _ if token.starts_with("--config=") => {
                config = PathBuf::from(token.trim_start_matches("--config="));
            }
            "--database" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--database requires a value");
                };
                database = Some(v.to_string());
            }
            _ if token.starts_with("--database=") => {
                database = Some(token.trim_start_matches("--database=").to_string());
            }
            "--columns" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--columns requires a value");
                };
                columns = Some(split_csv(v));
            }
            _ if token.starts_with("--columns=") => {
                columns = Some(split_csv(token.trim_start_matches("--columns=")));
            }
            "--where" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--where requires a value");
                };
                restriction = Some(v.to_string());
            }
            _ if token.starts_with("--where=") => {
                restriction = Some(token.trim_start_matches("--where=").to_string());
            }
            "--order-by" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--order-by requires a value");
                };
                order_by = Some(split_csv(v));
            }
            _ if token.starts_with("--order-by=") => {
                order_by = Some(split_csv(token.trim_start_matches("--order-by=")));
            }
            "--asc" => direction = Some(SortDirection::Asc),
            "--desc" => direction = Some(SortDirection::Desc),
            "--direction" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--direction requires a value");
                };
                direction = Some(v.parse()?);
            }
            _ if token.starts_with("--direction=") => {
                direction = Some(token.trim_start_matches("--direction=").parse()?);
            }
            _ if token.starts_with("--") => anyhow::bail!("unknown argument: {token}"),
            other => positionals.push(other),
        }
    }

    let select_flags = columns.is_some()
        || restriction.is_some()
        || order_by.is_some()
        || direction.is_some();
    if select_flags && topic != HelpTopic::Select {
        anyhow::bail!("--columns/--where/--order-by/--asc/--desc only apply to `select`");
    }

    let action = match first.as_str() {
        "tables" => {
            expect_positionals(first, &positionals, &[])?;
            Action::Tables
        }
        "sequences" => {
            expect_positionals(first, &positionals, &[])?;
            Action::Sequences
        }
        "schema" => {
            expect_positionals(first, &positionals, &["<table>"])?;
            Action::Schema {
                table: positionals[0].to_string(),
            }
        }
        "create" => {
            expect_positionals(first, &positionals, &["<schema.json>"])?;
            Action::Create {
                file: PathBuf::from(positionals[0]),
            }
        }
        "drop" => {
            expect_positionals(first, &positionals, &["<table>"])?;
            Action::Drop {
                table: positionals[0].to_string(),
            }
        }
        "add-column" => {
            expect_positionals(first, &positionals, &["<table>", "<name>", "<type>"])?;
            Action::AddColumn {
                table: positionals[0].to_string(),
                name: positionals[1].to_string(),
                sql_type: positionals[2].to_string(),
            }
        }
        "drop-column" => {
            expect_positionals(first, &positionals, &["<table>", "<name>"])?;
            Action::DropColumn {
                table: positionals[0].to_string(),
                name: positionals[1].to_string(),
            }
        }
        "select" => {
            expect_positionals(first, &positionals, &["<table>"])?;
            Action::Select(SelectArgs {
                table: positionals[0].to_string(),
                columns: columns.unwrap_or_default(),
                restriction,
                order_by: order_by.unwrap_or_default(),
                direction,
            })
        }
        write => {
            expect_positionals(write, &positionals, &["<table>", "<row-json>"])?;
            let op = match write {
                "insert" => WriteOp::Insert,
                "update" => WriteOp::Update,
                "delete" => WriteOp::Delete,
                _ => WriteOp::Upsert,
            };
            Action::Write {
                op,
                table: positionals[0].to_string(),
                row: RowSource::parse(positionals[1]),
            }
        }
    };

    Ok(Command::Run(Invocation {
        config,
        database,
        action,
    }))
}

fn expect_positionals(command: &str, got: &[&str], names: &[&str]) -> anyhow::Result<()> {
    if got.len() != names.len() {
        if names.is_empty() {
            anyhow::bail!("`{command}` takes no arguments");
        }
        anyhow::bail!("usage: pgdyn {command} {}", names.join(" "));
    }
    Ok(())
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
pgdyn - schema-aware table access for PostgreSQL

USAGE:
  pgdyn <COMMAND> [ARGS] [OPTIONS]

COMMANDS:
  tables                          List tables
  sequences                       List sequences
  schema <table>                  Show column types
  create <schema.json>            Create a table and its sequence
  drop <table>                    Drop a table and its sequence
  add-column <table> <name> <type>
  drop-column <table> <name>
  select <table>                  Read rows
  insert|update|delete|upsert <table> <row-json>

GLOBAL OPTIONS:
  --config <FILE>       Config file path (default: pgdyn.toml)
  --database <URL>      Override database.url from config
  -h, --help            Print help

Run `pgdyn <command> --help` for more."
            );
        }
        HelpTopic::Select => {
            println!(
                "\
USAGE:
  pgdyn select <table> [OPTIONS]

OPTIONS:
  --columns <a,b>       Columns to return (default: all)
  --where <SQL>         Restriction, inserted verbatim after WHERE
  --order-by <a,b>      Sort keys
  --asc | --desc        Sort direction (ignored without --order-by)
  --direction <DIR>     Same as --asc/--desc
  --config <FILE>       Config file path (default: pgdyn.toml)
  --database <URL>      Override database.url from config"
            );
        }
        HelpTopic::Write => {
            println!(
                "\
USAGE:
  pgdyn insert <table> <row-json>
  pgdyn update <table> <row-json>
  pgdyn delete <table> <row-json>
  pgdyn upsert <table> <row-json>

ROW:
  Inline JSON object ('{{\"name\": \"toto\"}}') or @path to a JSON file.
  update/delete identify the row by its id column.

OPTIONS:
  --config <FILE>       Config file path (default: pgdyn.toml)
  --database <URL>      Override database.url from config"
            );
        }
        HelpTopic::Ddl => {
            println!(
                "\
USAGE:
  pgdyn tables
  pgdyn sequences
  pgdyn schema <table>
  pgdyn create <schema.json>
  pgdyn drop <table>
  pgdyn add-column <table> <name> <type>
  pgdyn drop-column <table> <name>

SCHEMA FILE:
  {{ \"name\": \"test\", \"columns\": {{ \"id\": \"integer\", \"name\": \"varchar(50)\" }} }}

OPTIONS:
  --config <FILE>       Config file path (default: pgdyn.toml)
  --database <URL>      Override database.url from config"
            );
        }
    }
}
