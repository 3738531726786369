use crate::cli::{Action, Invocation, RowSource, SelectArgs, WriteOp};
use crate::config::ProjectConfig;
use pgdyn::{AssocRow, Db, Pool, Select, TableSchema};
use serde::Serialize;
use serde_json::json;
use std::path::Path;

pub async fn run(invocation: Invocation) -> anyhow::Result<()> {
    // Inputs are read before connecting so a bad file fails without a pool.
    let input = Input::read(&invocation.action)?;

    let project = ProjectConfig::resolve(&invocation.config, invocation.database.as_deref())?;
    let db = Db::open_with_config("postgres", &project.database.url, project.db_config()?)?;

    let result = execute(&db, invocation.action, input).await;
    db.close();
    print_json(&result?)
}

enum Input {
    None,
    Schema(TableSchema),
    Row(AssocRow),
}

impl Input {
    fn read(action: &Action) -> anyhow::Result<Self> {
        match action {
            Action::Create { file } => {
                let raw = read_file(file)?;
                let schema: TableSchema = serde_json::from_str(&raw).map_err(|e| {
                    anyhow::anyhow!("invalid table schema in {}: {e}", file.display())
                })?;
                Ok(Input::Schema(schema))
            }
            Action::Write { row, .. } => Ok(Input::Row(parse_row(row)?)),
            _ => Ok(Input::None),
        }
    }
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))
}

fn parse_row(source: &RowSource) -> anyhow::Result<AssocRow> {
    let (raw, origin) = match source {
        RowSource::Inline(json) => (json.clone(), "argument".to_string()),
        RowSource::File(path) => (read_file(path)?, path.display().to_string()),
    };
    serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("row {origin} must be a JSON object: {e}"))
}

async fn execute(
    db: &Db<Pool>,
    action: Action,
    input: Input,
) -> anyhow::Result<serde_json::Value> {
    let value = match (action, input) {
        (Action::Tables, _) => json!(db.list_tables().await?),
        (Action::Sequences, _) => json!(db.list_sequences().await?),
        (Action::Schema { table }, _) => serde_json::to_value(db.get_schema(&table).await?)?,
        (Action::Create { .. }, Input::Schema(schema)) => {
            db.create_table(&schema).await?;
            serde_json::to_value(db.get_schema(&schema.name).await?)?
        }
        (Action::Drop { table }, _) => {
            db.delete_table(&table).await?;
            json!({ "dropped": table })
        }
        (Action::AddColumn { table, name, sql_type }, _) => {
            db.add_column(&table, &name, &sql_type).await?;
            serde_json::to_value(db.get_schema(&table).await?)?
        }
        (Action::DropColumn { table, name }, _) => {
            db.delete_column(&table, &name).await?;
            serde_json::to_value(db.get_schema(&table).await?)?
        }
        (Action::Select(args), _) => serde_json::to_value(db.select(&select_of(args)).await?)?,
        (Action::Write { op, table, .. }, Input::Row(row)) => match op {
            WriteOp::Insert => json!({ "id": db.insert(&table, &row).await? }),
            WriteOp::Upsert => json!({ "id": db.upsert(&table, &row).await? }),
            WriteOp::Update => json!({ "statement": db.update(&table, &row).await? }),
            WriteOp::Delete => json!({ "statement": db.delete(&table, &row).await? }),
        },
        (Action::Create { .. } | Action::Write { .. }, _) => {
            anyhow::bail!("command input was not loaded")
        }
    };
    Ok(value)
}

fn select_of(args: SelectArgs) -> Select {
    let mut select = Select::new(args.table)
        .columns(args.columns)
        .order_by(args.order_by);
    if let Some(restriction) = args.restriction {
        select = select.restriction(restriction);
    }
    select.direction = args.direction;
    select
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
