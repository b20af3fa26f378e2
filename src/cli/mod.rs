#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{CommandFactory as _, Parser, Subcommand};
use time::OffsetDateTime;

use crate::board::candidates::CandidatePolicy;
use crate::board::dates;
use crate::board::filter::FilterSpec;
use crate::board::model::{TaskChanges, TaskDraft, TaskRecord, TaskStatus};
use crate::board::store::TaskStore;
use crate::config;
use crate::error::TaskboardError;
use crate::output::table::Table;
use crate::storage::audit::{AuditAction, AuditLog};
use crate::storage::{BoardStorage as _, CsvBoard};
use crate::tui;
use crate::tui::picker::{self, PickerItem};

#[derive(Debug, Parser)]
#[command(
    name = "taskboard",
    version,
    about = "CSV-backed task tracking board"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Add(AddArgs),
    List(ListArgs),
    Update(UpdateArgs),
    Close(CloseArgs),
    Candidates(CandidatesArgs),
    #[command(alias = "rm")]
    Remove(RemoveArgs),
    Summary(SummaryArgs),
    Audit(AuditArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
    Version,
}

#[derive(Debug, Parser)]
pub struct AddArgs {
    /// Task description
    pub description: Option<String>,
    #[arg(short = 's', long = "status", default_value = "in-progress")]
    pub status: String,
    #[arg(short = 'o', long = "owner", default_value = "")]
    pub owner: String,
    #[arg(short = 'n', long = "next-action", default_value = "")]
    pub next_action: String,
    #[arg(long = "notes", default_value = "")]
    pub notes: String,
    #[arg(long = "source", default_value = "")]
    pub source: String,
    /// Bulk import drafts from a YAML file
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Filter by status (open, in-progress, closed)
    #[arg(short = 's', long = "status")]
    pub status: Option<String>,
    /// Filter by owner (repeatable)
    #[arg(short = 'o', long = "owner")]
    pub owners: Vec<String>,
    /// Free-text search over description, next action, and notes
    #[arg(short = 'c', long = "contains")]
    pub contains: Option<String>,
    /// Only records updated on or after this date (YYYY-MM-DD)
    #[arg(long = "updated-from")]
    pub updated_from: Option<String>,
    /// Only records updated on or before this date (YYYY-MM-DD)
    #[arg(long = "updated-to")]
    pub updated_to: Option<String>,
    /// Show all columns
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
    /// Output in JSON format
    #[arg(long = "json")]
    pub json: bool,
    /// Output as CSV
    #[arg(long = "csv")]
    pub csv: bool,
    /// Write the filtered view as CSV to a file
    #[arg(long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct UpdateArgs {
    /// Record id
    pub id: String,
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,
    #[arg(short = 's', long = "status")]
    pub status: Option<String>,
    #[arg(short = 'o', long = "owner")]
    pub owner: Option<String>,
    #[arg(short = 'n', long = "next-action")]
    pub next_action: Option<String>,
    #[arg(long = "notes")]
    pub notes: Option<String>,
    #[arg(long = "source")]
    pub source: Option<String>,
}

#[derive(Debug, Parser)]
pub struct CloseArgs {
    /// Record ids to close
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct CandidatesArgs {
    /// Override the staleness threshold in days
    #[arg(long = "stale-days")]
    pub stale_days: Option<i64>,
    /// Override the waiting-for-reply keywords (repeatable)
    #[arg(short = 'k', long = "keyword")]
    pub keywords: Vec<String>,
    /// Interactively select candidates and close them
    #[arg(long = "close")]
    pub close: bool,
    #[arg(long = "json")]
    pub json: bool,
    #[arg(long = "csv")]
    pub csv: bool,
}

#[derive(Debug, Parser)]
pub struct RemoveArgs {
    /// Record ids to delete
    pub ids: Vec<String>,
    /// Select records to delete using the TUI picker
    #[arg(short = 'i', long = "interactive")]
    pub interactive: bool,
    /// Skip the confirmation requirement
    #[arg(short = 'f', long = "force")]
    pub force: bool,
}

#[derive(Debug, Parser)]
pub struct SummaryArgs {
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct AuditArgs {
    /// Number of entries to show, newest first
    #[arg(long = "limit", default_value_t = 20)]
    pub limit: usize,
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub cmd: ConfigCmd,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCmd {
    List,
    Set(ConfigSetArgs),
    Get(ConfigGetArgs),
}

#[derive(Debug, Parser)]
pub struct ConfigSetArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Parser)]
pub struct ConfigGetArgs {
    pub key: String,
}

#[derive(Debug, Parser)]
pub struct CompletionArgs {
    pub shell: clap_complete::Shell,
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.cmd {
        None => cmd_default().await,
        Some(Commands::Completion(args)) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "taskboard", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config(args)) => match args.cmd {
            ConfigCmd::List => {
                print!("{}", config::list_resolved_toml()?);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Set(set) => {
                config::set_value_string(&set.key, &set.value)?;
                println!("Set {} = {}", set.key, set.value);
                Ok(ExitCode::SUCCESS)
            }
            ConfigCmd::Get(get) => {
                let val = config::get_value_string(&get.key)?;
                match val {
                    Some(v) => {
                        println!("{v}");
                        Ok(ExitCode::SUCCESS)
                    }
                    None => anyhow::bail!(
                        "configuration key '{}' not found - use 'taskboard config list' to see available keys",
                        get.key
                    ),
                }
            }
        },
        Some(Commands::Add(args)) => cmd_add(args).await,
        Some(Commands::List(args)) => cmd_list(args).await,
        Some(Commands::Update(args)) => cmd_update(args).await,
        Some(Commands::Close(args)) => cmd_close(args).await,
        Some(Commands::Candidates(args)) => cmd_candidates(args).await,
        Some(Commands::Remove(args)) => cmd_remove(args).await,
        Some(Commands::Summary(args)) => cmd_summary(args).await,
        Some(Commands::Audit(args)) => cmd_audit(args).await,
        Some(Commands::Version) => Ok(cmd_version()),
    }
}

async fn load_cfg() -> anyhow::Result<config::Config> {
    let cfg = tokio::task::spawn_blocking(|| -> anyhow::Result<config::Config> {
        let (cfg, _doc, _paths) = config::load()?;
        Ok(cfg)
    })
    .await??;
    Ok(cfg)
}

fn open_storage(cfg: &config::Config) -> anyhow::Result<CsvBoard> {
    let path = config::expand_path(&cfg.board.csv_path)?;
    Ok(CsvBoard::new(path, cfg.board.save_with_time))
}

fn open_audit(cfg: &config::Config) -> anyhow::Result<AuditLog> {
    let path = config::expand_path(&cfg.board.audit_path)?;
    Ok(AuditLog::new(path, cfg.audit_user()))
}

fn load_store(storage: &CsvBoard) -> anyhow::Result<TaskStore> {
    Ok(TaskStore::from_records(storage.load()?))
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

async fn cmd_default() -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;

    if tui::is_tty() {
        crate::tui::app::run(cfg).await?;
        return Ok(ExitCode::SUCCESS);
    }

    // Non-TTY fallback: print the board.
    let storage = open_storage(&cfg)?;
    let store = load_store(&storage)?;
    let table = task_table(&cfg, store.records().iter(), false);
    table.print()?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_add(args: AddArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let storage = open_storage(&cfg)?;
    let audit = open_audit(&cfg)?;
    let mut store = load_store(&storage)?;
    let ts = now();

    let drafts = if let Some(file) = args.file.as_deref() {
        if args.description.is_some() {
            anyhow::bail!("cannot combine a description argument with --file");
        }
        drafts_from_file(file)?
    } else {
        let Some(description) = args.description else {
            anyhow::bail!("a description is required (or use --file)");
        };
        vec![TaskDraft {
            description,
            status: TaskStatus::parse(&args.status)?,
            owner: args.owner,
            next_action: args.next_action,
            notes: args.notes,
            source: args.source,
        }]
    };

    let mut added = Vec::with_capacity(drafts.len());
    for draft in drafts {
        added.push(store.add(draft, ts)?);
    }
    storage.save(store.records())?;

    for id in &added {
        audit.append(AuditAction::Create, id, None, store.get(id), ts)?;
        println!("{id}");
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, serde::Deserialize)]
struct DraftFile {
    version: String,
    #[serde(default)]
    tasks: Vec<DraftFileEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct DraftFileEntry {
    description: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    next_action: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    source: String,
}

fn drafts_from_file(file: &str) -> anyhow::Result<Vec<TaskDraft>> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read draft file: {file}"))?;
    let def: DraftFile =
        serde_yaml::from_str(&data).with_context(|| format!("failed to parse YAML: {file}"))?;

    if def.version.trim() != "1.0" {
        anyhow::bail!(
            "unsupported draft file version: {} (expected 1.0)",
            def.version
        );
    }

    let mut drafts = Vec::with_capacity(def.tasks.len());
    for entry in def.tasks {
        let status = if entry.status.trim().is_empty() {
            TaskStatus::InProgress
        } else {
            TaskStatus::parse(&entry.status)?
        };
        drafts.push(TaskDraft {
            description: entry.description,
            status,
            owner: entry.owner,
            next_action: entry.next_action,
            notes: entry.notes,
            source: entry.source,
        });
    }
    Ok(drafts)
}

async fn cmd_list(args: ListArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let storage = open_storage(&cfg)?;
    let store = load_store(&storage)?;

    let spec = FilterSpec {
        status: args.status.as_deref().map(TaskStatus::parse).transpose()?,
        owners: args.owners,
        contains: args.contains,
        updated_from: args.updated_from.as_deref().map(dates::parse_date).transpose()?,
        updated_to: args.updated_to.as_deref().map(dates::parse_date).transpose()?,
    };

    let records: Vec<&TaskRecord> = store.filter(&spec).collect();

    if args.json {
        let mut out = serde_json::to_string_pretty(&records)?;
        out.push('\n');
        print!("{out}");
        return Ok(ExitCode::SUCCESS);
    }

    let table = task_table(&cfg, records.iter().copied(), args.verbose);
    if let Some(path) = args.output {
        table.write_csv_to_path(&path)?;
        println!("Wrote {} records to {}", records.len(), path.display());
    } else if args.csv {
        table.write_csv()?;
    } else {
        table.print()?;
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_update(args: UpdateArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let storage = open_storage(&cfg)?;
    let audit = open_audit(&cfg)?;
    let mut store = load_store(&storage)?;
    let ts = now();

    let changes = TaskChanges {
        description: args.description,
        status: args.status.as_deref().map(TaskStatus::parse).transpose()?,
        owner: args.owner,
        next_action: args.next_action,
        notes: args.notes,
        source: args.source,
    };

    let before = store
        .get(&args.id)
        .cloned()
        .ok_or_else(|| TaskboardError::NotFound(args.id.clone()))?;
    let after = store.update(&args.id, changes, ts)?.clone();
    storage.save(store.records())?;
    audit.append(AuditAction::Update, &args.id, Some(&before), Some(&after), ts)?;

    let table = task_table(&cfg, std::iter::once(&after), true);
    table.print()?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_close(args: CloseArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let storage = open_storage(&cfg)?;
    let audit = open_audit(&cfg)?;
    let mut store = load_store(&storage)?;
    let ts = now();

    close_and_persist(&storage, &audit, &mut store, &args.ids, ts)?;
    println!("Closed {} task(s)", args.ids.len());
    Ok(ExitCode::SUCCESS)
}

fn close_and_persist(
    storage: &CsvBoard,
    audit: &AuditLog,
    store: &mut TaskStore,
    ids: &[String],
    ts: OffsetDateTime,
) -> anyhow::Result<()> {
    let befores: Vec<TaskRecord> = ids
        .iter()
        .map(|id| {
            store
                .get(id)
                .cloned()
                .ok_or_else(|| TaskboardError::NotFound(id.clone()))
        })
        .collect::<Result<_, _>>()?;

    store.close_many(ids, ts)?;
    storage.save(store.records())?;

    for before in &befores {
        audit.append(
            AuditAction::Close,
            &before.id,
            Some(before),
            store.get(&before.id),
            ts,
        )?;
    }
    Ok(())
}

async fn cmd_candidates(args: CandidatesArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let storage = open_storage(&cfg)?;
    let mut store = load_store(&storage)?;
    let ts = now();

    let mut policy = CandidatePolicy::from_config(&cfg.heuristic);
    if let Some(days) = args.stale_days {
        policy.stale_days = days;
    }
    if !args.keywords.is_empty() {
        policy.keywords = args.keywords.clone();
    }

    let candidates = store.close_candidates(&policy, ts);

    if args.json {
        let mut out = serde_json::to_string_pretty(&candidates)?;
        out.push('\n');
        print!("{out}");
        return Ok(ExitCode::SUCCESS);
    }

    if candidates.is_empty() {
        println!("No close candidates.");
        return Ok(ExitCode::SUCCESS);
    }

    if !args.close {
        let table = candidate_table(&cfg, &candidates, ts);
        if args.csv {
            table.write_csv()?;
        } else {
            table.print()?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    // Interactive close: Tab-mark candidates, Enter applies.
    let items: Vec<PickerItem> = candidates
        .iter()
        .map(|r| candidate_picker_item(&cfg, r, ts))
        .collect();
    let indices = picker::pick_many("Close candidates", &items)?;
    let ids: Vec<String> = indices
        .into_iter()
        .map(|i| candidates[i].id.clone())
        .collect();
    if ids.is_empty() {
        println!("Nothing selected.");
        return Ok(ExitCode::SUCCESS);
    }

    let audit = open_audit(&cfg)?;
    close_and_persist(&storage, &audit, &mut store, &ids, ts)?;
    println!("Closed {} task(s)", ids.len());
    Ok(ExitCode::SUCCESS)
}

fn candidate_picker_item(cfg: &config::Config, r: &TaskRecord, ts: OffsetDateTime) -> PickerItem {
    let stale = dates::staleness_days(ts.date(), r.updated_at.date());
    PickerItem {
        title: format!("{} / {} / {}d stale", truncate(&r.description, 48), r.owner, stale),
        preview: format!(
            "Description: {}\nOwner: {}\nNext action: {}\nNotes: {}\nSource: {}\nUpdated: {}\nCreated: {}",
            r.description,
            r.owner,
            r.next_action,
            r.notes,
            r.source,
            fmt_stamp(cfg, r.updated_at),
            fmt_stamp(cfg, r.created_at),
        ),
    }
}

async fn cmd_remove(args: RemoveArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let storage = open_storage(&cfg)?;
    let audit = open_audit(&cfg)?;
    let mut store = load_store(&storage)?;
    let ts = now();

    let ids: Vec<String> = if args.interactive {
        if !args.ids.is_empty() {
            anyhow::bail!("cannot specify ids with -i flag");
        }
        if store.is_empty() {
            println!("No tasks.");
            return Ok(ExitCode::SUCCESS);
        }
        let items: Vec<PickerItem> = store
            .records()
            .iter()
            .map(|r| PickerItem {
                title: format!(
                    "[{}] {} / {}",
                    r.status,
                    truncate(&r.description, 48),
                    r.owner
                ),
                preview: format!(
                    "Description: {}\nStatus: {}\nOwner: {}\nUpdated: {}",
                    r.description,
                    r.status,
                    r.owner,
                    fmt_stamp(&cfg, r.updated_at),
                ),
            })
            .collect();
        let indices = picker::pick_many("Delete tasks", &items)?;
        indices
            .into_iter()
            .map(|i| store.records()[i].id.clone())
            .collect()
    } else {
        if args.ids.is_empty() {
            anyhow::bail!("no ids given (use -i for interactive selection)");
        }
        if !args.force {
            anyhow::bail!("removal is permanent; re-run with --force (or use -i)");
        }
        args.ids
    };

    let removed = store.remove_many(&ids)?;
    storage.save(store.records())?;

    let action = if removed.len() > 1 {
        AuditAction::RemoveBulk
    } else {
        AuditAction::Remove
    };
    for record in &removed {
        audit.append(action, &record.id, Some(record), None, ts)?;
    }

    println!("Removed {} task(s)", removed.len());
    Ok(ExitCode::SUCCESS)
}

async fn cmd_summary(args: SummaryArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let storage = open_storage(&cfg)?;
    let store = load_store(&storage)?;
    let policy = CandidatePolicy::from_config(&cfg.heuristic);
    let summary = store.summary(&policy);

    if args.json {
        let mut out = serde_json::to_string_pretty(&summary)?;
        out.push('\n');
        print!("{out}");
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new(["TOTAL", "OPEN", "IN-PROGRESS", "CLOSED", "WAITING-REPLY"]);
    table.row([
        summary.total.to_string(),
        summary.open.to_string(),
        summary.in_progress.to_string(),
        summary.closed.to_string(),
        summary.waiting_reply.to_string(),
    ]);
    table.print()?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_audit(args: AuditArgs) -> anyhow::Result<ExitCode> {
    let cfg = load_cfg().await?;
    let audit = open_audit(&cfg)?;
    let entries = audit.read_recent(args.limit)?;

    if args.json {
        let mut out = serde_json::to_string_pretty(&entries)?;
        out.push('\n');
        print!("{out}");
        return Ok(ExitCode::SUCCESS);
    }

    if entries.is_empty() {
        println!("No audit entries.");
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = Table::new(["TIME", "USER", "ACTION", "TASK"]);
    for entry in &entries {
        table.row([
            entry.ts.clone(),
            entry.user.clone(),
            entry.action.clone(),
            entry.task_id.clone(),
        ]);
    }
    table.print()?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_version() -> ExitCode {
    println!("taskboard version {}", env!("CARGO_PKG_VERSION"));
    if let Some(commit) = option_env!("TASKBOARD_GIT_COMMIT") {
        println!("  commit: {commit}");
    }
    if let Some(date) = option_env!("TASKBOARD_BUILD_DATE") {
        println!("  built: {date}");
    }
    println!("  rust: {}", rustc_version_runtime::version());
    println!(
        "  os/arch: {}/{}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    ExitCode::SUCCESS
}

fn fmt_stamp(cfg: &config::Config, ts: OffsetDateTime) -> String {
    dates::format_stamp(ts, cfg.board.save_with_time)
}

fn task_table<'a>(
    cfg: &config::Config,
    records: impl Iterator<Item = &'a TaskRecord>,
    verbose: bool,
) -> Table {
    let mut table = if verbose {
        Table::new([
            "UPDATED",
            "CREATED",
            "STATUS",
            "DESCRIPTION",
            "OWNER",
            "NEXT ACTION",
            "NOTES",
            "SOURCE",
            "ID",
        ])
    } else {
        Table::new(["UPDATED", "STATUS", "DESCRIPTION", "OWNER", "NEXT ACTION", "ID"])
    };

    for r in records {
        if verbose {
            table.row([
                fmt_stamp(cfg, r.updated_at),
                fmt_stamp(cfg, r.created_at),
                r.status.as_str().to_owned(),
                r.description.clone(),
                r.owner.clone(),
                r.next_action.clone(),
                r.notes.clone(),
                r.source.clone(),
                r.id.clone(),
            ]);
        } else {
            table.row([
                fmt_stamp(cfg, r.updated_at),
                r.status.as_str().to_owned(),
                truncate(&r.description, 60),
                r.owner.clone(),
                truncate(&r.next_action, 40),
                r.id.clone(),
            ]);
        }
    }
    table
}

fn candidate_table(cfg: &config::Config, candidates: &[&TaskRecord], ts: OffsetDateTime) -> Table {
    let mut table = Table::new(["UPDATED", "STALE", "DESCRIPTION", "OWNER", "NEXT ACTION", "ID"]);
    for r in candidates {
        let stale = dates::staleness_days(ts.date(), r.updated_at.date());
        table.row([
            fmt_stamp(cfg, r.updated_at),
            format!("{stale}d"),
            truncate(&r.description, 60),
            r.owner.clone(),
            truncate(&r.next_action, 40),
            r.id.clone(),
        ]);
    }
    table
}

fn truncate(s: &str, max: usize) -> String {
    let mut out: String = s.chars().take(max).collect();
    if s.chars().count() > max {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_file_parses_with_defaults() {
        let yaml = r#"
version: "1.0"
tasks:
  - description: ベンダーへ見積依頼
    status: in-progress
    owner: 都筑
  - description: follow up licensing
"#;
        let def: DraftFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.tasks.len(), 2);
        assert_eq!(def.tasks[1].status, "");

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("drafts.yaml");
        std::fs::write(&path, yaml).unwrap();
        let drafts = drafts_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(drafts[0].owner, "都筑");
        assert_eq!(drafts[1].status, TaskStatus::InProgress);
    }

    #[test]
    fn draft_file_rejects_unknown_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("drafts.yaml");
        std::fs::write(&path, "version: \"2.0\"\ntasks: []\n").unwrap();
        assert!(drafts_from_file(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn truncate_appends_ellipsis_only_when_needed() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("0123456789abc", 10), "0123456789...");
    }
}
