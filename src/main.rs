use anyhow::{Context, Result};
use bookledger::models::LEDGER_COLUMNS;
use bookledger::{
  http_search, is_blank_query, BookCandidate, Config, HttpFetcher, LedgerRow, Session, SqliteLedger,
  User, UserDirectory,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bookledger", version, about = "Search book catalogs and keep a shared lending ledger")]
struct Cli {
  /// TOML config file
  #[arg(long, env = "BOOKLEDGER_CONFIG", global = true)]
  config: Option<PathBuf>,

  /// Ledger database file (overrides config)
  #[arg(long, global = true)]
  db: Option<PathBuf>,

  #[arg(long, env = "BOOKLEDGER_USER", global = true)]
  user: Option<String>,

  #[arg(long, env = "BOOKLEDGER_PASSWORD", global = true, hide_env_values = true)]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Search both catalogs and print the ordered candidates
  Search {
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
    /// Print candidates as JSON
    #[arg(long)]
    json: bool,
  },
  /// Create a user with --user and --password
  Register,
  /// Search and add the picked candidate to your library
  Add {
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
    /// 1-based candidate number from the search results
    #[arg(long, default_value_t = 1)]
    pick: usize,
  },
  /// List your library
  List {
    /// Print tab-separated ledger columns instead of a summary
    #[arg(long)]
    tsv: bool,
  },
  /// Lend a book (row id or list position)
  Lend {
    row: String,
    borrower: String,
    #[arg(long, value_parser = parse_date)]
    due: NaiveDate,
  },
  /// Mark a lent book as returned
  Return { row: String },
  /// Start reading a book
  Read { row: String },
  /// Record reading progress in percent
  Progress { row: String, percent: u32 },
  /// Mark a book as not available
  Unavailable { row: String },
  /// List loans past their due date
  Overdue,
  /// Delete a book from your library
  Remove { row: String },
}

fn main() -> Result<()> {
  let _ = dotenvy::dotenv();
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
  if let Some(db) = &cli.db {
    config.database_path = db.clone();
  }

  match &cli.command {
    Command::Search { query, json } => {
      let query = query.join(" ");
      if is_blank_query(&query) {
        println!("Enter a search term.");
        return Ok(());
      }
      let fetcher = HttpFetcher::new(&config).context("failed to build HTTP client")?;
      let engine = http_search(&fetcher, &config);
      let candidates = engine.hybrid_search(&query);
      if *json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
      } else {
        print_candidates(&candidates);
      }
    }
    Command::Register => {
      let (username, password) = credentials(&cli)?;
      let users = UserDirectory::open(&config.database_path)?;
      let user = users.register(&username, &password)?;
      println!("Registered {}.", user.username);
    }
    command => {
      let user = login(&cli, &config)?;
      let ledger = SqliteLedger::open(&config.database_path)?;
      run_owned(command, Session::new(user), &ledger, &config)?;
    }
  }

  Ok(())
}

fn run_owned(command: &Command, mut session: Session, ledger: &SqliteLedger, config: &Config) -> Result<()> {
  match command {
    Command::Add { query, pick } => {
      let fetcher = HttpFetcher::new(config).context("failed to build HTTP client")?;
      let engine = http_search(&fetcher, config);
      let candidates = session.search(&engine, &query.join(" "))?;
      if candidates.is_empty() {
        println!("No matches in either catalog.");
        return Ok(());
      }
      print_candidates(candidates);
      let index = pick.checked_sub(1).context("--pick starts at 1")?;
      let row = session.confirm_add(ledger, index)?;
      println!("Added \"{}\" to your library.", row.title);
    }
    Command::List { tsv: true } => {
      let header: Vec<&str> = LEDGER_COLUMNS.iter().map(|column| column.name()).collect();
      println!("id\t{}", header.join("\t"));
      for row in session.library(ledger)? {
        println!("{}\t{}", row.id, row.fields().join("\t"));
      }
    }
    Command::List { tsv: false } => {
      let rows = session.library(ledger)?;
      if rows.is_empty() {
        println!("{}'s library is empty.", session.user().username);
      }
      for (position, row) in rows.iter().enumerate() {
        print_row(position + 1, row);
      }
    }
    Command::Lend { row, borrower, due } => {
      let target = session.resolve_row(ledger, row)?;
      let updated = session.loan_desk(ledger).lend(&target.id, borrower, *due)?;
      println!("Lent \"{}\" to {} until {}.", updated.title, updated.borrower, due);
    }
    Command::Return { row } => {
      let target = session.resolve_row(ledger, row)?;
      let updated = session.loan_desk(ledger).return_book(&target.id)?;
      println!("\"{}\" is back on the shelf.", updated.title);
    }
    Command::Read { row } => {
      let target = session.resolve_row(ledger, row)?;
      let updated = session.loan_desk(ledger).start_reading(&target.id)?;
      println!("Reading \"{}\" ({}).", updated.title, updated.reading_progress);
    }
    Command::Progress { row, percent } => {
      let target = session.resolve_row(ledger, row)?;
      let updated = session.loan_desk(ledger).set_progress(&target.id, *percent)?;
      println!("\"{}\": {} ({}).", updated.title, updated.reading_progress, updated.status);
    }
    Command::Unavailable { row } => {
      let target = session.resolve_row(ledger, row)?;
      let updated = session.loan_desk(ledger).mark_unavailable(&target.id)?;
      println!("\"{}\" marked {}.", updated.title, updated.status);
    }
    Command::Overdue => {
      let today = chrono::Local::now().date_naive();
      let rows = session.loan_desk(ledger).overdue(today)?;
      if rows.is_empty() {
        println!("Nothing is overdue.");
      }
      for (position, row) in rows.iter().enumerate() {
        print_row(position + 1, row);
      }
    }
    Command::Remove { row } => {
      let target = session.resolve_row(ledger, row)?;
      session.loan_desk(ledger).remove(&target.id)?;
      println!("Removed \"{}\".", target.title);
    }
    Command::Search { .. } | Command::Register => {}
  }
  Ok(())
}

fn credentials(cli: &Cli) -> Result<(String, String)> {
  let username = cli.user.clone().context("--user (or BOOKLEDGER_USER) is required")?;
  let password = cli
    .password
    .clone()
    .context("--password (or BOOKLEDGER_PASSWORD) is required")?;
  Ok((username, password))
}

fn login(cli: &Cli, config: &Config) -> Result<User> {
  let (username, password) = credentials(cli)?;
  let users = UserDirectory::open(&config.database_path)?;
  Ok(users.authenticate(&username, &password)?)
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
  NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
    .map_err(|err| format!("expected YYYY-MM-DD: {}", err))
}

fn print_candidates(candidates: &[BookCandidate]) {
  if candidates.is_empty() {
    println!("No matches in either catalog.");
    return;
  }
  for (position, book) in candidates.iter().enumerate() {
    let year = if book.published_year().is_empty() {
      String::new()
    } else {
      format!(" ({})", book.published_year())
    };
    println!(
      "{:>2}. {} by {}{} [{}] isbn={}{}",
      position + 1,
      book.title(),
      book.author(),
      year,
      book.source_name(),
      book.isbn13(),
      if book.has_cover() { " +cover" } else { "" }
    );
  }
}

fn print_row(position: usize, row: &LedgerRow) {
  let mut details = vec![row.status.to_string()];
  if !row.borrower.is_empty() {
    details.push(format!("borrower {}", row.borrower));
  }
  if let Some(due) = row.due_date {
    details.push(format!("due {}", due));
  }
  if !row.reading_progress.is_empty() {
    details.push(format!("progress {}", row.reading_progress));
  }
  println!(
    "{:>3}. {} by {} ({}) id={}",
    position,
    row.title,
    row.author,
    details.join(", "),
    row.id
  );
}
