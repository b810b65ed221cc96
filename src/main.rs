//! CLI entry point for `maildirshell`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use maildirshell::config::{self, Config, LOG_FILE_NAME};
use maildirshell::model::flags::Flags;
use maildirshell::model::message::Message;
use maildirshell::parser::header;
use maildirshell::render::html::PlainHtml;
use maildirshell::render::listing::{format_row, list_rows};
use maildirshell::status::{StatusSink, TracingStatus};
use maildirshell::store::body::{BodyView, MessageBody};
use maildirshell::store::maildir::{LoadMode, Maildir};
use maildirshell::store::monitor::{KnownMaildirs, POLL_INTERVAL};

#[derive(Parser)]
#[command(
    name = "maildirshell",
    version,
    about = "Read and manage Maildir mailboxes from the terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List the messages of a maildir
    List {
        /// Maildir root (defaults to the first configured maildir)
        maildir: Option<PathBuf>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Do not read message headers
        #[arg(long)]
        passive: bool,
        /// Newest first
        #[arg(long)]
        sort_date: bool,
    },
    /// Print the readable content of a message file
    Read { file: PathBuf },
    /// Print the MIME structure of a message file
    Tree { file: PathBuf },
    /// Set or clear flags on one message and write the change to disk
    Flag {
        maildir: PathBuf,
        index: usize,
        /// Flag letters among P R S T D F, e.g. `SF`
        flags: String,
        /// Clear the flags instead of setting them
        #[arg(long)]
        off: bool,
    },
    /// Promote new mail and write pending flag changes
    Apply { maildir: Option<PathBuf> },
    /// Report new mail as it arrives, until interrupted
    Watch {
        maildirs: Vec<PathBuf>,
        /// Send new-mail notices to the log instead of stdout
        #[arg(long)]
        log: bool,
    },
    /// Show message counts and sizes
    Stats {
        maildirs: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Show where configuration and logs live
    Config {
        /// Write the current settings to the config file
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::List {
            maildir,
            json,
            passive,
            sort_date,
        } => cmd_list(&resolve_maildir(maildir, &config)?, json, passive, sort_date, &config),
        Commands::Read { file } => cmd_read(&file, &config),
        Commands::Tree { file } => cmd_tree(&file, &config),
        Commands::Flag {
            maildir,
            index,
            flags,
            off,
        } => cmd_flag(&maildir, index, &flags, off),
        Commands::Apply { maildir } => cmd_apply(&resolve_maildir(maildir, &config)?),
        Commands::Watch { maildirs, log } => cmd_watch(resolve_maildirs(maildirs, &config)?, log),
        Commands::Stats { maildirs, json } => cmd_stats(&resolve_maildirs(maildirs, &config)?, json),
        Commands::Config { init } => cmd_config(&config, init),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn resolve_maildir(arg: Option<PathBuf>, config: &Config) -> anyhow::Result<PathBuf> {
    arg.or_else(|| config.mailboxes.maildirs.first().cloned())
        .ok_or_else(|| anyhow::anyhow!("No maildir given and none configured in [mailboxes]"))
}

fn resolve_maildirs(args: Vec<PathBuf>, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let paths = if args.is_empty() {
        config.mailboxes.maildirs.clone()
    } else {
        args
    };
    if paths.is_empty() {
        anyhow::bail!("No maildir given and none configured in [mailboxes]");
    }
    Ok(paths)
}

/// Open a maildir with a progress bar over the `cur/` scan.
fn open_with_bar(path: &Path, mode: LoadMode) -> anyhow::Result<Maildir> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Reading messages [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("#>-"),
    );
    let maildir = Maildir::open_with_progress(
        path,
        mode,
        Some(&|done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        }),
    )?;
    pb.finish_and_clear();
    Ok(maildir)
}

fn cmd_list(
    path: &Path,
    json: bool,
    passive: bool,
    sort_date: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let mode = if passive {
        LoadMode::Passive
    } else {
        LoadMode::Active
    };
    let mut maildir = open_with_bar(path, mode)?;
    if sort_date {
        maildir.sort_by_date();
    }
    let rows = list_rows(maildir.messages());

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &rows)?;
        writeln!(out)?;
    } else {
        let widths = config.display.list_widths();
        for row in &rows {
            writeln!(out, "{}", format_row(row, widths))?;
        }
    }
    Ok(())
}

fn cmd_read(file: &Path, config: &Config) -> anyhow::Result<()> {
    let envelope = header::read_envelope(file)?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "Subject: {}", envelope.subject)?;
    writeln!(out, "From: {}", envelope.from)?;
    writeln!(out, "To: {}", envelope.to)?;
    if !envelope.cc.is_empty() {
        writeln!(out, "Cc: {}", envelope.cc)?;
    }
    if let Some(date) = envelope.date {
        writeln!(out, "Date: {}", date.to_rfc2822())?;
    }
    writeln!(out)?;

    let mut body = MessageBody::new(file, BodyView::Text)
        .with_max_depth(config.display.max_depth)
        .with_html(PlainHtml {
            width: config.display.html_width,
        });
    std::io::copy(&mut body, &mut out)?;
    Ok(())
}

fn cmd_tree(file: &Path, config: &Config) -> anyhow::Result<()> {
    let mut body =
        MessageBody::new(file, BodyView::Structure).with_max_depth(config.display.max_depth);
    std::io::copy(&mut body, &mut std::io::stdout().lock())?;
    Ok(())
}

fn cmd_flag(path: &Path, index: usize, letters: &str, off: bool) -> anyhow::Result<()> {
    let flags = Flags::from_suffix(&letters.to_ascii_uppercase());
    if flags.is_empty() {
        anyhow::bail!("No known flag in '{letters}' (expected letters among PRSTDF)");
    }
    let mut maildir = Maildir::open(path, LoadMode::Passive)?;
    let Some(now) = maildir.set_flag(index, flags, !off) else {
        anyhow::bail!("No message {index} in {} ({} messages)", path.display(), maildir.len());
    };
    let summary = maildir.apply_changes()?;
    println!(
        "Message {index}: [{}] ({} renamed, {} removed)",
        now.persisted().to_suffix(),
        summary.renamed,
        summary.removed
    );
    Ok(())
}

fn cmd_apply(path: &Path) -> anyhow::Result<()> {
    let mut maildir = Maildir::open(path, LoadMode::Passive)?;
    let promoted = maildir.promote_new()?;
    let summary = maildir.apply_changes()?;
    println!(
        "{}: {} messages, {} renamed, {} removed{}",
        path.display(),
        maildir.len(),
        summary.renamed,
        summary.removed,
        if promoted { ", new mail promoted" } else { "" }
    );
    Ok(())
}

/// Prints status lines to the terminal.
struct ConsoleStatus;

impl StatusSink for ConsoleStatus {
    fn status(&self, message: &str) {
        println!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("{message}");
    }
}

fn cmd_watch(paths: Vec<PathBuf>, log: bool) -> anyhow::Result<()> {
    let mut known = KnownMaildirs::from_paths(&paths)?;
    for count in known.counts() {
        println!(
            "Watching {} ({} messages, {} unread)",
            count.path.display(),
            count.total,
            count.unread
        );
    }
    known.start_monitors(POLL_INTERVAL)?;
    let sink: Box<dyn StatusSink> = if log {
        Box::new(TracingStatus)
    } else {
        Box::new(ConsoleStatus)
    };
    while let Ok(event) = known.events().recv() {
        event.report(sink.as_ref());
    }
    known.stop_monitors();
    Ok(())
}

#[derive(serde::Serialize)]
struct MaildirStats {
    path: PathBuf,
    total: usize,
    unread: usize,
    flagged: usize,
    trashed: usize,
    bytes: u64,
}

fn cmd_stats(paths: &[PathBuf], json: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut stats = Vec::with_capacity(paths.len());
    for path in paths {
        let maildir = Maildir::open(path, LoadMode::Passive)?;
        let count = |flag: Flags| {
            maildir
                .messages()
                .iter()
                .filter(|m: &&Message| m.flags.contains(flag))
                .count()
        };
        stats.push(MaildirStats {
            path: path.clone(),
            total: maildir.len(),
            unread: maildir.unread_count(),
            flagged: count(Flags::FLAGGED),
            trashed: count(Flags::TRASHED),
            bytes: maildir.disk_size()?,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    for s in &stats {
        println!("{}", s.path.display());
        println!("  Messages: {}", s.total);
        println!("  Unread:   {}", s.unread);
        println!("  Flagged:  {}", s.flagged);
        println!("  Trashed:  {}", s.trashed);
        println!("  Size:     {}", format_size(s.bytes, BINARY));
    }
    println!("Scanned in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    let path = config::config_file_path();
    if init {
        config::save_config(config)?;
    }
    match path {
        Some(path) if path.exists() => println!("Config:   {}", path.display()),
        Some(path) => println!("Config:   {} (not created, using defaults)", path.display()),
        None => println!("Config:   no config directory on this system"),
    }
    println!("Log file: {}", config::log_file_path(config).display());
    for path in &config.mailboxes.maildirs {
        println!("Maildir:  {}", path.display());
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "maildirshell", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let man = clap_mangen::Man::new(Cli::command());
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}
