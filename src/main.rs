use std::fs;
use std::io::Stdout;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::unbounded;
use crossterm::cursor;
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::backend::CrosstermBackend;
use ratatui::{Terminal, TerminalOptions, Viewport};

mod chats;
mod cmd;
mod crypto;
mod history;
mod input;
mod logging;
mod plugins;
mod prefs;
mod proto;
mod reminder;
mod session;
mod ui;

use chats::ChatRegistry;
use cmd::CommandSet;
use crypto::CryptoSessions;
use history::HistoryStore;
use input::{InputBuffer, TermInput};
use plugins::PluginManager;
use prefs::Prefs;
use proto::LoopbackProto;
use reminder::Reminder;
use session::{Ports, Session};
use ui::TermUi;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Composer and status rows; transcript lives above in scrollback.
const INLINE_HEIGHT: u16 = 2;
const RECALL_LIMIT: usize = 200;

/// Poison-tolerant lock: the loop is single-threaded, so a poisoned mutex
/// only means a previous tick panicked mid-update. Carry on with the data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct CliArgs {
    account: Option<String>,
    log_level: String,
}

fn main() -> Result<()> {
    let args = parse_args();

    // The command surface is the only way out of the session; a signal must
    // not kill the process mid-tick with protocol state half-mutated.
    ignore_signals();

    let data_dir = data_dir();
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("create data dir {}", data_dir.display()))?;
    logging::init(&args.log_level, &data_dir.join("logs"))?;
    tracing::info!(version = APP_VERSION, "starting confab");

    let prefs = Prefs::load(&data_dir.join("prefs.json"))?;
    let history = HistoryStore::open(&data_dir.join("history.db"))?;
    let recall = history.recent(RECALL_LIMIT).unwrap_or_default();

    let terminal = setup_terminal()?;
    let result = run(args.account, prefs, history, recall, terminal);
    restore_terminal()?;
    result
}

fn run(
    account: Option<String>,
    prefs: Prefs,
    history: HistoryStore,
    recall: Vec<String>,
    terminal: Terminal<CrosstermBackend<Stdout>>,
) -> Result<()> {
    let (note_tx, note_rx) = unbounded();
    let buffer = Arc::new(Mutex::new(InputBuffer::default()));

    let ui = TermUi::new(terminal, buffer.clone(), note_rx);
    let proto = Arc::new(Mutex::new(LoopbackProto::new(note_tx.clone())));
    let chats = Arc::new(Mutex::new(ChatRegistry::new(proto.clone())));
    let crypto = Arc::new(Mutex::new(CryptoSessions::new(note_tx.clone())));
    let commands = CommandSet::new(proto.clone(), chats.clone(), crypto.clone(), note_tx.clone());
    let reminder = Reminder::new(
        note_tx,
        (prefs.remind_secs > 0).then(|| Duration::from_secs(prefs.remind_secs)),
    );
    let input = TermInput::new(buffer, Duration::from_millis(prefs.poll_ms.max(1)), recall);

    let ports = Ports {
        input: Box::new(input),
        proto: Box::new(proto),
        prefs: Box::new(prefs),
        commands: Box::new(commands),
        plugins: Box::new(PluginManager::new()),
        crypto: Box::new(crypto),
        reminder: Box::new(reminder),
        chats: Box::new(chats),
        history: Box::new(history),
        ui: Box::new(ui),
    };

    Session::new(ports, account).run()
}

fn parse_args() -> CliArgs {
    let mut account = None;
    let mut log_level = "info".to_string();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("confab {}", APP_VERSION);
                std::process::exit(0);
            }
            "--log-level" => match args.next() {
                Some(level) => log_level = level,
                None => {
                    eprintln!("--log-level needs a value");
                    std::process::exit(2);
                }
            },
            flag if flag.starts_with('-') => {
                eprintln!("unknown argument: {}", flag);
                std::process::exit(2);
            }
            positional => {
                account = Some(positional.to_string());
            }
        }
    }

    CliArgs { account, log_level }
}

fn ignore_signals() {
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_IGN);
        libc::signal(libc::SIGTSTP, libc::SIG_IGN);
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

fn data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".confab")
    } else {
        PathBuf::from(".confab")
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    // ratatui::Terminal::insert_before requires at least one line above the
    // viewport. If cursor starts at row 0, move to row 1 first.
    if matches!(cursor::position(), Ok((_, 0))) {
        println!();
    }

    enable_raw_mode().context("enable raw mode")?;
    crossterm::execute!(std::io::stdout(), EnableBracketedPaste).ok();

    let terminal = Terminal::with_options(
        CrosstermBackend::new(std::io::stdout()),
        TerminalOptions {
            viewport: Viewport::Inline(INLINE_HEIGHT),
        },
    )
    .context("create terminal")?;

    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    crossterm::execute!(std::io::stdout(), DisableBracketedPaste).ok();
    disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(std::io::stdout(), cursor::Show).ok();
    println!();
    Ok(())
}
