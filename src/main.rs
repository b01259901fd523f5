use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
    tty::IsTty,
};
use std::{
    error::Error,
    io::stdin,
    time::{Duration, SystemTime},
};
use time_humanize::{Accuracy, HumanTime, Tense};

use typr::classifier::{self, Outcome};
use typr::runtime::{CrosstermEventSource, Event, FixedTicker, Runner};
use typr::session::{FinalResult, Session, SessionConfig, Status, TestBound};
use typr::store::{ResultStore, SessionLog, SessionRecord, SqliteStore};
use typr::words::{BankSource, Difficulty, WordSource};

const TICK_RATE_MS: u64 = 100;
/// How many weak characters seed a practice stream.
const PRACTICE_CHARS: usize = 5;

/// word-by-word typing test with live metrics and weak-key practice
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A word-by-word typing test: live wpm and accuracy while you type, \
a per-character error profile saved locally, and a practice mode that biases \
new words toward the characters you miss most."
)]
pub struct Cli {
    /// number of words to use in test
    #[clap(short = 'w', long, default_value_t = 25)]
    number_of_words: usize,

    /// number of seconds to run test (timed mode; the stream grows as needed)
    #[clap(short = 's', long)]
    number_of_secs: Option<usize>,

    /// word-length band to draw from
    #[clap(short = 'd', long, value_enum, default_value_t = Difficulty::Medium)]
    difficulty: Difficulty,

    /// sprinkle capitalization and trailing punctuation over the stream
    #[clap(long)]
    punctuation: bool,

    /// practice mode: synthesize words around your most-missed characters
    #[clap(long)]
    practice: bool,

    /// user name recorded with saved results
    #[clap(short = 'u', long, default_value = "guest")]
    user: String,

    /// print your recent sessions and exit
    #[clap(long)]
    history: bool,

    /// print the leaderboard and exit
    #[clap(long)]
    leaderboard: bool,
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        let bound = match self.number_of_secs {
            Some(secs) => TestBound::Seconds(secs as f64),
            None => TestBound::Words(self.number_of_words),
        };
        SessionConfig {
            bound,
            difficulty: self.difficulty,
            punctuation: self.punctuation,
            ..SessionConfig::default()
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.history {
        return print_history(&cli.user);
    }
    if cli.leaderboard {
        return print_leaderboard();
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let source: Box<dyn WordSource> = Box::new(BankSource::english());
    let mut session = if cli.practice {
        let error_chars = stored_error_characters(&cli.user);
        Session::new_practice(cli.session_config(), source, &error_chars)
    } else {
        Session::new(cli.session_config(), source)
    };

    print_prompt(&session);

    enable_raw_mode()?;
    let outcome = run_session(&mut session, cli.number_of_secs);
    disable_raw_mode()?;

    match outcome? {
        Some(result) => {
            print_results(&result);
            persist(&cli.user, &result);
        }
        None => println!("aborted."),
    }
    Ok(())
}

/// Weak-key profile for practice mode; an unreadable store just means a
/// generic practice stream.
fn stored_error_characters(user: &str) -> Vec<char> {
    match SqliteStore::new().and_then(|store| store.error_characters(user, PRACTICE_CHARS)) {
        Ok(chars) => chars,
        Err(e) => {
            eprintln!("warning: could not load error profile: {e}");
            Vec::new()
        }
    }
}

fn print_prompt(session: &Session) {
    println!();
    for chunk in session.words().chunks(10) {
        println!("  {}", chunk.join(" "));
    }
    println!();
    println!("type the words above, space commits a word, Esc aborts.");
    println!();
}

fn run_session(
    session: &mut Session,
    number_of_secs: Option<usize>,
) -> Result<Option<FinalResult>, Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut seconds_remaining = number_of_secs.map(|s| s as f64);

    loop {
        match runner.step() {
            Event::Tick => {
                // The countdown runs only while the session is live.
                if session.status() == Status::Active {
                    if let Some(remaining) = seconds_remaining.as_mut() {
                        *remaining -= TICK_RATE_MS as f64 / 1000.0;
                        if *remaining <= 0.0 {
                            session.on_timer_expired();
                        }
                    }
                }
            }
            Event::Key(key) => {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                match key.code {
                    KeyCode::Esc => return Ok(None),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(None);
                    }
                    KeyCode::Backspace => session.on_backspace(),
                    KeyCode::Char(c) => {
                        let mut value = session.current_input().to_string();
                        value.push(c);
                        feedback(session, &value);
                        session.on_input(&value);
                    }
                    _ => {}
                }
            }
        }

        if session.status() == Status::Complete {
            return Ok(session.final_result());
        }
    }
}

/// Live per-keystroke verdict; kept to a bell on a miss so raw mode stays
/// readable.
fn feedback(session: &Session, value: &str) {
    if value.ends_with(' ') {
        return;
    }
    let target = session.target_word(session.current_word_index());
    let position = value.chars().count().saturating_sub(1);
    if classifier::classify(target, value, position) == Outcome::Incorrect {
        eprint!("\x07");
    }
}

fn print_results(result: &FinalResult) {
    println!();
    println!("wpm        {:>8.1}", result.wpm);
    println!("raw wpm    {:>8.1}", result.raw_wpm);
    println!("accuracy   {:>7.0}%", result.accuracy);
    println!("characters {:>8}", result.characters_typed);
    println!("errors     {:>8}", result.error_count);
    println!("duration   {:>7.1}s", result.test_duration_seconds);

    let worst = result.error_map.by_count_desc();
    if !worst.is_empty() {
        let listing = worst
            .iter()
            .take(PRACTICE_CHARS)
            .map(|(c, n)| format!("{c}:{n}"))
            .collect::<Vec<_>>()
            .join("  ");
        println!("missed     {listing}");
    }
}

/// Result handoff to storage. Fires once per completed session; failures are
/// reported and dropped so the shown results are never affected.
fn persist(user: &str, result: &FinalResult) {
    let record = SessionRecord::from_result(user, result);

    match SqliteStore::new() {
        Ok(mut store) => {
            if let Err(e) = store.save_session_result(&record) {
                eprintln!("warning: could not save session: {e}");
            }
        }
        Err(e) => eprintln!("warning: could not open history store: {e}"),
    }

    if let Err(e) = SessionLog::new().append(&record) {
        eprintln!("warning: could not append session log: {e}");
    }
}

fn print_history(user: &str) -> Result<(), Box<dyn Error>> {
    let store = SqliteStore::new()?;
    let history = store.user_history(user)?;

    if history.is_empty() {
        println!("no sessions recorded for {user} yet.");
        return Ok(());
    }

    println!("{:<18} {:>7} {:>9} {:>10}  when", "user", "wpm", "accuracy", "duration");
    for record in history {
        let ago = SystemTime::now()
            .duration_since(SystemTime::from(record.timestamp))
            .unwrap_or_default();
        println!(
            "{:<18} {:>7.1} {:>8.0}% {:>9.1}s  {}",
            record.user,
            record.wpm,
            record.accuracy,
            record.duration_secs,
            HumanTime::from(ago).to_text_en(Accuracy::Rough, Tense::Past),
        );
    }
    Ok(())
}

fn print_leaderboard() -> Result<(), Box<dyn Error>> {
    let store = SqliteStore::new()?;
    let board = store.leaderboard(10)?;

    if board.is_empty() {
        println!("no sessions recorded yet.");
        return Ok(());
    }

    for (rank, entry) in board.iter().enumerate() {
        println!(
            "{:>2}. {:<18} {:>7.1} wpm {:>8.0}%",
            rank + 1,
            entry.user,
            entry.wpm,
            entry.accuracy,
        );
    }
    Ok(())
}
