use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

use crate::metrics;
use crate::words::{Difficulty, WordSource};

/// Unfinished-words threshold below which a timed session refills its stream.
const LOW_WATER_WORDS: usize = 10;
/// Words appended per refill.
const EXTEND_BATCH: usize = 20;
/// Stream length drawn up front for duration-bounded sessions.
const INITIAL_TIMED_WORDS: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    NotStarted,
    Active,
    Complete,
}

/// What ends the session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TestBound {
    Words(usize),
    Seconds(f64),
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub bound: TestBound,
    pub difficulty: Difficulty,
    pub punctuation: bool,
    /// Minimum ms between two accepted word commits; spaces inside the window
    /// are stripped without side effects (key-repeat guard).
    pub commit_debounce_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bound: TestBound::Words(25),
            difficulty: Difficulty::default(),
            punctuation: false,
            commit_debounce_ms: 100,
        }
    }
}

/// One character cell of a finalized word. `typed: None` is a character the
/// user never typed before committing; it is incorrect whenever the target
/// had a character there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommittedChar {
    pub word_index: usize,
    pub char_index: usize,
    pub typed: Option<char>,
    pub expected: Option<char>,
    pub correct: bool,
}

/// Mistype tally keyed by what was actually typed. Lookup of an unseen
/// character is zero, never an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap {
    counts: HashMap<char, u32>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, c: char) -> u32 {
        self.counts.get(&c).copied().unwrap_or(0)
    }

    pub fn record(&mut self, c: char) {
        *self.counts.entry(c).or_insert(0) += 1;
    }

    /// Reverse one `record`; used when committed history is truncated.
    fn unrecord(&mut self, c: char) {
        if let Some(n) = self.counts.get_mut(&c) {
            *n = n.saturating_sub(1);
            if *n == 0 {
                self.counts.remove(&c);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, u32)> + '_ {
        self.counts.iter().map(|(&c, &n)| (c, n))
    }

    /// Characters ordered worst-first, count ties broken by character for
    /// stable output.
    pub fn by_count_desc(&self) -> Vec<(char, u32)> {
        let mut entries: Vec<(char, u32)> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries
    }
}

/// Read-only projection for rendering; computing it never mutates the session.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub status: Status,
    pub current_word_index: usize,
    pub current_input: String,
    pub wpm: f64,
    pub raw_wpm: f64,
    pub accuracy: f64,
    pub time_per_char_ms: f64,
}

/// Metrics frozen at the moment of completion.
#[derive(Clone, Debug)]
pub struct FinalResult {
    pub wpm: f64,
    pub raw_wpm: f64,
    pub accuracy: f64,
    pub characters_typed: usize,
    pub error_count: usize,
    pub error_map: ErrorMap,
    pub test_duration_seconds: f64,
}

/// The typing-session state machine. All transitions are synchronous,
/// complete read-modify-writes; there is no observable intermediate state.
pub struct Session {
    config: SessionConfig,
    source: Box<dyn WordSource>,
    words: Vec<String>,
    current_word_index: usize,
    current_input: String,
    committed: Vec<CommittedChar>,
    error_count: usize,
    error_map: ErrorMap,
    status: Status,
    started_at: Option<SystemTime>,
    completed_at: Option<SystemTime>,
    last_commit_at: Option<SystemTime>,
    /// Set when the active word was re-entered via backspace; arms the
    /// auto-commit that fires once the word matches its target again.
    reentered: bool,
}

impl Session {
    pub fn new(config: SessionConfig, mut source: Box<dyn WordSource>) -> Self {
        let count = initial_word_count(&config);
        let words = source.generate(count, config.difficulty, config.punctuation);
        Self::with_words(config, source, words)
    }

    /// Practice variant: the stream is synthesized around the user's weakest
    /// characters instead of drawn from the bank.
    pub fn new_practice(
        config: SessionConfig,
        mut source: Box<dyn WordSource>,
        error_chars: &[char],
    ) -> Self {
        let count = initial_word_count(&config);
        let words = source.generate_practice(count, error_chars);
        Self::with_words(config, source, words)
    }

    fn with_words(config: SessionConfig, source: Box<dyn WordSource>, words: Vec<String>) -> Self {
        Self {
            config,
            source,
            words,
            current_word_index: 0,
            current_input: String::new(),
            committed: Vec::new(),
            error_count: 0,
            error_map: ErrorMap::new(),
            status: Status::NotStarted,
            started_at: None,
            completed_at: None,
            last_commit_at: None,
            reentered: false,
        }
    }

    /// Discard all state and redraw the stream. The only way back from
    /// `Active` or `Complete`.
    pub fn reset(&mut self) {
        let count = initial_word_count(&self.config);
        self.words = self
            .source
            .generate(count, self.config.difficulty, self.config.punctuation);
        self.current_word_index = 0;
        self.current_input.clear();
        self.committed.clear();
        self.error_count = 0;
        self.error_map = ErrorMap::new();
        self.status = Status::NotStarted;
        self.started_at = None;
        self.completed_at = None;
        self.last_commit_at = None;
        self.reentered = false;
    }

    // --- accessors -------------------------------------------------------

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Target text for a word index; an exhausted stream reads as empty so
    /// typing never faults (trailing input scores as incorrect instead).
    pub fn target_word(&self, index: usize) -> &str {
        self.words.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn current_word_index(&self) -> usize {
        self.current_word_index
    }

    pub fn current_input(&self) -> &str {
        &self.current_input
    }

    pub fn committed(&self) -> &[CommittedChar] {
        &self.committed
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn error_map(&self) -> &ErrorMap {
        &self.error_map
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }

    // --- transitions -----------------------------------------------------

    /// Feed the full value of the input control. Diffs against the previous
    /// value internally: a trailing space is a commit attempt, anything else
    /// replaces the in-progress word (append, backspace-in-word, or an
    /// external edit such as a paste).
    pub fn on_input(&mut self, raw_value: &str) {
        if self.status == Status::Complete {
            return;
        }

        if self.status == Status::NotStarted {
            // Whitespace alone never starts a session.
            if raw_value.trim().is_empty() {
                return;
            }
            self.started_at = Some(SystemTime::now());
            self.status = Status::Active;
        }

        if raw_value.ends_with(' ') {
            self.handle_space(raw_value);
        } else {
            self.current_input = raw_value.to_string();
            self.try_auto_advance();
        }
    }

    /// Backspace with an empty in-progress word re-enters the previous word:
    /// the index moves back, the text reappears as it was typed, and its
    /// committed entries (with their error tallies) are withdrawn.
    pub fn on_backspace(&mut self) {
        if self.status != Status::Active {
            return;
        }

        if !self.current_input.is_empty() {
            self.current_input.pop();
            self.try_auto_advance();
            return;
        }

        if self.current_word_index == 0 {
            return;
        }
        self.current_word_index -= 1;
        let word_index = self.current_word_index;

        let first = self
            .committed
            .iter()
            .position(|c| c.word_index == word_index)
            .unwrap_or(self.committed.len());
        let mut restored = String::new();
        for entry in self.committed.drain(first..) {
            if let Some(typed) = entry.typed {
                restored.push(typed);
            }
            if !entry.correct {
                self.error_count -= 1;
                if let Some(typed) = entry.typed {
                    self.error_map.unrecord(typed);
                }
            }
        }
        self.current_input = restored;
        self.reentered = true;
    }

    /// Duration bound reached. The in-progress word is not scored. A timed
    /// session that never saw a keystroke still completes, with zero metrics.
    pub fn on_timer_expired(&mut self) {
        if self.status == Status::Complete {
            return;
        }
        self.status = Status::Complete;
        self.completed_at = Some(SystemTime::now());
    }

    pub fn snapshot(&self) -> Snapshot {
        let now = SystemTime::now();
        Snapshot {
            status: self.status,
            current_word_index: self.current_word_index,
            current_input: self.current_input.clone(),
            wpm: metrics::net_wpm(self, now),
            raw_wpm: metrics::raw_wpm(self, now),
            accuracy: metrics::accuracy(self),
            time_per_char_ms: metrics::time_per_char_ms(self, now),
        }
    }

    /// `Some` only once the session is `Complete`; everything inside is
    /// frozen at the completion instant.
    pub fn final_result(&self) -> Option<FinalResult> {
        if self.status != Status::Complete {
            return None;
        }
        let end = self.completed_at?;
        let duration = self
            .started_at
            .and_then(|start| end.duration_since(start).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Some(FinalResult {
            wpm: metrics::net_wpm(self, end),
            raw_wpm: metrics::raw_wpm(self, end),
            accuracy: metrics::accuracy(self),
            characters_typed: self.committed.len(),
            error_count: self.error_count,
            error_map: self.error_map.clone(),
            test_duration_seconds: duration,
        })
    }

    // --- internals -------------------------------------------------------

    fn handle_space(&mut self, raw_value: &str) {
        let now = SystemTime::now();
        let typed_word = raw_value.trim();

        // Key-repeat guard: a space inside the debounce window is stripped
        // and nothing else happens. The first commit is never debounced.
        if let Some(last) = self.last_commit_at {
            if time_diff_ms(last, now) < self.config.commit_debounce_ms {
                self.current_input = raw_value.trim_end_matches(' ').to_string();
                return;
            }
        }

        // A word cannot be skipped with zero keystrokes.
        if typed_word.is_empty() {
            self.current_input.clear();
            return;
        }

        self.current_input = typed_word.to_string();
        self.commit_current(now);
    }

    /// A re-entered word commits on its own the first time it matches the
    /// target again; the normal path always waits for the space.
    fn try_auto_advance(&mut self) {
        if self.reentered && self.current_input == self.target_word(self.current_word_index) {
            self.commit_current(SystemTime::now());
        }
    }

    fn commit_current(&mut self, now: SystemTime) {
        let word_index = self.current_word_index;
        let typed: Vec<char> = self.current_input.chars().collect();
        let target: Vec<char> = self.target_word(word_index).chars().collect();

        for i in 0..typed.len().max(target.len()) {
            let typed_char = typed.get(i).copied();
            let expected = target.get(i).copied();
            let correct = typed_char == expected;
            self.committed.push(CommittedChar {
                word_index,
                char_index: i,
                typed: typed_char,
                expected,
                correct,
            });
            if !correct {
                self.error_count += 1;
                if let Some(c) = typed_char {
                    self.error_map.record(c);
                }
            }
        }

        self.current_word_index += 1;
        self.current_input.clear();
        self.reentered = false;
        self.last_commit_at = Some(now);

        match self.config.bound {
            TestBound::Words(count) if self.current_word_index >= count => {
                self.status = Status::Complete;
                self.completed_at = Some(now);
            }
            TestBound::Seconds(_) => self.refill_stream(),
            _ => {}
        }
    }

    /// Timed sessions keep the stream ahead of the cursor; word-count
    /// sessions never grow past their configured length.
    fn refill_stream(&mut self) {
        let ahead = self.words.len().saturating_sub(self.current_word_index);
        if ahead < LOW_WATER_WORDS {
            self.source.extend(
                &mut self.words,
                EXTEND_BATCH,
                self.config.difficulty,
                self.config.punctuation,
            );
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status)
            .field("current_word_index", &self.current_word_index)
            .field("current_input", &self.current_input)
            .field("committed", &self.committed.len())
            .field("error_count", &self.error_count)
            .finish()
    }
}

fn initial_word_count(config: &SessionConfig) -> usize {
    match config.bound {
        TestBound::Words(count) => count,
        TestBound::Seconds(_) => INITIAL_TIMED_WORDS,
    }
}

/// Saturating millisecond difference between two instants.
pub fn time_diff_ms(start: SystemTime, end: SystemTime) -> u64 {
    end.duration_since(start).unwrap_or_default().as_millis() as u64
}
