use rand::seq::SliceRandom;
use rand::Rng;

use super::bank::WordBank;
use super::difficulty::Difficulty;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Supplier of the target word stream. A session holds one of these and asks
/// it to grow the stream mid-run for duration-bounded tests.
pub trait WordSource {
    /// Draw exactly `count` words within the difficulty's length bounds.
    fn generate(&mut self, count: usize, difficulty: Difficulty, punctuation: bool) -> Vec<String>;

    /// Synthesize words biased toward `error_chars`. Falls back to `generate`
    /// when the profile is empty.
    fn generate_practice(&mut self, count: usize, error_chars: &[char]) -> Vec<String>;

    /// Append `more` words to an existing stream. Append-only: callers rely on
    /// the prefix staying untouched.
    fn extend(
        &mut self,
        words: &mut Vec<String>,
        more: usize,
        difficulty: Difficulty,
        punctuation: bool,
    ) {
        words.extend(self.generate(more, difficulty, punctuation));
    }
}

/// Random selection from an embedded word bank.
pub struct BankSource {
    bank: WordBank,
}

impl BankSource {
    pub fn new(bank: WordBank) -> Self {
        Self { bank }
    }

    pub fn english() -> Self {
        Self::new(WordBank::new("english"))
    }
}

impl WordSource for BankSource {
    fn generate(&mut self, count: usize, difficulty: Difficulty, punctuation: bool) -> Vec<String> {
        let (min, max) = difficulty.length_bounds();
        let pool = self.bank.words_within(min, max);
        let mut rng = rand::thread_rng();

        let mut words: Vec<String> = (0..count)
            .map(|_| {
                (*pool
                    .choose(&mut rng)
                    .expect("word bank is empty in this length band"))
                .clone()
            })
            .collect();

        if punctuation {
            decorate(&mut words, &mut rng);
        }
        words
    }

    fn generate_practice(&mut self, count: usize, error_chars: &[char]) -> Vec<String> {
        if error_chars.is_empty() {
            return self.generate(count, Difficulty::default(), false);
        }

        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| synthesize_practice_word(error_chars, &mut rng))
            .collect()
    }
}

/// Sprinkle capitalization and trailing punctuation over a stream. The last
/// word is always left bare so a finished test never ends mid-sentence.
fn decorate(words: &mut [String], rng: &mut impl Rng) {
    let last = words.len().saturating_sub(1);
    for (i, word) in words.iter_mut().enumerate() {
        if i == last {
            continue;
        }
        if rng.gen_bool(0.3) {
            *word = capitalize_first(word);
        }
        // Period wins when both land on the same word.
        if rng.gen_bool(0.15) {
            word.push('.');
        } else if rng.gen_bool(0.2) {
            word.push(',');
        }
    }
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Pseudo-word generator for practice mode: error characters are inserted
/// with a probability that decays over consecutive insertions, filler letters
/// occasionally double, and words sometimes pick up a stray prefix or suffix.
/// Content shape only; scoring never depends on it.
fn synthesize_practice_word(error_chars: &[char], rng: &mut impl Rng) -> String {
    let mut length = rng.gen_range(4..=9);
    let mut word = String::new();
    let mut run = 0u32;

    let mut i = 0;
    while i < length {
        let bias = (0.7 - f64::from(run) * 0.3).max(0.0);
        if rng.gen_bool(bias) {
            word.push(*error_chars.choose(rng).unwrap());
            run += 1;
        } else {
            let c = random_letter(rng);
            word.push(c);
            if rng.gen_bool(0.3) {
                word.push(c);
            }
            run = 0;
        }

        // Break up long error runs with a filler letter now and then.
        if run > 1 && rng.gen_bool(0.4) {
            word.push(random_letter(rng));
            length += 1;
            run = 0;
        }
        i += 1;
    }

    if rng.gen_bool(0.3) {
        word.insert(0, random_letter(rng));
    }
    if rng.gen_bool(0.3) {
        word.push(random_letter(rng));
    }
    word
}

fn random_letter(rng: &mut impl Rng) -> char {
    ALPHABET[rng.gen_range(0..ALPHABET.len())] as char
}

/// Deterministic source for unit and integration tests: cycles a fixed list.
pub struct FixedWordSource {
    words: Vec<String>,
}

impl FixedWordSource {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }
}

impl WordSource for FixedWordSource {
    fn generate(&mut self, count: usize, _difficulty: Difficulty, _punctuation: bool) -> Vec<String> {
        self.words.iter().cycle().take(count).cloned().collect()
    }

    fn generate_practice(&mut self, count: usize, _error_chars: &[char]) -> Vec<String> {
        self.generate(count, Difficulty::default(), false)
    }
}
