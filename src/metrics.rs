//! Pure metric functions over a session and a caller-supplied "now".
//! Nothing here mutates; degenerate inputs (no start time, nothing typed)
//! yield 0 rather than an error. Once a session is complete every function
//! reads the completion instant instead of "now", so results are frozen.

use std::time::SystemTime;

use crate::session::Session;

/// Elapsed-time floor: anything under one sixtieth of a second counts as
/// that, so sub-second sessions cannot blow the division up.
const MIN_ELAPSED_MINUTES: f64 = 1.0 / 3600.0;
/// Cap for time-per-character on near-instant sessions.
const MAX_TIME_PER_CHAR_MS: f64 = 9999.0;

/// Words per minute counting only correct characters, plus one virtual space
/// per committed word (the standard five-chars-per-word normalization).
pub fn net_wpm(session: &Session, now: SystemTime) -> f64 {
    let Some(minutes) = elapsed_minutes(session, now) else {
        return 0.0;
    };
    let chars = correct_typed_chars(session) + session.current_word_index();
    chars as f64 / 5.0 / minutes
}

/// Same normalization as `net_wpm` but counting every committed cell and
/// every live character, correct or not.
pub fn raw_wpm(session: &Session, now: SystemTime) -> f64 {
    let Some(minutes) = elapsed_minutes(session, now) else {
        return 0.0;
    };
    let chars = total_typed_chars(session) + session.current_word_index();
    chars as f64 / 5.0 / minutes
}

/// Percentage of typed characters that were correct, rounded to a whole
/// number. Virtual spaces count on neither side of the division.
pub fn accuracy(session: &Session) -> f64 {
    let total = total_typed_chars(session);
    if total == 0 {
        return 0.0;
    }
    let correct = correct_typed_chars(session);
    (100.0 * correct as f64 / total as f64).round()
}

/// Mean milliseconds per typed character (committed spaces included in the
/// denominator), clamped so a near-instant session reports something sane.
pub fn time_per_char_ms(session: &Session, now: SystemTime) -> f64 {
    let Some(start) = session.started_at() else {
        return 0.0;
    };
    let end = session.completed_at().unwrap_or(now);
    let elapsed_ms = end
        .duration_since(start)
        .unwrap_or_default()
        .as_secs_f64()
        * 1000.0;
    let total = total_typed_chars(session) + session.current_word_index();
    (elapsed_ms / total.max(1) as f64).min(MAX_TIME_PER_CHAR_MS)
}

fn elapsed_minutes(session: &Session, now: SystemTime) -> Option<f64> {
    let start = session.started_at()?;
    let end = session.completed_at().unwrap_or(now);
    let minutes = end
        .duration_since(start)
        .unwrap_or_default()
        .as_secs_f64()
        / 60.0;
    Some(minutes.max(MIN_ELAPSED_MINUTES))
}

/// Correct committed cells plus live characters matching the active target
/// position-wise.
fn correct_typed_chars(session: &Session) -> usize {
    let committed = session
        .committed()
        .iter()
        .filter(|c| c.correct)
        .count();
    let target = session.target_word(session.current_word_index());
    let live = session
        .current_input()
        .chars()
        .zip(target.chars())
        .filter(|(typed, expected)| typed == expected)
        .count();
    committed + live
}

fn total_typed_chars(session: &Session) -> usize {
    session.committed().len() + session.current_input().chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Session, SessionConfig, TestBound};
    use crate::words::FixedWordSource;
    use std::time::Duration;

    fn session(words: &[&str], count: usize) -> Session {
        let config = SessionConfig {
            bound: TestBound::Words(count),
            commit_debounce_ms: 0,
            ..SessionConfig::default()
        };
        Session::new(config, Box::new(FixedWordSource::new(words.to_vec())))
    }

    fn type_word(s: &mut Session, word: &str) {
        let mut value = String::new();
        for c in word.chars() {
            value.push(c);
            s.on_input(&value);
        }
        value.push(' ');
        s.on_input(&value);
    }

    #[test]
    fn test_zero_before_start() {
        let s = session(&["cat"], 1);
        let now = SystemTime::now();

        assert_eq!(net_wpm(&s, now), 0.0);
        assert_eq!(raw_wpm(&s, now), 0.0);
        assert_eq!(accuracy(&s), 0.0);
        assert_eq!(time_per_char_ms(&s, now), 0.0);
    }

    #[test]
    fn test_net_wpm_counts_virtual_spaces() {
        // Still active after two commits so "now" drives the clock.
        let mut s = session(&["cat", "dog", "owl"], 3);
        type_word(&mut s, "cat");
        type_word(&mut s, "dog");

        // 6 correct chars + 2 virtual spaces over one minute = 1.6 wpm.
        let now = s.started_at().unwrap() + Duration::from_secs(60);
        assert!((net_wpm(&s, now) - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_raw_counts_everything_net_only_correct() {
        let mut s = session(&["cat", "dog"], 2);
        type_word(&mut s, "cxt");

        let now = s.started_at().unwrap() + Duration::from_secs(60);
        // Net: 2 correct + 1 space = 3 chars; raw: 3 cells + 1 space = 4.
        assert!((net_wpm(&s, now) - 3.0 / 5.0).abs() < 1e-9);
        assert!((raw_wpm(&s, now) - 4.0 / 5.0).abs() < 1e-9);
        assert!(raw_wpm(&s, now) > net_wpm(&s, now));
    }

    #[test]
    fn test_live_input_counts_toward_wpm() {
        let mut s = session(&["cat", "dog"], 2);
        type_word(&mut s, "cat");
        s.on_input("dx");

        let now = s.started_at().unwrap() + Duration::from_secs(60);
        // Net: 3 committed + 1 correct live ('d') + 1 space = 5.
        assert!((net_wpm(&s, now) - 1.0).abs() < 1e-9);
        // Raw: 3 committed + 2 live + 1 space = 6.
        assert!((raw_wpm(&s, now) - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_elapsed_floor_prevents_blowup() {
        let mut s = session(&["cat"], 2);
        type_word(&mut s, "cat");

        // "now" equal to the start: elapsed 0 is floored at 1/60 s.
        let now = s.started_at().unwrap();
        let wpm = net_wpm(&s, now);
        assert!(wpm.is_finite());
        // 4 chars / 5 / (1/3600 min) = 2880.
        assert!((wpm - 2880.0).abs() < 1e-6);
    }

    #[test]
    fn test_accuracy_rounds_and_ignores_spaces() {
        let mut s = session(&["cat", "dog"], 2);
        type_word(&mut s, "cxt");

        // 2 of 3 = 66.666... rounds to 67, virtual space not counted.
        assert_eq!(accuracy(&s), 67.0);
    }

    #[test]
    fn test_accuracy_includes_live_input() {
        let mut s = session(&["cat"], 1);
        s.on_input("c");
        s.on_input("cx");

        assert_eq!(accuracy(&s), 50.0);
    }

    #[test]
    fn test_accuracy_bounds() {
        let mut s = session(&["cat"], 1);
        type_word(&mut s, "qqq");
        assert_eq!(accuracy(&s), 0.0);

        let mut s = session(&["cat"], 1);
        type_word(&mut s, "cat");
        assert_eq!(accuracy(&s), 100.0);
    }

    #[test]
    fn test_time_per_char_clamped() {
        let mut s = session(&["cat"], 2);
        s.on_input("c");

        let now = s.started_at().unwrap() + Duration::from_secs(3600);
        assert_eq!(time_per_char_ms(&s, now), 9999.0);
    }

    #[test]
    fn test_time_per_char_divides_by_typed_plus_words() {
        let mut s = session(&["cat", "dog"], 2);
        type_word(&mut s, "cat");

        let now = s.started_at().unwrap() + Duration::from_secs(2);
        // 2000 ms over (3 committed + 1 word) = 500 ms per char.
        assert!((time_per_char_ms(&s, now) - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_metrics_frozen_after_completion() {
        let mut s = session(&["cat"], 1);
        type_word(&mut s, "cat");

        let frozen = net_wpm(&s, SystemTime::now());
        let later = net_wpm(&s, SystemTime::now() + Duration::from_secs(120));
        assert_eq!(frozen, later);
    }
}
