// End-to-end scenarios over the session state machine and metrics,
// driven the way a text control would drive them: full input values per
// keystroke, trailing space to commit.

use std::time::{Duration, SystemTime};

use typr::metrics;
use typr::session::{Session, SessionConfig, Status, TestBound};
use typr::words::FixedWordSource;

fn words_session(words: &[&str], count: usize) -> Session {
    let config = SessionConfig {
        bound: TestBound::Words(count),
        commit_debounce_ms: 0,
        ..SessionConfig::default()
    };
    Session::new(config, Box::new(FixedWordSource::new(words.to_vec())))
}

fn timed_session(words: &[&str], secs: f64) -> Session {
    let config = SessionConfig {
        bound: TestBound::Seconds(secs),
        commit_debounce_ms: 0,
        ..SessionConfig::default()
    };
    Session::new(config, Box::new(FixedWordSource::new(words.to_vec())))
}

fn type_word(session: &mut Session, word: &str) {
    let mut value = String::new();
    for c in word.chars() {
        value.push(c);
        session.on_input(&value);
    }
    value.push(' ');
    session.on_input(&value);
}

#[test]
fn scenario_extra_character_in_word() {
    // "hello" typed as "helllo ": six cells, two of them wrong.
    let mut session = words_session(&["hello", "next"], 2);

    type_word(&mut session, "helllo");

    let committed = session.committed();
    assert_eq!(committed.len(), 6);

    for cell in &committed[..4] {
        assert!(cell.correct);
    }
    // Index 4: typed 'l' against expected 'o'.
    assert_eq!(committed[4].typed, Some('l'));
    assert_eq!(committed[4].expected, Some('o'));
    assert!(!committed[4].correct);
    // Index 5: typed 'o' against nothing.
    assert_eq!(committed[5].typed, Some('o'));
    assert_eq!(committed[5].expected, None);
    assert!(!committed[5].correct);

    assert_eq!(session.error_count(), 2);
}

#[test]
fn scenario_timed_test_with_no_typing() {
    let mut session = timed_session(&["cat", "dog"], 10.0);

    session.on_timer_expired();

    assert_eq!(session.status(), Status::Complete);
    let result = session.final_result().expect("complete session has a result");
    assert_eq!(result.wpm, 0.0);
    assert_eq!(result.accuracy, 0.0);
}

#[test]
fn scenario_word_count_test_completes_cleanly() {
    let mut session = words_session(&["cat", "dog"], 2);

    type_word(&mut session, "cat");
    type_word(&mut session, "dog");

    assert_eq!(session.status(), Status::Complete);
    let result = session.final_result().unwrap();
    assert_eq!(result.characters_typed, 6);
    assert_eq!(result.error_count, 0);
    assert_eq!(result.accuracy, 100.0);
}

#[test]
fn scenario_backspace_into_committed_word() {
    let mut session = words_session(&["cat", "dog"], 2);

    type_word(&mut session, "cat");
    assert_eq!(session.current_word_index(), 1);

    session.on_backspace();

    assert_eq!(session.current_word_index(), 0);
    assert_eq!(session.current_input(), "cat");
    assert!(session.committed().is_empty());
}

#[test]
fn scenario_double_space_commits_once() {
    let config = SessionConfig {
        bound: TestBound::Words(3),
        commit_debounce_ms: 100,
        ..SessionConfig::default()
    };
    let mut session = Session::new(
        config,
        Box::new(FixedWordSource::new(["cat", "dog", "owl"])),
    );

    type_word(&mut session, "cat");
    // Second space lands immediately, far inside the 100 ms window.
    session.on_input(" ");

    assert_eq!(session.current_word_index(), 1);
    assert_eq!(session.committed().len(), 3);
    assert!(session.current_input().is_empty());
}

#[test]
fn committed_length_matches_per_word_maximum() {
    // Accounting invariant: history length after N commits is the sum of
    // max(typed.len, target.len) over those words.
    let mut session = words_session(&["alpha", "be", "gamma", "x"], 4);
    let typed = ["alx", "been", "gamma", "q"];
    let targets = ["alpha", "be", "gamma", "x"];

    for word in typed {
        type_word(&mut session, word);
    }

    let expected: usize = typed
        .iter()
        .zip(targets.iter())
        .map(|(t, g)| t.len().max(g.len()))
        .sum();
    assert_eq!(session.committed().len(), expected);
}

#[test]
fn snapshot_never_mutates() {
    let mut session = words_session(&["cat", "dog"], 2);
    type_word(&mut session, "cxt");
    session.on_input("d");

    let committed_before = session.committed().to_vec();
    let errors_before = session.error_count();
    let map_before = session.error_map().clone();

    for _ in 0..10 {
        let _ = session.snapshot();
    }

    assert_eq!(session.committed(), &committed_before[..]);
    assert_eq!(session.error_count(), errors_before);
    assert_eq!(session.error_map(), &map_before);
}

#[test]
fn accuracy_stays_in_bounds_across_reachable_states() {
    let mut session = words_session(&["cat", "hello", "dog"], 3);
    let inputs = [
        "c", "cx", "cxq", "cxq ", "h", "he", "hel", "hell", "hell ", "d", "do", "dog ",
    ];

    for value in inputs {
        session.on_input(value);
        let snapshot = session.snapshot();
        assert!(
            (0.0..=100.0).contains(&snapshot.accuracy),
            "accuracy {} out of bounds after {value:?}",
            snapshot.accuracy
        );
        assert!(snapshot.wpm >= 0.0);
        assert!(snapshot.raw_wpm >= 0.0);
    }
}

#[test]
fn raw_wpm_dominates_net_wpm_with_errors() {
    let mut session = words_session(&["cat", "dog", "owl"], 3);
    type_word(&mut session, "cxt");
    type_word(&mut session, "dqg");

    assert!(session.error_count() > 0);
    let now = session.started_at().unwrap() + Duration::from_secs(30);
    assert!(metrics::raw_wpm(&session, now) > metrics::net_wpm(&session, now));
}

#[test]
fn corrected_word_leaves_no_trace() {
    // Error-map symmetry: commit a mistyped word, back into it, retype it
    // correctly; history and tallies match a clean run.
    let mut clean = words_session(&["cat", "dog"], 2);
    type_word(&mut clean, "cat");
    type_word(&mut clean, "dog");

    let mut corrected = words_session(&["cat", "dog"], 2);
    type_word(&mut corrected, "cxt");
    corrected.on_backspace(); // back into "cxt"
    corrected.on_backspace(); // "cx"
    corrected.on_backspace(); // "c"
    corrected.on_input("ca");
    corrected.on_input("cat"); // auto-commits on equality
    type_word(&mut corrected, "dog");

    assert_eq!(corrected.status(), Status::Complete);
    assert_eq!(corrected.committed(), clean.committed());
    assert_eq!(corrected.error_count(), clean.error_count());
    assert_eq!(corrected.error_map(), clean.error_map());
}

#[test]
fn final_metrics_do_not_drift() {
    let mut session = words_session(&["cat"], 1);
    type_word(&mut session, "cat");

    let first = session.final_result().unwrap();
    std::thread::sleep(Duration::from_millis(30));
    let second = session.final_result().unwrap();

    assert_eq!(first.wpm, second.wpm);
    assert_eq!(first.raw_wpm, second.raw_wpm);
    assert_eq!(
        first.test_duration_seconds,
        second.test_duration_seconds
    );
}

#[test]
fn live_metrics_use_the_caller_clock() {
    let mut session = words_session(&["cat", "dog"], 2);
    type_word(&mut session, "cat");

    let start = session.started_at().unwrap();
    // 4 effective chars (3 correct + 1 space) in 12 seconds = 4 wpm.
    let wpm = metrics::net_wpm(&session, start + Duration::from_secs(12));
    assert!((wpm - 4.0).abs() < 1e-9);
}

#[test]
fn scroller_tracks_the_active_word_without_touching_scoring() {
    use typr::scroller::{ScrollerConfig, ViewportScroller};

    let stream = ["alpha", "bravo", "candy", "delta", "eagle", "fable"];
    let mut session = words_session(&stream, 6);
    let mut scroller = ViewportScroller::new(ScrollerConfig {
        line_height: 40,
        visible_lines: 3,
        max_columns: 12,
    });
    scroller.layout(session.words());

    let mut offsets = Vec::new();
    for word in stream {
        type_word(&mut session, word);
        offsets.push(scroller.on_word_index(session.current_word_index()));
    }

    // Starts unscrolled and only ever grows while typing forward.
    assert_eq!(offsets[0], 0);
    assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
    assert!(*offsets.last().unwrap() > 0);
    // None of it touched scoring.
    assert_eq!(session.error_count(), 0);
    assert_eq!(session.final_result().unwrap().accuracy, 100.0);
}

#[test]
fn leading_spaces_then_real_typing() {
    let mut session = words_session(&["cat"], 1);

    session.on_input(" ");
    session.on_input("  ");
    assert_eq!(session.status(), Status::NotStarted);

    session.on_input("c");
    assert_eq!(session.status(), Status::Active);

    let before = SystemTime::now();
    assert!(session.started_at().unwrap() <= before + Duration::from_secs(1));
}
