use crate::session::CommittedChar;

/// Verdict for one character cell of the word being typed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    Untyped,
    Cursor,
}

/// Classify the character cell at `position` of the active word. Total over
/// all indices; anything typed past the end of the target is `Incorrect`.
pub fn classify(target: &str, typed_so_far: &str, position: usize) -> Outcome {
    let typed_len = typed_so_far.chars().count();
    if position < typed_len {
        let typed = typed_so_far.chars().nth(position);
        let expected = target.chars().nth(position);
        if typed == expected {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        }
    } else if position == typed_len {
        Outcome::Cursor
    } else {
        Outcome::Untyped
    }
}

/// Classification for a finalized word. The stored verdict is authoritative:
/// the live stream may have been regenerated or extended since the commit.
pub fn classify_committed(
    committed: &[CommittedChar],
    word_index: usize,
    char_index: usize,
) -> Option<Outcome> {
    committed
        .iter()
        .find(|c| c.word_index == word_index && c.char_index == char_index)
        .map(|c| {
            if c.correct {
                Outcome::Correct
            } else {
                Outcome::Incorrect
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_correct_and_incorrect() {
        assert_eq!(classify("hello", "he", 0), Outcome::Correct);
        assert_eq!(classify("hello", "he", 1), Outcome::Correct);
        assert_eq!(classify("hello", "hx", 1), Outcome::Incorrect);
    }

    #[test]
    fn test_classify_cursor_and_untyped() {
        assert_eq!(classify("hello", "he", 2), Outcome::Cursor);
        assert_eq!(classify("hello", "he", 3), Outcome::Untyped);
        assert_eq!(classify("hello", "he", 4), Outcome::Untyped);
    }

    #[test]
    fn test_classify_past_target_end() {
        // Typed beyond the word: compared against nothing, always incorrect.
        assert_eq!(classify("hi", "hix", 2), Outcome::Incorrect);
        assert_eq!(classify("", "x", 0), Outcome::Incorrect);
    }

    #[test]
    fn test_classify_empty_input() {
        assert_eq!(classify("hello", "", 0), Outcome::Cursor);
        assert_eq!(classify("hello", "", 1), Outcome::Untyped);
    }

    #[test]
    fn test_classify_is_total_far_past_both() {
        assert_eq!(classify("hi", "hi", 40), Outcome::Untyped);
    }

    #[test]
    fn test_classify_committed_reads_stored_flag() {
        let committed = vec![
            CommittedChar {
                word_index: 0,
                char_index: 0,
                typed: Some('c'),
                expected: Some('c'),
                correct: true,
            },
            CommittedChar {
                word_index: 0,
                char_index: 1,
                typed: Some('x'),
                expected: Some('a'),
                correct: false,
            },
        ];

        assert_eq!(
            classify_committed(&committed, 0, 0),
            Some(Outcome::Correct)
        );
        assert_eq!(
            classify_committed(&committed, 0, 1),
            Some(Outcome::Incorrect)
        );
        assert_eq!(classify_committed(&committed, 0, 2), None);
        assert_eq!(classify_committed(&committed, 1, 0), None);
    }
}
