use include_dir::{include_dir, Dir};
use serde::Deserialize;
use serde_json::from_str;
use std::error::Error;

static DATA_DIR: Dir = include_dir!("src/words/data");

/// An embedded list of plain words a source can draw from.
#[allow(dead_code)]
#[derive(Deserialize, Clone, Debug)]
pub struct WordBank {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl WordBank {
    pub fn new(file_name: &str) -> Self {
        read_bank_from_file(&format!("{file_name}.json")).unwrap()
    }

    /// Words whose character length lies within `min..=max`.
    pub fn words_within(&self, min: usize, max: usize) -> Vec<&String> {
        self.words
            .iter()
            .filter(|w| {
                let len = w.chars().count();
                len >= min && len <= max
            })
            .collect()
    }
}

fn read_bank_from_file(file_name: &str) -> Result<WordBank, Box<dyn Error>> {
    let file = DATA_DIR.get_file(file_name).expect("Word bank not found");

    let file_as_str = file
        .contents_utf8()
        .expect("Unable to interpret file as a string");

    let bank = from_str(file_as_str).expect("Unable to deserialize word bank json");

    Ok(bank)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_new() {
        let bank = WordBank::new("english");

        assert_eq!(bank.name, "english");
        assert!(!bank.words.is_empty());
        assert!(bank.size > 0);
    }

    #[test]
    fn test_words_within_bounds() {
        let bank = WordBank::new("english");

        for word in bank.words_within(2, 5) {
            let len = word.chars().count();
            assert!((2..=5).contains(&len), "{word} out of bounds");
        }
    }

    #[test]
    fn test_every_band_is_populated() {
        let bank = WordBank::new("english");

        assert!(!bank.words_within(2, 5).is_empty());
        assert!(!bank.words_within(4, 8).is_empty());
        assert!(!bank.words_within(6, 12).is_empty());
    }

    #[test]
    fn test_bank_deserialization() {
        let json_data = r#"
        {
            "name": "test",
            "size": 3,
            "words": ["hello", "world", "test"]
        }
        "#;

        let bank: WordBank = from_str(json_data).expect("Failed to deserialize test bank");

        assert_eq!(bank.name, "test");
        assert_eq!(bank.size, 3);
        assert_eq!(bank.words.len(), 3);
    }

    #[test]
    #[should_panic(expected = "Word bank not found")]
    fn test_read_nonexistent_bank() {
        let _result = read_bank_from_file("nonexistent.json");
    }
}
