//! Task-text tokenization and Jaccard similarity.
//!
//! Text is lowercased, every character other than ASCII word characters,
//! whitespace and CJK ideographs (U+4E00..=U+9FA5) becomes a space, and
//! the result is split on whitespace. Single-character tokens are dropped.

use std::collections::HashSet;

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() || ('\u{4E00}'..='\u{9FA5}').contains(&c)
}

/// Tokenize `text`, keeping duplicates and order.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if is_kept(c) { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|word| word.chars().count() > 1)
        .map(str::to_string)
        .collect()
}

/// Tokenize `text` into a deduplicated set.
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// |A ∩ B| / |A ∪ B|, or 0.0 when both sets are empty.
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_strips_punctuation() {
        assert_eq!(tokenize("Read the FILE, then: sum!"), vec!["read", "the", "file", "then", "sum"]);
    }

    #[test]
    fn tokenize_drops_single_characters() {
        assert_eq!(tokenize("a b cd 1 23"), vec!["cd", "23"]);
    }

    #[test]
    fn tokenize_keeps_cjk_runs() {
        assert_eq!(tokenize("计算 12+8 的结果"), vec!["计算", "12", "的结果"]);
    }

    #[test]
    fn tokenize_treats_non_ascii_letters_as_separators() {
        // Only ASCII word characters count, accented letters split words
        assert_eq!(tokenize("café crème"), vec!["caf", "cr", "me"]);
    }

    #[test]
    fn tokenize_keeps_underscores() {
        assert_eq!(tokenize("task_memory.json"), vec!["task_memory", "json"]);
    }

    #[test]
    fn identical_text_scores_one() {
        let a = token_set("calculate 12 plus 8");
        assert!((jaccard_similarity(&a, &a) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn disjoint_text_scores_zero() {
        let a = token_set("read the config file");
        let b = token_set("multiply two numbers");
        assert_eq!(jaccard_similarity(&a, &b), 0.0);
    }

    #[test]
    fn empty_sets_score_zero() {
        let empty = HashSet::new();
        assert_eq!(jaccard_similarity(&empty, &empty), 0.0);
        assert_eq!(jaccard_similarity(&empty, &token_set("some words")), 0.0);
    }

    #[test]
    fn partial_overlap() {
        let a = token_set("add two numbers");
        let b = token_set("add three numbers");
        // {add, numbers} / {add, two, three, numbers}
        assert!((jaccard_similarity(&a, &b) - 0.5).abs() < f32::EPSILON);
    }
}
