//! String similarity helpers shared by the node and entity matchers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Identifiers, numbers, and single punctuation characters.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z_][A-Za-z0-9_]*|[0-9]+(?:\.[0-9]+)?|[^\sA-Za-z0-9_]").unwrap()
});

/// Split source text into tokens, ignoring whitespace.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    TOKEN_RE.find_iter(text).map(|m| m.as_str())
}

/// Token multiset.
pub type TokenBag = BTreeMap<String, u32>;

pub fn token_bag<'a>(tokens: impl IntoIterator<Item = &'a str>) -> TokenBag {
    let mut bag = TokenBag::new();
    for token in tokens {
        *bag.entry(token.to_string()).or_insert(0) += 1;
    }
    bag
}

/// Weighted Jaccard similarity of two token multisets, in `[0, 1]`.
pub fn weighted_jaccard(a: &TokenBag, b: &TokenBag) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let mut min_sum = 0u64;
    let mut max_sum = 0u64;
    for (token, &ca) in a {
        let cb = b.get(token).copied().unwrap_or(0);
        min_sum += ca.min(cb) as u64;
        max_sum += ca.max(cb) as u64;
    }
    for (token, &cb) in b {
        if !a.contains_key(token) {
            max_sum += cb as u64;
        }
    }
    min_sum as f64 / max_sum as f64
}

fn bigrams(s: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Dice coefficient over character bigrams, in `[0, 1]`.
pub fn bigram_dice(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let mut left = bigrams(a);
    let mut right = bigrams(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let total = left.len() + right.len();
    left.sort_unstable();
    right.sort_unstable();

    let (mut i, mut j, mut common) = (0, 0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                common += 1;
                i += 1;
                j += 1;
            }
        }
    }
    2.0 * common as f64 / total as f64
}
