//! Greedy word wrapping for multi-line form boxes

/// Result of wrapping a block of text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wrapped {
    pub lines: Vec<String>,
    /// True when text beyond `max_lines` was discarded
    pub truncated: bool,
}

/// Wrap `text` into at most `max_lines` lines of at most `max_chars` characters.
///
/// Words are packed greedily and separated by single spaces; a word longer
/// than a whole line is split at the character boundary. Widths count chars,
/// not bytes.
pub fn wrap(text: &str, max_chars: usize, max_lines: usize) -> Wrapped {
    let max_chars = max_chars.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        if current_len > 0 && current_len + 1 + word.len() <= max_chars {
            current.push(' ');
            current.extend(word.iter());
            current_len += 1 + word.len();
            continue;
        }

        if current_len > 0 {
            lines.push(std::mem::take(&mut current));
        }

        while word.len() > max_chars {
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        current.extend(word.iter());
        current_len = word.len();
    }

    if current_len > 0 {
        lines.push(current);
    }

    let truncated = lines.len() > max_lines;
    lines.truncate(max_lines);
    Wrapped { lines, truncated }
}
