/// Clean text pulled out of a columnar PDF.
///
/// Whitespace runs collapse to one space, then spaces sitting between two
/// isolated letters are dropped, so `D e s e n v o l v e d o r` becomes
/// `Desenvolvedor` while `vaga e salário` keeps its word boundaries.
/// Collapsing first keeps the function idempotent. It also means a run of
/// several whitespace characters between two single letters is joined the
/// same way as a single space (`D  e` becomes `De`).
pub fn normalize_text(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    join_spaced_letters(&collapsed)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn join_spaced_letters(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        let between_singles = c == ' '
            && i > 0
            && i + 1 < chars.len()
            && is_single_letter(&chars, i - 1)
            && is_single_letter(&chars, i + 1);
        if !between_singles {
            out.push(c);
        }
    }
    out
}

/// A letter with no word character on either side.
fn is_single_letter(chars: &[char], idx: usize) -> bool {
    if !chars[idx].is_alphabetic() {
        return false;
    }
    let before = idx.checked_sub(1).map(|j| chars[j]);
    let after = chars.get(idx + 1).copied();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
