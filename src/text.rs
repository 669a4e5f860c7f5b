/// Lowercases and strips Portuguese diacritics.
///
/// Every input char maps to exactly one output char, so char positions found in the
/// folded string line up with the original.
pub fn fold(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    let lower = c.to_lowercase().next().unwrap_or(c);
    match lower {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Finds `needle` in `haystack` (both already folded) at a word boundary, returning the
/// char index of the match.
pub fn find_word(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&start| matches_word_at(haystack, needle, start))
}

pub fn matches_word_at(haystack: &[char], needle: &[char], start: usize) -> bool {
    let end = start + needle.len();
    if end > haystack.len() || haystack[start..end] != *needle {
        return false;
    }
    let before_ok = start == 0 || !is_word_char(haystack[start - 1]);
    let after_ok = end == haystack.len() || !is_word_char(haystack[end]);
    before_ok && after_ok
}

/// Word-bounded, accent-insensitive containment.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    let haystack: Vec<char> = fold(text).chars().collect();
    let needle: Vec<char> = fold(phrase).chars().collect();
    find_word(&haystack, &needle, 0).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_accents_and_case() {
        assert_eq!(fold("Título Descrição AMANHÃ"), "titulo descricao amanha");
    }

    #[test]
    fn fold_keeps_char_count() {
        let original = "Início çÇ ÃÕ";
        assert_eq!(fold(original).chars().count(), original.chars().count());
    }

    #[test]
    fn contains_phrase_respects_word_boundaries() {
        assert!(contains_phrase("Está em andamento", "andamento"));
        assert!(contains_phrase("status: em andamento", "em andamento"));
        assert!(!contains_phrase("todos os dias", "todo"));
    }

    #[test]
    fn find_word_starts_from_offset() {
        let haystack: Vec<char> = "prazo e prazo".chars().collect();
        let needle: Vec<char> = "prazo".chars().collect();
        assert_eq!(find_word(&haystack, &needle, 0), Some(0));
        assert_eq!(find_word(&haystack, &needle, 1), Some(8));
    }
}
