//! Static correction tables for common mishearings of Dutch sounds.
//!
//! Speech recognition tends to normalize short sounds into letters or full
//! words ("oe" comes back as "hoe", "ui" as "eruit"). These tables nudge the
//! raw transcript back towards the sound the user most likely asked about.

/// Corrections applied before choosing what to say aloud.
///
/// Picks likely sounds over otherwise valid options. Note that this keeps
/// "q" and "y" from ever being announced as letter names.
/// Sorted by key for binary search.
const AUDITIVE_CORRECTIONS: &[(&str, &str)] = &[
    ("eruit", "ui"),
    ("eu", "euh"),
    ("hoe", "oeh"),
    ("q", "oeh"),
    ("rui", "ui"),
    ("y", "ei"),
];

/// Corrections applied before displaying the written form.
/// Sorted by key for binary search.
const VISUAL_CORRECTIONS: &[(&str, &str)] = &[
    ("a", "aa"),
    ("e", "ee"),
    ("eruit", "ui"),
    ("hoe", "oeh"),
    ("i", "ie"),
    ("o", "oo"),
    ("q", "oe"),
    ("rui", "ui"),
    ("u", "uu"),
    ("y", "ei"),
];

fn lookup(table: &'static [(&str, &str)], word: &str) -> Option<&'static str> {
    table.binary_search_by_key(&word, |(key, _)| key).ok().map(|idx| table[idx].1)
}

/// Substitute a word before synthesis. Words without an entry pass through.
pub fn correct_auditively(word: &str) -> &str {
    lookup(AUDITIVE_CORRECTIONS, word).unwrap_or(word)
}

/// Substitute a word before display. Words without an entry pass through.
pub fn correct_visually(word: &str) -> &str {
    lookup(VISUAL_CORRECTIONS, word).unwrap_or(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_sorted_for_binary_search() {
        for table in [AUDITIVE_CORRECTIONS, VISUAL_CORRECTIONS] {
            for pair in table.windows(2) {
                assert!(pair[0].0 < pair[1].0, "table not sorted at {:?}", pair[1].0);
            }
        }
    }

    #[test]
    fn visual_corrections_stretch_single_vowels() {
        assert_eq!(correct_visually("a"), "aa");
        assert_eq!(correct_visually("i"), "ie");
        assert_eq!(correct_visually("e"), "ee");
        assert_eq!(correct_visually("o"), "oo");
        assert_eq!(correct_visually("u"), "uu");
    }

    #[test]
    fn auditive_corrections_avoid_letter_names() {
        assert_eq!(correct_auditively("q"), "oeh");
        assert_eq!(correct_auditively("y"), "ei");
        assert_eq!(correct_auditively("eu"), "euh");
    }

    #[test]
    fn both_passes_fix_misheard_words() {
        assert_eq!(correct_auditively("hoe"), "oeh");
        assert_eq!(correct_visually("hoe"), "oeh");
        assert_eq!(correct_auditively("eruit"), "ui");
        assert_eq!(correct_visually("rui"), "ui");
    }

    #[test]
    fn unmapped_inputs_pass_through_unchanged() {
        for word in ["b", "aa", "euh", "banaan", ""] {
            assert_eq!(correct_auditively(word), word);
        }
        // "a" is stretched visually but untouched auditively.
        assert_eq!(correct_auditively("a"), "a");
        for word in ["b", "aa", "oeh", "banaan", ""] {
            assert_eq!(correct_visually(word), word);
        }
    }
}
