//! Dutch voice catalog for Piper TTS.
//!
//! Piper publishes a small set of Dutch voices. Only runtime-required fields
//! are included (sample rate, region, speaker id); users test voices
//! themselves to find what sounds best.

/// Essential metadata for a TTS voice.
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    pub speaker_id: i32,
    pub sample_rate: u32,
    pub region: &'static str,
}

/// Voice used when the requested one is unknown.
pub const DEFAULT_VOICE: &str = "nl_BE-nathalie-medium";

/// All voices as a compile-time constant slice (sorted by name for binary search).
const VOICES: &[(&str, Voice)] = &[
    ("nl_BE-nathalie-medium", Voice { speaker_id: 0, sample_rate: 22050, region: "Belgian Dutch" }),
    ("nl_BE-nathalie-x_low", Voice { speaker_id: 0, sample_rate: 16000, region: "Belgian Dutch" }),
    ("nl_BE-rdh-medium", Voice { speaker_id: 0, sample_rate: 22050, region: "Belgian Dutch" }),
    ("nl_BE-rdh-x_low", Voice { speaker_id: 0, sample_rate: 16000, region: "Belgian Dutch" }),
    ("nl_NL-mls-medium", Voice { speaker_id: 0, sample_rate: 22050, region: "Netherlands Dutch" }),
    ("nl_NL-mls_5809-low", Voice { speaker_id: 0, sample_rate: 16000, region: "Netherlands Dutch" }),
    ("nl_NL-mls_7432-low", Voice { speaker_id: 0, sample_rate: 16000, region: "Netherlands Dutch" }),
    ("nl_NL-pim-medium", Voice { speaker_id: 0, sample_rate: 22050, region: "Netherlands Dutch" }),
    ("nl_NL-ronnie-medium", Voice { speaker_id: 0, sample_rate: 22050, region: "Netherlands Dutch" }),
];

fn find(name: &str) -> Option<(&'static str, &'static Voice)> {
    VOICES.binary_search_by_key(&name, |(n, _)| n).ok().map(|idx| {
        let (found, voice) = &VOICES[idx];
        (*found, voice)
    })
}

/// Get voice metadata by name using binary search.
pub fn get_voice(name: &str) -> Option<&'static Voice> {
    find(name).map(|(_, voice)| voice)
}

/// Resolve a requested voice name against the catalog.
///
/// Prefer the requested voice; for unknown names fall back to the default,
/// and as a last resort to the first catalog entry.
pub fn select_voice(requested: &str) -> (&'static str, &'static Voice) {
    if let Some((name, voice)) = find(requested) {
        return (name, voice);
    }
    if let Some((name, voice)) = find(DEFAULT_VOICE) {
        return (name, voice);
    }
    let (name, voice) = &VOICES[0];
    (*name, voice)
}

/// Print all available voices.
pub fn print_voices() {
    println!("═══════════════════════════════════════════════════════");
    println!("  Piper TTS - Dutch Voices");
    println!("═══════════════════════════════════════════════════════");

    for region in ["Belgian Dutch", "Netherlands Dutch"] {
        let count = VOICES.iter().filter(|(_, v)| v.region == region).count();

        println!("\n── {} ({} voices) ──", region, count);
        println!("{:<24} {:<6} RATE", "VOICE", "ID");
        println!("{}", "─".repeat(44));

        for (name, voice) in VOICES.iter().filter(|(_, v)| v.region == region) {
            println!("{:<24} {:<6} {} Hz", name, voice.speaker_id, voice.sample_rate);
        }
    }

    println!("\n{}\n", "─".repeat(55));
    println!("Default: {}", DEFAULT_VOICE);
    println!();
    println!("Usage:");
    println!("  ./spelstem --tts-voice {}", DEFAULT_VOICE);
    println!();
    println!("Try different voices to find what sounds best to you!");
}

/// Print detailed information about a specific voice.
pub fn print_voice_info(name: &str) -> anyhow::Result<()> {
    let voice = get_voice(name).ok_or_else(|| anyhow::anyhow!("Voice '{}' not found. Run with --list-voices to see available voices", name))?;

    println!();
    println!("Voice: {}", name);
    println!("{}", "─".repeat(40));
    println!("Speaker ID:    {}", voice.speaker_id);
    println!("Region:        {}", voice.region);
    println!("Sample rate:   {} Hz", voice.sample_rate);
    println!();
    println!("Usage:");
    println!("  ./spelstem --tts-voice {}", name);
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_sorted_for_binary_search() {
        for pair in VOICES.windows(2) {
            assert!(pair[0].0 < pair[1].0, "catalog not sorted at {:?}", pair[1].0);
        }
    }

    #[test]
    fn known_voices_are_found() {
        let voice = get_voice("nl_NL-pim-medium").expect("catalog voice");
        assert_eq!(voice.sample_rate, 22050);
        assert_eq!(voice.region, "Netherlands Dutch");
        assert!(get_voice("en_US-amy-medium").is_none());
    }

    #[test]
    fn selection_prefers_the_requested_voice() {
        let (name, _) = select_voice("nl_NL-ronnie-medium");
        assert_eq!(name, "nl_NL-ronnie-medium");
    }

    #[test]
    fn selection_falls_back_for_unknown_names() {
        let (name, voice) = select_voice("Google Nederlands");
        assert_eq!(name, DEFAULT_VOICE);
        assert_eq!(voice.sample_rate, 22050);
    }
}
