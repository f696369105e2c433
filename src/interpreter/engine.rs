//! Question classification and reply construction.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::corrections::{correct_auditively, correct_visually};

/// Fixed question template that the assistant answers.
pub const QUESTION_PREFIX: &str = "Hoe schrijf je";

/// Template variant with an article ("Hoe schrijf je de oe?").
const ARTICLE_REQUEST: &str = "Hoe schrijf je de ";

/// Plain template followed by the requested word.
const WORD_REQUEST: &str = "Hoe schrijf je ";

/// Spoken between the two written forms of an ambiguous sound.
const ALTERNATIVE_PHRASE: &str = "Óf zo:";

/// Apologies spoken when the question template does not match.
const APOLOGIES: [&str; 8] = [
    "Ik heb je niet helemaal begrepen.",
    "Kun je het iets duidelijker zeggen?",
    "Sorry, die vraag begrijp ik niet.",
    "Ik heb het niet goed gehoord. Wil je het nog eens proberen?",
    "Kun je iets langzamer praten?",
    "Ik snap niet wat je bedoeld.",
    "Sorry, dat snap ik niet helemaal.",
    "Probeer het nog eens.",
];

/// Whether a transcript matches the expected question template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Understood,
    Unrecognized,
}

/// Written form(s) shown for a successful answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spelling {
    Single(String),
    /// Two valid spellings for one sound (e.g. "au"/"ou").
    Ambiguous(String, String),
}

/// One spoken message plus what to display, produced per transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Sentence to synthesize first.
    pub message: String,
    /// Written form(s) shown to the user.
    pub spelling: Option<Spelling>,
    /// Spoken before the second written form of an ambiguous spelling.
    pub continuation: Option<String>,
}

/// Classify a transcript against the question template.
pub fn classify(transcript: &str) -> Classification {
    if transcript.starts_with(QUESTION_PREFIX) { Classification::Understood } else { Classification::Unrecognized }
}

/// Build the answer for an understood question.
///
/// Strips the template to obtain the requested word, announces the auditive
/// correction and displays the visual one. Two sounds have more than one
/// valid written form and get both, separated by a follow-up phrase.
pub fn respond_success(transcript: &str) -> Reply {
    let (has_article, requested) = strip_request_prefix(transcript);
    let announced = correct_auditively(requested);
    let message = format!("{}\"{}\" schrijf je zo:", if has_article { "De " } else { "" }, announced);

    let spelling = match requested {
        "au" => Spelling::Ambiguous("au".to_string(), "ou".to_string()),
        "y" => Spelling::Ambiguous("ei".to_string(), "ij".to_string()),
        _ => Spelling::Single(correct_visually(requested).to_string()),
    };
    let continuation = matches!(spelling, Spelling::Ambiguous(..)).then(|| ALTERNATIVE_PHRASE.to_string());

    Reply { message, spelling: Some(spelling), continuation }
}

/// Strip the question template, returning whether the article form was used
/// and the requested word.
fn strip_request_prefix(transcript: &str) -> (bool, &str) {
    if let Some(rest) = transcript.strip_prefix(ARTICLE_REQUEST) {
        (true, rest)
    } else if let Some(rest) = transcript.strip_prefix(WORD_REQUEST) {
        (false, rest)
    } else {
        // Bare template, or run-on text glued to it.
        (false, transcript.get(QUESTION_PREFIX.len()..).unwrap_or("").trim_start())
    }
}

/// Interprets transcripts into replies.
///
/// Owns the randomness source used for apology selection, so tests can seed
/// it and replay a deterministic sequence.
pub struct Interpreter<R: Rng = StdRng> {
    rng: R,
}

impl Interpreter<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for Interpreter<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Interpreter<R> {
    /// Create an interpreter with an explicit randomness source.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Produce the reply for one transcript.
    pub fn respond(&mut self, transcript: &str) -> Reply {
        match classify(transcript) {
            Classification::Understood => respond_success(transcript),
            Classification::Unrecognized => self.respond_failure(),
        }
    }

    /// Pick one of the fixed apologies uniformly at random.
    pub fn respond_failure(&mut self) -> Reply {
        let message = APOLOGIES[self.rng.gen_range(0..APOLOGIES.len())].to_string();
        Reply { message, spelling: None, continuation: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Interpreter<StdRng> {
        Interpreter::with_rng(StdRng::seed_from_u64(42))
    }

    #[test]
    fn prefixed_transcripts_are_understood() {
        for transcript in ["Hoe schrijf je a", "Hoe schrijf je de oe", "Hoe schrijf je banaan", "Hoe schrijf je"] {
            assert_eq!(classify(transcript), Classification::Understood, "{:?}", transcript);
        }
    }

    #[test]
    fn other_transcripts_are_unrecognized() {
        for transcript in ["hoe schrijf je a", "Wat is een aap", "", "schrijf je Hoe"] {
            assert_eq!(classify(transcript), Classification::Unrecognized, "{:?}", transcript);
        }
    }

    #[test]
    fn single_vowel_is_stretched_for_display() {
        let reply = respond_success("Hoe schrijf je a");
        assert_eq!(reply.message, "\"a\" schrijf je zo:");
        assert_eq!(reply.spelling, Some(Spelling::Single("aa".to_string())));
        assert_eq!(reply.continuation, None);
    }

    #[test]
    fn au_yields_two_written_forms() {
        let reply = respond_success("Hoe schrijf je au");
        assert_eq!(reply.spelling, Some(Spelling::Ambiguous("au".to_string(), "ou".to_string())));
        assert_eq!(reply.continuation.as_deref(), Some("Óf zo:"));
    }

    #[test]
    fn y_is_announced_as_ei_and_yields_two_written_forms() {
        let reply = respond_success("Hoe schrijf je y");
        assert_eq!(reply.message, "\"ei\" schrijf je zo:");
        assert_eq!(reply.spelling, Some(Spelling::Ambiguous("ei".to_string(), "ij".to_string())));
        assert!(reply.continuation.is_some());
    }

    #[test]
    fn article_form_strips_the_article_and_prefixes_de() {
        let reply = respond_success("Hoe schrijf je de hoe");
        assert_eq!(reply.message, "De \"oeh\" schrijf je zo:");
        assert_eq!(reply.spelling, Some(Spelling::Single("oeh".to_string())));
    }

    #[test]
    fn bare_template_yields_an_empty_word() {
        let reply = respond_success("Hoe schrijf je");
        assert_eq!(reply.message, "\"\" schrijf je zo:");
        assert_eq!(reply.spelling, Some(Spelling::Single(String::new())));
    }

    #[test]
    fn failure_replies_come_from_the_fixed_apologies() {
        let mut interpreter = seeded();
        for _ in 0..32 {
            let reply = interpreter.respond_failure();
            assert!(APOLOGIES.contains(&reply.message.as_str()), "{:?}", reply.message);
            assert_eq!(reply.spelling, None);
            assert_eq!(reply.continuation, None);
        }
    }

    #[test]
    fn failure_selection_is_deterministic_under_a_seed() {
        let mut a = seeded();
        let mut b = seeded();
        for _ in 0..8 {
            assert_eq!(a.respond_failure(), b.respond_failure());
        }
    }

    #[test]
    fn respond_dispatches_on_classification() {
        let mut interpreter = seeded();
        let ok = interpreter.respond("Hoe schrijf je oe");
        assert!(ok.spelling.is_some());
        let sorry = interpreter.respond("Wat eten we vandaag");
        assert!(sorry.spelling.is_none());
        assert!(APOLOGIES.contains(&sorry.message.as_str()));
    }
}
