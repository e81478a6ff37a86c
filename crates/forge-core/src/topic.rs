//! Subject-domain selector and its built-in instruction blocks.

use serde::{Deserialize, Serialize};

/// Chooses which instruction block augments the generation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Topic {
    #[default]
    General,
    #[serde(rename = "Math/Science")]
    MathScience,
    Vocabulary,
    Programming,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::General,
        Topic::MathScience,
        Topic::Vocabulary,
        Topic::Programming,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Topic::General => "General",
            Topic::MathScience => "Math/Science",
            Topic::Vocabulary => "Vocabulary",
            Topic::Programming => "Programming",
        }
    }

    /// Storage key: the label lowercased with non-letters removed.
    pub fn key(&self) -> String {
        self.label()
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }

    /// Resolves a label, storage key or kebab-case name.
    pub fn parse(value: &str) -> Option<Self> {
        let wanted: String = value
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL.into_iter().find(|topic| topic.key() == wanted)
    }

    pub fn default_instruction(&self) -> &'static str {
        match self {
            Topic::General => GENERAL_INSTRUCTION,
            Topic::MathScience => MATH_SCIENCE_INSTRUCTION,
            Topic::Vocabulary => VOCABULARY_INSTRUCTION,
            Topic::Programming => PROGRAMMING_INSTRUCTION,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!("unknown topic '{s}' (expected general, math-science, vocabulary or programming)")
        })
    }
}

const GENERAL_INSTRUCTION: &str =
    "Create concise cards. Break down complex lists into multiple cards.";

const MATH_SCIENCE_INSTRUCTION: &str = r"Enforce MathJax syntax.
- Inline math: \( ... \)
- Display math: \[ ... \] or $$ ... $$
Ensure variables are clearly defined.

When the question on the front pertains to a general formula, e.g. how do you calculate a percentage increase, include a specific example to make the concept concrete. For example:
Front: How do you calculate a percentage, e.g. £30 is x % of £150?
Back: \[ \frac{\text{Part}}{\text{Whole}} \times 100\% = \text{Percent} \], e.g. \[ \frac{30}{150} \times 100\% = 20\% \]";

const VOCABULARY_INSTRUCTION: &str = r"You assist students with their study of vocabulary for the GRE.

Front of card: the single vocabulary word, plain text, lowercase (e.g. epidermis).
Back of card: the definition, then an etymological memory aid separated by <br><br><hr>.

Accepted input: `word, definition` or `word, definition, memory aid`, one entry per line or separated by semicolons. Trim whitespace, lowercase the word, keep any provided etymological hint.

Memory aids:
- NEVER guess etymology. Only use verified components; mark uncertainty with 'likely' or 'possibly', or fall back to a simple association.
- Format: <b>PREFIX</b>: [language] prefix for 'meaning' + <b>ROOT</b>: [language] root for 'meaning' + <b>SUFFIX</b>: [language] suffix for 'meaning'<br><i>Therefore, direct translation is '[literal meaning]'</i>

Example input: ineffable, too great for description in words
Front: ineffable
Back: too great for description in words<br><br><hr><i><b>IN</b></i>: Latin prefix for 'not' + <i><b>EF-</b></i>: Latin prefix for 'out' + <i><b>fārī</b></i>: Latin verb for 'speak'<br><i>Therefore, direct translation is 'not to be spoken about'</i>";

const PROGRAMMING_INSTRUCTION: &str = r#"Enforce <pre><code>...</code></pre> for code blocks.
Use a monospace font style for function names in text.
Front: A coding concept or "What is the output of...?"
Back: The explanation or code solution."#;
