//! Window title segmentation
//!
//! Splits a raw window title such as `"Inbox - Mail – Firefox"` into ordered
//! context segments and drops the noise: segments naming the owning
//! application again, or matching a configured noise token.

/// Separators between title segments: an en-dash, or a hyphen with a space
/// on both sides. A bare hyphen (`"re-run"`) is not a separator.
const EN_DASH: char = '–';
const SPACED_HYPHEN: &str = " - ";

/// Noise token used when no configuration overrides it
pub const DEFAULT_NOISE_TOKENS: &[&str] = &["youtube"];

/// Turns window titles into filtered context segments
#[derive(Debug, Clone)]
pub struct TitleSegmenter {
    /// Lowercased noise tokens
    noise_tokens: Vec<String>,
}

impl Default for TitleSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_TOKENS)
    }
}

impl TitleSegmenter {
    /// Create a segmenter with the given noise tokens (matched case-insensitively)
    pub fn new<I, S>(noise_tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            noise_tokens: noise_tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Noise tokens in lowercase form
    pub fn noise_tokens(&self) -> &[String] {
        &self.noise_tokens
    }

    /// Split `raw_title` into context segments for `process_name`
    ///
    /// The first segment is always kept. Every later segment is dropped if it
    /// contains a noise token or the process name, ignoring case.
    pub fn segment(&self, raw_title: &str, process_name: &str) -> Vec<String> {
        let process = process_name.trim().to_lowercase();

        split_title(raw_title)
            .enumerate()
            .filter(|(index, piece)| *index == 0 || !self.is_noise(piece, &process))
            .map(|(_, piece)| piece.to_string())
            .collect()
    }

    fn is_noise(&self, segment: &str, process: &str) -> bool {
        let lowered = segment.to_lowercase();
        if !process.is_empty() && lowered.contains(process) {
            return true;
        }
        self.noise_tokens
            .iter()
            .any(|token| lowered.contains(token.as_str()))
    }
}

/// Split on the separators, trimming pieces and skipping empty ones
fn split_title(raw_title: &str) -> impl Iterator<Item = &str> {
    raw_title
        .split(EN_DASH)
        .flat_map(|part| part.split(SPACED_HYPHEN))
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
}
