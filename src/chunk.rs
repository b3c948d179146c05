//! Script segmentation: tokenizer and micro-chunk builder.
//!
//! Free-form meditation text is first tokenized into words with paragraph
//! breaks preserved as sentinel tokens, then regrouped into *micro-chunks*:
//! short spans of a handful of words, each spoken as one atomic provider
//! utterance and tagged with the boundary that follows it. The boundary tag
//! drives how much silence the pacing layer inserts after the chunk.

use crate::settings::PacingSettings;

/// What follows a micro-chunk, driving the pause inserted after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Chunk was closed mid-sentence (word budget reached).
    None,
    /// Chunk ends a sentence (`.`, `!`, `?`).
    Sentence,
    /// Chunk ends with a trailing ellipsis.
    Ellipsis,
    /// A paragraph break follows.
    Paragraph,
    /// A fixed breath pause follows; empty-text breath chunks are pure
    /// timed silences.
    Breath,
    /// Last content chunk of the session; no pause follows, the scheduler
    /// moves straight to end silence.
    Final,
}

/// One atomic utterance of the narration, plus its trailing boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroChunk {
    /// Text handed to the provider; empty for a pure timed pause.
    pub text: String,
    /// Number of words in `text`.
    pub word_count: usize,
    pub boundary: Boundary,
}

impl MicroChunk {
    fn spoken(text: String, boundary: Boundary) -> Self {
        let word_count = text.split_whitespace().count();
        Self {
            text,
            word_count,
            boundary,
        }
    }

    /// An empty chunk representing one breath of silence.
    pub fn breath() -> Self {
        Self {
            text: String::new(),
            word_count: 0,
            boundary: Boundary::Breath,
        }
    }

    /// True for chunks with no spoken component.
    pub fn is_silent(&self) -> bool {
        self.text.is_empty()
    }
}

/// A word with its punctuation attached, or a paragraph break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    ParagraphBreak,
}

/// Split raw script text into word tokens with paragraph sentinels.
///
/// Runs of blank lines (including whitespace-only lines) collapse into a
/// single [`Token::ParagraphBreak`]; remaining newlines and consecutive
/// whitespace collapse into single separators. Punctuation stays attached
/// to its word so boundary classification can inspect trailing characters.
/// No leading or trailing break tokens are emitted.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pending_break = false;

    for line in text.lines() {
        if line.trim().is_empty() {
            pending_break = !tokens.is_empty();
            continue;
        }
        if pending_break {
            tokens.push(Token::ParagraphBreak);
            pending_break = false;
        }
        for word in line.split_whitespace() {
            tokens.push(Token::Word(word.to_string()));
        }
    }

    tokens
}

/// Classify the boundary after `word`, given whether a paragraph break is
/// the next token. An upcoming break dominates any punctuation.
fn classify_boundary(word: &str, next_is_break: bool) -> Boundary {
    if next_is_break {
        return Boundary::Paragraph;
    }
    if word.ends_with("...") || word.ends_with('…') {
        return Boundary::Ellipsis;
    }
    if word.ends_with(['.', '!', '?']) {
        return Boundary::Sentence;
    }
    Boundary::None
}

/// Group tokens into micro-chunks of `min_words..=max_words` words.
///
/// A chunk closes when any of: the word budget is reached; a paragraph
/// break is next; a sentence or ellipsis boundary lands at or past
/// `min_words`; the token stream ends. A chunk closed at the very end of
/// the stream without punctuation is still tagged [`Boundary::Sentence`]
/// so the caller always sees a terminal boundary.
pub fn build_micro_chunks(tokens: &[Token], min_words: usize, max_words: usize) -> Vec<MicroChunk> {
    // Tolerate degenerate sizing from a hand-edited settings document.
    let min_words = min_words.max(1);
    let max_words = max_words.max(min_words);

    let mut chunks = Vec::new();
    let mut buf: Vec<&str> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let next = tokens.get(i + 1);
        let word = match token {
            Token::ParagraphBreak => {
                if !buf.is_empty() {
                    chunks.push(MicroChunk {
                        text: buf.join(" "),
                        word_count: buf.len(),
                        boundary: Boundary::Paragraph,
                    });
                    buf.clear();
                }
                continue;
            }
            Token::Word(word) => word,
        };

        buf.push(word);

        let next_is_break = matches!(next, Some(Token::ParagraphBreak));
        let boundary = classify_boundary(word, next_is_break);
        let is_last = next.is_none();

        let close = buf.len() >= max_words
            || next_is_break
            || (buf.len() >= min_words
                && matches!(boundary, Boundary::Sentence | Boundary::Ellipsis))
            || is_last;

        if close {
            let boundary = if boundary == Boundary::None && is_last {
                Boundary::Sentence
            } else {
                boundary
            };
            chunks.push(MicroChunk {
                text: buf.join(" "),
                word_count: buf.len(),
                boundary,
            });
            buf.clear();
        }
    }

    chunks
}

/// Override the last chunk's boundary with [`Boundary::Final`].
///
/// Run on the script sequence before any intro chunks are prepended, so
/// the final tag always lands on the last content chunk of the session.
pub fn mark_final(chunks: &mut [MicroChunk]) {
    if let Some(last) = chunks.last_mut() {
        last.boundary = Boundary::Final;
    }
}

/// Intro sequence spoken before the script when a title is supplied:
/// the title announcement, the breathing instruction, then three silent
/// breath pauses.
pub fn intro_chunks(title: &str) -> Vec<MicroChunk> {
    vec![
        MicroChunk::spoken(format!("Visualization: {title}."), Boundary::Breath),
        MicroChunk::spoken("Three deep breaths.".to_string(), Boundary::Breath),
        MicroChunk::breath(),
        MicroChunk::breath(),
        MicroChunk::breath(),
    ]
}

/// The full chunk sequence for one session: outro merged into the script,
/// final chunk marked, intro prepended when a title is given.
///
/// Shared by playback and by the pre-playback duration estimate so both
/// always agree on the sequence.
pub fn session_chunks(text: &str, title: Option<&str>, settings: &PacingSettings) -> Vec<MicroChunk> {
    let script = settings.full_script(text);
    let tokens = tokenize(&script);
    let mut chunks = build_micro_chunks(&tokens, settings.min_chunk_words, settings.max_chunk_words);
    mark_final(&mut chunks);

    match title {
        Some(title) => {
            let mut all = intro_chunks(title);
            all.append(&mut chunks);
            all
        }
        None => chunks,
    }
}
