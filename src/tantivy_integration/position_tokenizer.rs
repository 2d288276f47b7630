//! Position-aware tokenizer for pre-tokenized corpus fields
//!
//! Token annotations and tag terms are indexed at explicit token positions
//! rather than at the positions a text tokenizer would assign. The field value
//! handed to tantivy is an encoded list of positions, each holding zero or more
//! terms.
//!
//! Example: tag terms for `<s>` spanning 5 tokens and `<np>` spanning tokens 3-4
//! - Position 0: "s\u{1}5"
//! - Position 1, 2: (no terms)
//! - Position 3: "np\u{1}2"

use tantivy::tokenizer::{Token, TokenStream, Tokenizer};

/// Name the tokenizer is registered under
pub const POSITIONAL_TOKENIZER: &str = "positional_terms";

/// Separates positions in an encoded field value
const POSITION_SEPARATOR: char = '\u{1e}';
/// Separates terms stacked on the same position
const TERM_SEPARATOR: char = '\u{1f}';

/// Token stream emitting every term at its own position
pub struct PositionalTermsTokenStream {
    /// terms[position] = terms indexed at that position
    terms: Vec<Vec<String>>,
    position: usize,
    term_index: usize,
    token: Token,
}

impl PositionalTermsTokenStream {
    pub fn new(terms: Vec<Vec<String>>) -> Self {
        Self {
            terms,
            position: 0,
            term_index: 0,
            token: Token::default(),
        }
    }
}

impl TokenStream for PositionalTermsTokenStream {
    fn advance(&mut self) -> bool {
        loop {
            if self.position >= self.terms.len() {
                return false;
            }

            let at_position = &self.terms[self.position];
            if self.term_index < at_position.len() {
                let term = &at_position[self.term_index];
                self.term_index += 1;
                if term.is_empty() {
                    continue;
                }
                self.token.text.clear();
                self.token.text.push_str(term);
                self.token.position = self.position;
                self.token.offset_from = self.position;
                self.token.offset_to = self.position + 1;
                return true;
            }

            self.position += 1;
            self.term_index = 0;
        }
    }

    fn token(&self) -> &Token {
        &self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.token
    }
}

/// Tokenizer decoding values produced by [`encode_positional_terms`]
#[derive(Clone)]
pub struct PositionalTermsTokenizer;

impl Tokenizer for PositionalTermsTokenizer {
    type TokenStream<'a> = PositionalTermsTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        let terms = text
            .split(POSITION_SEPARATOR)
            .map(|at| {
                if at.is_empty() {
                    Vec::new()
                } else {
                    at.split(TERM_SEPARATOR).map(str::to_string).collect()
                }
            })
            .collect();
        PositionalTermsTokenStream::new(terms)
    }
}

/// Encode per-position term lists into a field value for the tokenizer
pub fn encode_positional_terms(terms_per_position: &[Vec<String>]) -> String {
    let mut out = String::new();
    for (i, terms) in terms_per_position.iter().enumerate() {
        if i > 0 {
            out.push(POSITION_SEPARATOR);
        }
        for (j, term) in terms.iter().enumerate() {
            if j > 0 {
                out.push(TERM_SEPARATOR);
            }
            out.push_str(term);
        }
    }
    out
}

/// Encode one term per position (a token annotation layer)
pub fn encode_tokens(tokens: &[String]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            out.push(POSITION_SEPARATOR);
        }
        out.push_str(token);
    }
    out
}

/// Decode a stored token field value back into its tokens
pub fn decode_tokens(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(POSITION_SEPARATOR).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str) -> Vec<(String, usize)> {
        let mut tokenizer = PositionalTermsTokenizer;
        let mut stream = tokenizer.token_stream(text);
        let mut out = Vec::new();
        while stream.advance() {
            out.push((stream.token().text.clone(), stream.token().position));
        }
        out
    }

    #[test]
    fn test_stacked_terms_share_position() {
        let encoded = encode_positional_terms(&[
            vec!["s\u{1}5".to_string()],
            vec![],
            vec![],
            vec!["np\u{1}2".to_string(), "@type__full".to_string()],
        ]);
        assert_eq!(
            collect(&encoded),
            vec![
                ("s\u{1}5".to_string(), 0),
                ("np\u{1}2".to_string(), 3),
                ("@type__full".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_tokens_keep_punctuation_and_case() {
        let tokens: Vec<String> = ["The", "U.S.", ",", "ok"].iter().map(|s| s.to_string()).collect();
        let got = collect(&encode_tokens(&tokens));
        assert_eq!(got.len(), 4);
        assert_eq!(got[1], ("U.S.".to_string(), 1));
        assert_eq!(got[3], ("ok".to_string(), 3));
        assert_eq!(decode_tokens(&encode_tokens(&tokens)), tokens);
    }
}
