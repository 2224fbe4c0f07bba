//! Decoder for the substitution cipher AllAnime uses to hide source locations.
//!
//! AllAnime serves its provider links as tokens of concatenated two-character
//! hex pairs, each standing for one character of the real URL. A token may end
//! with a plain `:<port>` suffix which is not encoded. Decoding is a pure, total
//! function: pairs missing from the table pass through untouched.
//!
//! ```rust
//! use eizo::decoder::decode;
//!
//! // "/apivtwo/clock?id=7d"
//! let url = decode("175948514e4c4f57175b54575b5307515c050f5c");
//! assert_eq!(url, "https://allanime.day/apivtwo/clock.json?id=7d");
//! ```

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Domain prepended to decoded paths that start with `/`.
pub const DEFAULT_BASE: &str = "https://allanime.day";

/// Encoded pair to plain character.
///
/// Every pair is the lowercase hex of the character's ASCII code xor `0x38`.
pub static TABLE: [(&str, char); 53] = [
    ("08", '0'), ("09", '1'), ("0a", '2'), ("0b", '3'), ("0c", '4'),
    ("0d", '5'), ("0e", '6'), ("0f", '7'), ("00", '8'), ("01", '9'),
    ("59", 'a'), ("5a", 'b'), ("5b", 'c'), ("5c", 'd'), ("5d", 'e'),
    ("5e", 'f'), ("5f", 'g'), ("50", 'h'), ("51", 'i'), ("52", 'j'),
    ("53", 'k'), ("54", 'l'), ("55", 'm'), ("56", 'n'), ("57", 'o'),
    ("48", 'p'), ("49", 'q'), ("4a", 'r'), ("4b", 's'), ("4c", 't'),
    ("4d", 'u'), ("4e", 'v'), ("4f", 'w'), ("40", 'x'), ("41", 'y'),
    ("42", 'z'),
    ("17", '/'), ("07", '?'), ("05", '='), ("15", '-'), ("46", '~'),
    ("1e", '&'), ("02", ':'), ("10", '('), ("11", ')'), ("12", '*'),
    ("13", '+'), ("14", ','), ("03", ';'), ("1d", '%'), ("16", '.'),
    ("67", '_'),
    ("1b", '#'),
];

static LOOKUP: Lazy<HashMap<&'static str, char>> = Lazy::new(|| TABLE.iter().copied().collect());

/// Decodes a token into an absolute URL using [`DEFAULT_BASE`].
pub fn decode(token: &str) -> String {
    decode_with_base(token, DEFAULT_BASE)
}

/// Decodes a token, prefixing `base` when the result is a bare path.
///
/// Steps: split off the `:<port>` suffix at the first colon, map each
/// two-character chunk through [`TABLE`], re-append the suffix, expand the
/// `/clock` endpoint to `/clock.json`, then absolutize against `base`.
pub fn decode_with_base(token: &str, base: &str) -> String {
    let (body, port) = match token.find(':') {
        Some(idx) => token.split_at(idx),
        None => (token, ""),
    };

    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(chars.len() / 2 + port.len());
    for chunk in chars.chunks(2) {
        let pair: String = chunk.iter().collect();
        match LOOKUP.get(pair.as_str()) {
            Some(&c) => out.push(c),
            None => out.push_str(&pair),
        }
    }
    out.push_str(port);

    // Normalize first so an already expanded endpoint is not expanded twice
    let out = out.replace("/clock.json", "/clock").replace("/clock", "/clock.json");

    if out.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), out)
    } else {
        out
    }
}
