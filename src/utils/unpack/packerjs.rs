use std::{collections::HashMap, fmt, sync::OnceLock};

use regex::{Captures, Regex, RegexBuilder};

use crate::utils::text::unescape_js_string;

/// Unpacks P.A.C.K.E.R. packed js code.
pub fn unpack(source: &str) -> Result<String, UnpackError> {
    static WORD_RE: OnceLock<Regex> = OnceLock::new();

    if !detect(source) {
        return Err(UnpackError::new("Not a p.a.c.k.e.r. payload."));
    }

    let args = filter_args(source)?;

    if args.count != args.symtab.len() {
        return Err(UnpackError::new("Malformed p.a.c.k.e.r. symtab."));
    }

    let payload = unescape_js_string(args.payload);
    let mut out_of_range = None;

    let unpacked = WORD_RE
        .get_or_init(|| Regex::new(KEY_PATTERN).unwrap())
        .replace_all(&payload, |cap: &Captures| {
            let word = &cap[0];
            let Some(idx) = unbase(args.radix, word) else {
                return word.to_owned();
            };

            match args.symtab.get(idx) {
                Some(sym) if !sym.is_empty() => (*sym).to_owned(),
                Some(_) => word.to_owned(),
                None => {
                    out_of_range.get_or_insert(idx);
                    word.to_owned()
                }
            }
        });

    if let Some(idx) = out_of_range {
        return Err(UnpackError::index_out_of_range(idx, args.symtab.len()));
    }

    Ok(unpacked.into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackError {
    message: String,
}

impl UnpackError {
    fn new(message: &str) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn index_out_of_range(idx: usize, len: usize) -> Self {
        Self {
            message: format!("Symtab index {idx} out of range (symtab size {len})."),
        }
    }
}

impl fmt::Display for UnpackError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unpack error: {}", &self.message)
    }
}

impl std::error::Error for UnpackError {}

/// True when `source` starts with a packer bootstrap, ignoring whitespace.
pub fn detect(source: &str) -> bool {
    source
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .take(PACKER_PREFIX.len())
        .eq(PACKER_PREFIX.chars())
}

const PACKER_PREFIX: &str = "eval(function(p,a,c,k,e,";

// JS `\b` and `\w` are ASCII only, so `1à` holds key `1`
const KEY_PATTERN: &str = "[0-9A-Za-z_]+";

const ALPHABET_62: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHABET_95: &str = r##" !"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\]^_`abcdefghijklmnopqrstuvwxyz{|}~"##;

/// Decodes a key in the packer's radix. `None` means the word is not a key.
fn unbase(base: u32, string: &str) -> Option<usize> {
    static ALPHABET_62_DICT: OnceLock<HashMap<char, u32>> = OnceLock::new();
    static ALPHABET_95_DICT: OnceLock<HashMap<char, u32>> = OnceLock::new();

    match base {
        // keys are emitted in lowercase by Number.prototype.toString
        2..=36 if string.bytes().any(|b| b.is_ascii_uppercase()) => None,
        2..=36 => usize::from_str_radix(string, base).ok(),
        37..=62 => dict_convert(
            base,
            string,
            ALPHABET_62_DICT.get_or_init(|| alphabet_dict(ALPHABET_62)),
        ),
        _ => dict_convert(
            base,
            string,
            ALPHABET_95_DICT.get_or_init(|| alphabet_dict(ALPHABET_95)),
        ),
    }
}

fn alphabet_dict(alphabet: &str) -> HashMap<char, u32> {
    alphabet
        .chars()
        .enumerate()
        .map(|(idx, ch)| (ch, idx as u32))
        .collect()
}

fn dict_convert(base: u32, string: &str, dict: &HashMap<char, u32>) -> Option<usize> {
    string.chars().try_fold(0usize, |acc, ch| {
        let digit = *dict.get(&ch)?;
        if digit >= base {
            return None;
        }
        acc.checked_mul(base as usize)?.checked_add(digit as usize)
    })
}

#[derive(Debug, PartialEq)]
struct PackerArgs<'a> {
    payload: &'a str,
    symtab: Vec<&'a str>,
    radix: u32,
    count: usize,
}

fn filter_args(source: &str) -> Result<PackerArgs<'_>, UnpackError> {
    static JUICER1: OnceLock<Regex> = OnceLock::new();
    static JUICER2: OnceLock<Regex> = OnceLock::new();

    let juicers = [
        JUICER1.get_or_init(|| {
            RegexBuilder::new(
                r"}\('(.*)', *(\d+|\[\]), *(\d+), *'(.*)'\.split\('\|'\), *(\d+), *(.*)\)\)",
            )
            .dot_matches_new_line(true)
            .build()
            .unwrap()
        }),
        JUICER2.get_or_init(|| {
            RegexBuilder::new(r"}\('(.*)', *(\d+|\[\]), *(\d+), *'(.*)'\.split\('\|'\)")
                .dot_matches_new_line(true)
                .build()
                .unwrap()
        }),
    ];

    for juicer in juicers {
        let maybe_args = juicer.captures(source).and_then(|caps| {
            let payload = caps.get(1)?.as_str();

            let radix = match caps.get(2)?.as_str() {
                "[]" => 62,
                radix => radix.parse::<u32>().ok().filter(|r| *r >= 2)?,
            };

            let count = caps.get(3)?.as_str().parse::<usize>().ok()?;
            let symtab: Vec<_> = caps.get(4)?.as_str().split('|').collect();

            Some(PackerArgs {
                payload,
                symtab,
                radix,
                count,
            })
        });

        if let Some(args) = maybe_args {
            return Ok(args);
        }
    }

    Err(UnpackError::new(
        "Could not make sense of p.a.c.k.e.r data (unexpected code structure)",
    ))
}
