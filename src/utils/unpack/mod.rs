pub mod packerjs;

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use packerjs::UnpackError;

/// Finds the first packed script in a page or script body.
///
/// The payload ends after the packer's closing `))`. When the tail does not
/// look like a packer call it is cut at `</script>` or at the end of the line,
/// leaving the structural check to [`packerjs::unpack`].
pub fn locate_packed(text: &str) -> Option<&str> {
    static START_RE: OnceLock<Regex> = OnceLock::new();
    static TAIL_RE: OnceLock<Regex> = OnceLock::new();

    let start = START_RE
        .get_or_init(|| {
            Regex::new(r"eval\s*\(\s*function\s*\(\s*p\s*,\s*a\s*,\s*c\s*,\s*k\s*,\s*e\s*,").unwrap()
        })
        .find(text)?
        .start();

    let rest = &text[start..];

    let end = TAIL_RE
        .get_or_init(|| Regex::new(r"\.split\(\s*'\|'\s*\)[^)]*\)\)").unwrap())
        .find(rest)
        .map(|m| m.end())
        .or_else(|| rest.find("</script>"))
        .or_else(|| rest.find('\n'))
        .unwrap_or(rest.len());

    Some(&rest[..end])
}

/// Outcome of [`unpack_until`].
#[derive(Debug)]
pub struct UnpackRun<T> {
    /// Every text seen, the fetched page first. Never rewritten.
    pub passes: Vec<String>,
    pub found: Option<T>,
    /// Set when a pass was aborted by a malformed payload.
    pub error: Option<UnpackError>,
}

impl<T> UnpackRun<T> {
    /// Number of unpack passes that produced output.
    pub fn unpacked_layers(&self) -> usize {
        self.passes.len().saturating_sub(1)
    }
}

/// Repeatedly locates and unpacks nested packed scripts, probing every new
/// layer with `probe`. Stops at the first hit, when no more payloads are
/// found, on a malformed payload, or after `max_passes` layers. Without a hit
/// the retained layers are probed again from the newest to the page itself.
pub fn unpack_until<T>(
    page: &str,
    max_passes: usize,
    probe: impl Fn(&str) -> Option<T>,
) -> UnpackRun<T> {
    let mut run = UnpackRun {
        passes: vec![page.to_owned()],
        found: None,
        error: None,
    };

    for pass in 1..=max_passes {
        let current = run.passes.last().map(String::as_str).unwrap_or_default();

        let Some(payload) = locate_packed(current) else {
            debug!("[unpack] pass {pass}: no packed payload");
            break;
        };

        match packerjs::unpack(payload) {
            Ok(unpacked) => {
                debug!("[unpack] pass {pass}: unpacked {} chars", unpacked.len());
                let found = probe(&unpacked);
                run.passes.push(unpacked);

                if found.is_some() {
                    run.found = found;
                    return run;
                }
            }
            Err(err) => {
                debug!("[unpack] pass {pass}: {err}");
                run.error = Some(err);
                break;
            }
        }
    }

    run.found = run.passes.iter().rev().find_map(|text| probe(text));
    run
}
