//! Mirror references collected from "download table" pages.

use std::sync::OnceLock;

use log::{debug, info};
use regex::Regex;
use scraper::{Html, Selector};

use crate::{
    error::ExtractError,
    fetch::{FetchRequest, Fetcher},
    models::{MirrorReference, ProviderTag},
};

const DDL_HOST: &str = "https://guardahd.stream";
// self-referencing rows that point back to the catalog site
const SKIPPED_HOST: &str = "mostraguarda.stream";

enum TableSource {
    Rows(Vec<MirrorReference>),
    Script(String),
    Missing,
}

/// Reads `table#download-table` rows. Rows without a `window.open` target,
/// rows pointing back to the catalog and unsupported hosts are skipped.
pub fn collect_from_download_table(html: &str) -> Vec<MirrorReference> {
    match scan_document(&Html::parse_document(html)) {
        TableSource::Rows(refs) => refs,
        _ => vec![],
    }
}

/// Rebuilds the markup written by a script made of `document.write("…");` lines.
pub fn html_from_document_writes(js: &str) -> String {
    js.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("document.write("))
        .map(|line| {
            let line = line.strip_prefix("document.write(\"").unwrap_or(line);
            let line = line.strip_suffix("\");").unwrap_or(line);
            line.replace("\\'", "'")
        })
        .collect()
}

/// Collects mirrors from a title page. When the page has no download table
/// rows, the table is loaded from the external download script it embeds.
pub async fn collect_mirrors(
    fetcher: &dyn Fetcher,
    html: &str,
    referer: Option<&str>,
) -> Result<Vec<MirrorReference>, ExtractError> {
    let script_url = match scan_document(&Html::parse_document(html)) {
        TableSource::Rows(refs) => return Ok(refs),
        TableSource::Script(url) => url,
        TableSource::Missing => {
            debug!("[mirrors] no download table and no download script");
            return Ok(vec![]);
        }
    };

    debug!("[mirrors] loading download script {script_url}");

    let mut request = FetchRequest::get(&script_url);
    if let Some(referer) = referer {
        request = request.with_referer(referer);
    }
    let script = fetcher.fetch_text(request).await?.error_for_status()?;

    let generated = html_from_document_writes(&script.body);
    Ok(collect_from_download_table(&generated))
}

fn scan_document(document: &Html) -> TableSource {
    static ROW_SELECTOR: OnceLock<Selector> = OnceLock::new();
    static SCRIPT_SELECTOR: OnceLock<Selector> = OnceLock::new();

    let rows: Vec<_> = document
        .select(
            ROW_SELECTOR.get_or_init(|| Selector::parse("table#download-table tr[onclick]").unwrap()),
        )
        .filter_map(|row| row.attr("onclick"))
        .collect();

    if !rows.is_empty() {
        debug!("[mirrors] found {} download table rows", rows.len());
        let refs: Vec<_> = rows.into_iter().filter_map(mirror_from_onclick).collect();
        info!("[mirrors] collected {} mirrors", refs.len());
        return TableSource::Rows(refs);
    }

    document
        .select(SCRIPT_SELECTOR.get_or_init(|| {
            Selector::parse(r#"script[src*="guardahd.stream/ddl/"]"#).unwrap()
        }))
        .find_map(|script| script.attr("src"))
        .map(|src| TableSource::Script(script_url(src)))
        .unwrap_or(TableSource::Missing)
}

fn mirror_from_onclick(onclick: &str) -> Option<MirrorReference> {
    static WINDOW_OPEN_RE: OnceLock<Regex> = OnceLock::new();

    let link = WINDOW_OPEN_RE
        .get_or_init(|| Regex::new(r#"window\.open\(\s*['"](?<link>[^'"]+)['"]"#).unwrap())
        .captures(onclick)
        .and_then(|caps| Some(caps.name("link")?.as_str()))?;

    if link.contains(SKIPPED_HOST) {
        return None;
    }

    let Some(tag) = ProviderTag::detect(link) else {
        debug!("[mirrors] unsupported host: {link}");
        return None;
    };

    Some(MirrorReference::new(link, tag.to_string()))
}

fn script_url(src: &str) -> String {
    if src.starts_with("//") {
        format!("https:{src}")
    } else if src.starts_with('/') {
        format!("{DDL_HOST}{src}")
    } else {
        src.into()
    }
}
