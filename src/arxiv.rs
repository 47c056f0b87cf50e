use clap::ValueEnum;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use url::Url;

lazy_static! {
    // Modern identifiers, e.g. 2501.01234 or 2501.01234v2.
    pub static ref NEW_STYLE_ID: Regex = Regex::new(r"^[0-9]{4}\.[0-9]{4,5}(v[0-9]+)?$").unwrap();

    // Legacy identifiers, e.g. hep-th9901001 or math.GT0412108v1.
    pub static ref OLD_STYLE_ID: Regex =
        Regex::new(r"^[a-z-]+(\.[A-Z]{2})?[0-9]{7}(v[0-9]+)?$").unwrap();
}

// arXiv registers its DOIs under this prefix.
const ARXIV_DOI_PATH: &str = "/10.48550/arXiv.";

/// Which canonical link shape a QR code should point at.
#[derive(ValueEnum, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// The abstract page
    #[default]
    Abs,
    /// The PDF itself
    Pdf,
    /// The DOI resolver link
    Doi,
}

/// A canonical arXiv identifier along with the link shape it was found in.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ArxivIdentifier {
    pub id: String,
    pub mode: LinkMode,
}

impl ArxivIdentifier {
    fn new(id: &str, mode: LinkMode) -> Self {
        ArxivIdentifier {
            id: id.to_string(),
            mode,
        }
    }
}

pub fn is_valid_id(id: &str) -> bool {
    NEW_STYLE_ID.is_match(id) || OLD_STYLE_ID.is_match(id)
}

/// Parse a bare identifier or an arxiv.org / doi.org link.
///
/// Every kind of failure (not a URL, foreign host, unrecognized id shape)
/// collapses into `None`; callers surface a single generic message.
pub fn resolve(input: &str) -> Option<ArxivIdentifier> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if is_valid_id(trimmed) {
        return Some(ArxivIdentifier::new(trimmed, LinkMode::Abs));
    }

    let url = Url::parse(trimmed).ok()?;
    let host = url.host_str()?;

    let resolved = if host.contains("arxiv.org") {
        resolve_arxiv_path(url.path())
    } else if host.contains("doi.org") {
        resolve_doi_path(url.path())
    } else {
        None
    };

    tracing::debug!(input = trimmed, ?resolved, "resolved link");
    resolved
}

// Paths look like /abs/2501.01234 or /pdf/2501.01234v2.pdf.
fn resolve_arxiv_path(path: &str) -> Option<ArxivIdentifier> {
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    let (Some(category), Some(id)) = (segments.next(), segments.next()) else {
        return None;
    };

    let id = id.strip_suffix(".pdf").unwrap_or(id);
    if !is_valid_id(id) {
        return None;
    }

    let mode = match category {
        "pdf" => LinkMode::Pdf,
        _ => LinkMode::Abs,
    };

    Some(ArxivIdentifier::new(id, mode))
}

fn resolve_doi_path(path: &str) -> Option<ArxivIdentifier> {
    let id = path.strip_prefix(ARXIV_DOI_PATH)?;
    is_valid_id(id).then(|| ArxivIdentifier::new(id, LinkMode::Doi))
}

/// Build the link a QR code should encode. The id is trusted as is.
pub fn build_url(id: &str, mode: LinkMode) -> String {
    match mode {
        LinkMode::Abs => format!("https://arxiv.org/abs/{id}"),
        LinkMode::Pdf => format!("https://arxiv.org/pdf/{id}.pdf"),
        LinkMode::Doi => format!("https://doi.org/10.48550/arXiv.{id}"),
    }
}

/// The caption used when the user did not write one.
pub fn default_caption(id: &str) -> String {
    format!("arXiv:{id}")
}
