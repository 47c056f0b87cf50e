use crate::arxiv::LinkMode;
use clap::ValueEnum;
use serde::Serialize;
use url::{Url, form_urlencoded};

pub const DEFAULT_SIZE: u32 = 1024;
pub const DEFAULT_MARGIN: u32 = 4;

// An enumerated option that travels through the share query under its clap
// value name.
pub trait WireValue: ValueEnum {
    fn wire_name(&self) -> String {
        self.to_possible_value()
            .map(|value| value.get_name().to_string())
            .unwrap_or_default()
    }

    fn from_wire(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, false).ok()
    }
}

impl<T: ValueEnum> WireValue for T {}

/// Image format of the generated code.
#[derive(ValueEnum, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Png,
    Svg,
}

/// Visual style of the modules.
#[derive(ValueEnum, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Black dotted modules
    Plain,
    /// The same shapes in arXiv red
    #[default]
    Arxiv,
}

/// Badge drawn in the middle of the code.
#[derive(ValueEnum, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CenterLabel {
    None,
    Preprint,
    #[default]
    Arxiv,
}

impl CenterLabel {
    pub fn text(self) -> Option<&'static str> {
        match self {
            CenterLabel::None => None,
            CenterLabel::Preprint => Some("Preprint"),
            CenterLabel::Arxiv => Some("arXiv"),
        }
    }
}

/// Everything about a generated code except the paper it points at.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct QrOptions {
    pub mode: LinkMode,
    pub fmt: Format,
    pub size: u32,
    pub margin: u32,
    pub style: Style,
    #[serde(rename = "center")]
    pub center_label: CenterLabel,
    pub caption: String,
}

// The only place defaults are decided. Decoding, the CLI and the server all
// start from here.
impl Default for QrOptions {
    fn default() -> Self {
        QrOptions {
            mode: LinkMode::default(),
            fmt: Format::default(),
            size: DEFAULT_SIZE,
            margin: DEFAULT_MARGIN,
            style: Style::default(),
            center_label: CenterLabel::default(),
            caption: String::new(),
        }
    }
}

/// Complete, shareable generator state.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ShareConfig {
    pub id: String,
    #[serde(flatten)]
    pub options: QrOptions,
}

/// Best effort reading of a share query. A missing `id` means there is
/// nothing to restore.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedState {
    pub id: Option<String>,
    #[serde(flatten)]
    pub options: QrOptions,
}

impl SharedState {
    pub fn into_config(self) -> Option<ShareConfig> {
        Some(ShareConfig {
            id: self.id?,
            options: self.options,
        })
    }
}

/// Serialize a configuration into a relative `/?...` link.
pub fn encode(config: &ShareConfig) -> String {
    let options = &config.options;
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("id", &config.id)
        .append_pair("mode", &options.mode.wire_name())
        .append_pair("fmt", &options.fmt.wire_name())
        .append_pair("size", &options.size.to_string())
        .append_pair("margin", &options.margin.to_string())
        .append_pair("style", &options.style.wire_name())
        .append_pair("center", &options.center_label.wire_name())
        .append_pair("caption", &options.caption)
        .finish();

    format!("/?{query}")
}

/// Join an encoded share link onto an absolute base such as the public
/// address of a running `serve`.
pub fn absolute_share_url(base: &Url, config: &ShareConfig) -> Result<Url, url::ParseError> {
    base.join(&encode(config))
}

/// Read a share query. Accepts `a=b&c=d`, `?a=b`, `/?a=b` or a full URL.
///
/// Never fails: absent, empty or unrecognized values take their defaults.
pub fn decode(query: &str) -> SharedState {
    let query = query_part(query.trim());

    // The first occurrence of a key wins.
    let lookup = |key: &str| {
        form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    };

    let defaults = QrOptions::default();
    let state = SharedState {
        id: lookup("id"),
        options: QrOptions {
            mode: wire_or(lookup("mode"), defaults.mode),
            fmt: wire_or(lookup("fmt"), defaults.fmt),
            size: lookup("size")
                .and_then(|size| size.trim().parse::<u32>().ok())
                .unwrap_or(defaults.size),
            margin: lookup("margin")
                .and_then(|margin| margin.trim().parse::<u32>().ok())
                .unwrap_or(defaults.margin),
            style: wire_or(lookup("style"), defaults.style),
            center_label: wire_or(lookup("center"), defaults.center_label),
            caption: lookup("caption").unwrap_or(defaults.caption),
        },
    };

    tracing::debug!(?state, "decoded share query");
    state
}

fn wire_or<T: WireValue>(value: Option<String>, default: T) -> T {
    value
        .as_deref()
        .and_then(T::from_wire)
        .unwrap_or(default)
}

fn query_part(input: &str) -> &str {
    if let Some((_, query)) = input.split_once('?') {
        return query.split('#').next().unwrap_or_default();
    }

    input
}

/// Query string of a legacy `/{route}/{id}` redirect. Routes that carry no
/// mode leave it out, which reads back as `abs`.
pub fn redirect_location(id: &str, mode: Option<LinkMode>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("id", id);
    if let Some(mode) = mode {
        query.append_pair("mode", &mode.wire_name());
    }

    format!("/?{}", query.finish())
}
