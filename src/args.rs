use crate::arxiv::{self, LinkMode};
use crate::render;
use crate::share::{self, CenterLabel, Format, QrOptions, ShareConfig, Style};
use anyhow::bail;
use clap::Args;
use std::io::{self, Read};
use std::str::FromStr;

/// The one message shown for every input that does not resolve.
pub const INVALID_INPUT: &str = "Enter a valid arXiv ID or URL";

/// A type for clap argument parsing that supports reading from stdin
/// when the value is "-" and allows escaping "-" with "\-".
#[derive(Debug, Clone)]
pub struct StringInput(pub String);

impl FromStr for StringInput {
    type Err = std::io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-" {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(StringInput(buffer))
        } else if s == r"\-" {
            Ok(StringInput("-".to_string()))
        } else {
            Ok(StringInput(s.to_string()))
        }
    }
}

impl AsRef<str> for StringInput {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StringInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generation options shared by the tools that build codes or share links.
/// Anything left unset keeps the value it already had.
#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Link shape to encode, overrides the shape of the input link
    #[arg(short, long, value_enum)]
    pub mode: Option<LinkMode>,

    /// Image format
    #[arg(short, long, value_enum)]
    pub fmt: Option<Format>,

    /// Image side in pixels
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub size: Option<u32>,

    /// Quiet zone around the code, in modules
    #[arg(long, value_parser = clap::value_parser!(u32).range(..=render::MAX_SIZE as i64))]
    pub margin: Option<u32>,

    /// Module style
    #[arg(long, value_enum)]
    pub style: Option<Style>,

    /// Badge drawn in the middle of the code
    #[arg(long, value_enum)]
    pub center: Option<CenterLabel>,

    /// Caption under the code (defaults to "arXiv:<id>", pass "" for none)
    #[arg(short, long)]
    pub caption: Option<String>,
}

impl GenerateArgs {
    fn apply(&self, options: &mut QrOptions) {
        if let Some(mode) = self.mode {
            options.mode = mode;
        }
        if let Some(fmt) = self.fmt {
            options.fmt = fmt;
        }
        if let Some(size) = self.size {
            options.size = size;
        }
        if let Some(margin) = self.margin {
            options.margin = margin;
        }
        if let Some(style) = self.style {
            options.style = style;
        }
        if let Some(center) = self.center {
            options.center_label = center;
        }
        if let Some(caption) = &self.caption {
            options.caption = caption.clone();
        }
    }

    /// Build a configuration for a freshly entered ID or link. The mode the
    /// link was written in is only kept when no mode was selected.
    pub fn config_for_input(&self, input: &str) -> anyhow::Result<ShareConfig> {
        let Some(ident) = arxiv::resolve(input) else {
            bail!(INVALID_INPUT);
        };

        let mut options = QrOptions {
            mode: ident.mode,
            caption: arxiv::default_caption(&ident.id),
            ..QrOptions::default()
        };
        self.apply(&mut options);

        Ok(ShareConfig {
            id: ident.id,
            options,
        })
    }

    /// Restore a configuration from a share link, then apply overrides.
    pub fn config_for_share(&self, link: &str) -> anyhow::Result<ShareConfig> {
        let Some(mut config) = share::decode(link)
            .into_config()
            .filter(|config| arxiv::is_valid_id(&config.id))
        else {
            bail!("The share link does not name a valid arXiv ID");
        };

        if config.options.caption.is_empty() {
            config.options.caption = arxiv::default_caption(&config.id);
        }
        self.apply(&mut config.options);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_keeps_resolved_mode() {
        let config = GenerateArgs::default()
            .config_for_input("https://arxiv.org/pdf/2501.01234.pdf")
            .unwrap();
        assert_eq!(config.id, "2501.01234");
        assert_eq!(config.options.mode, LinkMode::Pdf);
        assert_eq!(config.options.caption, "arXiv:2501.01234");
        assert_eq!(config.options.size, share::DEFAULT_SIZE);
    }

    #[test]
    fn test_selected_mode_wins() {
        let args = GenerateArgs {
            mode: Some(LinkMode::Doi),
            ..GenerateArgs::default()
        };
        let config = args
            .config_for_input("https://arxiv.org/pdf/2501.01234.pdf")
            .unwrap();
        assert_eq!(config.options.mode, LinkMode::Doi);
    }

    #[test]
    fn test_empty_caption_is_kept() {
        let args = GenerateArgs {
            caption: Some(String::new()),
            ..GenerateArgs::default()
        };
        let config = args.config_for_input("2501.01234").unwrap();
        assert_eq!(config.options.caption, "");
    }

    #[test]
    fn test_invalid_input() {
        let err = GenerateArgs::default()
            .config_for_input("https://example.com/abs/2501.01234")
            .unwrap_err();
        assert_eq!(err.to_string(), INVALID_INPUT);
    }

    #[test]
    fn test_share_link_with_overrides() {
        let args = GenerateArgs {
            fmt: Some(Format::Svg),
            ..GenerateArgs::default()
        };
        let config = args
            .config_for_share("/?id=2501.01234&mode=pdf&size=abc&style=plain")
            .unwrap();
        assert_eq!(config.options.mode, LinkMode::Pdf);
        assert_eq!(config.options.fmt, Format::Svg);
        assert_eq!(config.options.size, share::DEFAULT_SIZE);
        assert_eq!(config.options.style, Style::Plain);
        assert_eq!(config.options.caption, "arXiv:2501.01234");
    }

    #[test]
    fn test_margin_flag_is_bounded() {
        #[derive(clap::Parser)]
        struct Cli {
            #[command(flatten)]
            options: GenerateArgs,
        }

        use clap::Parser;
        let cli = Cli::try_parse_from(["qr", "--margin", "4096"]).unwrap();
        assert_eq!(cli.options.margin, Some(render::MAX_SIZE));
        assert!(Cli::try_parse_from(["qr", "--margin", "4097"]).is_err());
        assert!(Cli::try_parse_from(["qr", "--margin", "4294967295"]).is_err());
    }

    #[test]
    fn test_share_link_without_valid_id() {
        assert!(GenerateArgs::default().config_for_share("/?mode=pdf").is_err());
        assert!(
            GenerateArgs::default()
                .config_for_share("/?id=javascript:alert(1)")
                .is_err()
        );
    }
}
