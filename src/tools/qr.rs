use crate::{
    args::{GenerateArgs, INVALID_INPUT, StringInput},
    arxiv,
    render,
    share::{self, ShareConfig, WireValue},
    tool::{Output, Tool},
};
use anyhow::{Context, Result, bail};
use base64::{Engine as _, engine::general_purpose};
use clap::{Command, CommandFactory, Parser};
use serde_json::json;
use std::{fs, path::PathBuf};

#[derive(Parser, Debug)]
#[command(name = "qr", about = "Generate a QR code for an arXiv paper")]
pub struct QRTool {
    /// arXiv ID, arxiv.org link or arXiv DOI link (use "-" for stdin)
    #[arg(required_unless_present = "share", conflicts_with = "share")]
    input: Option<StringInput>,

    /// Restore the generator state from a share link instead
    #[arg(long)]
    share: Option<StringInput>,

    #[command(flatten)]
    options: GenerateArgs,

    /// Save the code to this file, or into this directory under its default name
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the code as a data: URL instead of raw image bytes
    #[arg(long, conflicts_with = "output")]
    data_url: bool,
}

impl Tool for QRTool {
    fn cli() -> Command {
        QRTool::command()
    }

    fn execute(&self) -> Result<Option<Output>> {
        let config = match (&self.input, &self.share) {
            (_, Some(link)) => self.options.config_for_share(link.as_ref())?,
            (Some(input), None) => self.options.config_for_input(input.as_ref())?,
            (None, None) => bail!(INVALID_INPUT),
        };

        let target = arxiv::build_url(&config.id, config.options.mode);
        let image = render::render(&target, &config.options)
            .context("Failed to generate QR code")?;

        if let Some(output) = &self.output {
            // Save to file
            let path = if output.is_dir() {
                output.join(file_name(&config))
            } else {
                output.clone()
            };

            fs::write(&path, &image).context("Failed to save QR code image")?;
            tracing::info!(path = %path.display(), %target, "saved QR code");

            return Ok(Some(Output::JsonValue(json!({
                "file": path,
                "target": target,
                "share": share::encode(&config),
            }))));
        }

        if self.data_url {
            let encoded = general_purpose::STANDARD.encode(&image);
            return Ok(Some(Output::Text(format!(
                "data:{};base64,{}",
                render::mime_type(config.options.fmt),
                encoded
            ))));
        }

        Ok(Some(Output::Bytes(image)))
    }
}

/// Default download name, e.g. `arxiv-qr-2501.01234-pdf.svg`.
pub fn file_name(config: &ShareConfig) -> String {
    format!(
        "arxiv-qr-{}-{}.{}",
        config.id,
        config.options.mode.wire_name(),
        config.options.fmt.wire_name()
    )
}
