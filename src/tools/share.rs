use crate::{
    args::{GenerateArgs, StringInput},
    arxiv,
    share::{self, ShareConfig},
    tool::{Output, Tool},
};
use anyhow::Context;
use clap::{Command, CommandFactory, Parser, Subcommand};
use serde_json::json;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "share", about = "Build and read shareable generator links")]
pub struct ShareTool {
    #[command(subcommand)]
    command: ShareCommand,
}

#[derive(Subcommand, Debug)]
enum ShareCommand {
    /// Build a share link for an arXiv ID or link
    Encode {
        /// arXiv ID, arxiv.org link or arXiv DOI link (use "-" for stdin)
        input: StringInput,

        #[command(flatten)]
        options: GenerateArgs,

        /// Make the link absolute against this address
        #[arg(long)]
        base: Option<Url>,
    },
    /// Read the generator state out of a share link or query string
    Decode {
        /// Share link, "/?..." path or bare query (use "-" for stdin)
        link: StringInput,
    },
}

impl Tool for ShareTool {
    fn cli() -> Command {
        ShareTool::command()
    }

    fn execute(&self) -> anyhow::Result<Option<Output>> {
        match &self.command {
            ShareCommand::Encode {
                input,
                options,
                base,
            } => {
                let config = options.config_for_input(input.as_ref())?;
                Ok(Some(Output::Text(share_link(&config, base.as_ref())?)))
            }
            ShareCommand::Decode { link } => {
                let state = share::decode(link.as_ref());
                let target = state
                    .id
                    .as_deref()
                    .filter(|id| arxiv::is_valid_id(id))
                    .map(|id| arxiv::build_url(id, state.options.mode));

                Ok(Some(Output::JsonValue(json!({
                    "state": state,
                    "target": target,
                }))))
            }
        }
    }
}

pub fn share_link(config: &ShareConfig, base: Option<&Url>) -> anyhow::Result<String> {
    match base {
        Some(base) => Ok(share::absolute_share_url(base, config)
            .context("Could not build share link")?
            .to_string()),
        None => Ok(share::encode(config)),
    }
}
