use crate::{
    args::{INVALID_INPUT, StringInput},
    arxiv::{self, LinkMode},
    tool::{Output, Tool},
};
use anyhow::bail;
use clap::{Command, CommandFactory, Parser};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "resolve", about = "Resolve an arXiv ID or link to its canonical form")]
pub struct ResolveTool {
    /// arXiv ID, arxiv.org link or arXiv DOI link (use "-" for stdin)
    input: StringInput,

    /// Link shape to build, overrides the shape of the input link
    #[arg(short, long, value_enum)]
    mode: Option<LinkMode>,
}

impl Tool for ResolveTool {
    fn cli() -> Command {
        ResolveTool::command()
    }

    fn execute(&self) -> anyhow::Result<Option<Output>> {
        let Some(ident) = arxiv::resolve(self.input.as_ref()) else {
            bail!(INVALID_INPUT);
        };

        let mode = self.mode.unwrap_or(ident.mode);

        Ok(Some(Output::JsonValue(json!({
            "id": ident.id,
            "mode": mode,
            "url": arxiv::build_url(&ident.id, mode),
        }))))
    }
}
