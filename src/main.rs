mod args;
mod arxiv;
mod render;
mod share;
mod tool;
mod tools;

use std::io::{self, Write};

use clap::FromArgMatches;
use tracing_subscriber::EnvFilter;

use crate::tool::{Output, Tool};
use anyhow::{Context, anyhow};

// Registers each tool as a subcommand and dispatches to the one picked.
macro_rules! toolbox {
    ($cmd:ident, $(($tool:path, $name:literal, $($alias:literal),*)),+) => {
        {
            // Register the tools.
            $(
                $cmd = $cmd.subcommand(
                    <$tool>::cli()
                    .name($name)
                    $(.alias($alias))*
                );
            )*

            // Parse args.
            let matches = $cmd.get_matches();
            let (subcommand_name, subcommand_matches) = matches
                .subcommand()
                .context("Could not determine subcommand")?;

            // Run the specific tool.
            match subcommand_name {
                $(
                    $name => {
                        let output = <$tool>::from_arg_matches(subcommand_matches)
                            .context("Could not initialize the tool")?
                            .execute()
                            .context("Could not execute tool")?;

                        Ok(output)
                    }
                )*
                _ => {
                    Err(anyhow!("Unknown subcommand"))
                }
            }
        }
    };
}

// Logs go to stderr so they never mix with image bytes on stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("AQRXIV_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn,aqrxiv::tools::serve=info,tower_http=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut cli = clap::builder::Command::new("aqrxiv")
        .about("styled, shareable QR codes for arXiv papers")
        .subcommand_required(true);

    let output = toolbox!(
        cli,
        (tools::qr::QRTool, "qr",),
        (tools::resolve::ResolveTool, "resolve",),
        (tools::serve::ServeTool, "serve",),
        (tools::share::ShareTool, "share",)
    )
    .context("Could not run tool")?;

    match output {
        Some(Output::Bytes(bytes)) => {
            io::stdout()
                .write_all(&bytes)
                .context("Could not write bytes to stdout")?;
        }
        Some(Output::Text(text)) => {
            println!("{text}");
        }
        Some(Output::JsonValue(value)) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&value).context("Could not serialize result")?
            );
        }
        None => {}
    }

    Ok(())
}
