// A subcommand of the aqrxiv binary.
pub trait Tool {
    // The clap::Command returned here is registered as a subcommand.
    fn cli() -> clap::Command;

    // Run the tool with the arguments parsed through the cli above. Tools
    // return what should be printed and never print themselves.
    fn execute(&self) -> anyhow::Result<Option<Output>>;
}

#[derive(Debug)]
pub enum Output {
    // Raw image data, written to stdout untouched.
    Bytes(Vec<u8>),
    // A single line such as a link, printed with a trailing newline.
    Text(String),
    JsonValue(serde_json::Value),
}
