use std::path::PathBuf;
use argh::FromArgs;

fn default_config_path () -> PathBuf {
    PathBuf::from("./dns_chat.toml")
}

#[derive(Debug, FromArgs)]
#[argh(description = "answers chat prompts encoded in DNS TXT queries")]
pub struct CliArgs {
    #[argh(
        option,
        description = "config file path, a missing file is skipped, default: './dns_chat.toml'",
        default = "default_config_path()"
    )]
    pub config: PathBuf,
}
