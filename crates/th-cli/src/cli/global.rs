use clap::ValueEnum;
use th_config::OutputFormatSetting;

/// Shared output mode across all commands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Raw,
}

impl From<OutputFormatSetting> for OutputFormat {
    fn from(setting: OutputFormatSetting) -> Self {
        match setting {
            OutputFormatSetting::Json => Self::Json,
            OutputFormatSetting::Table => Self::Table,
            OutputFormatSetting::Raw => Self::Raw,
        }
    }
}

/// Global flags available before or after subcommands.
#[derive(Clone, Debug)]
pub struct GlobalFlags {
    pub format: OutputFormat,
    pub limit: Option<u32>,
    pub quiet: bool,
    pub verbose: bool,
    pub db: Option<String>,
}
