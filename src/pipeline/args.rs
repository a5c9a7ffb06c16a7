use clap::{Args, Parser};

/// Options controlling the AP pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct ApPipeArgs {
    /// Data ID to process, e.g. "visit=410915 ccd=25" (repeatable; omit for all data)
    #[arg(long = "id", value_name = "DATAID")]
    pub data_ids: Vec<String>,

    /// Number of processes the pipeline may use
    #[arg(short = 'j', long, default_value_t = 1)]
    pub processes: u32,

    /// Do not run the pipeline or create the database; report the requested data IDs only
    #[arg(long)]
    pub skip_pipeline: bool,

    /// Database URL to use instead of the workspace's SQLite file
    #[arg(long, value_name = "URL")]
    pub db_url: Option<String>,
}

impl Default for ApPipeArgs {
    fn default() -> Self {
        Self {
            data_ids: Vec::new(),
            processes: 1,
            skip_pipeline: false,
            db_url: None,
        }
    }
}

#[derive(Parser)]
#[command(name = "ap_pipe", no_binary_name = true)]
struct ApPipeParser {
    #[command(flatten)]
    args: ApPipeArgs,
}

impl ApPipeArgs {
    /// Parse pipeline options from a bare argument list (no program name).
    pub fn parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        ApPipeParser::try_parse_from(args).map(|parser| parser.args)
    }
}
