use clap::Parser;

/// Builds the charts and the anonymized comments of a tutoring survey, one folder per recipient.
/// Anything not passed as an option is asked interactively.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (name) The tutor. Used as the name of the tutor's results folder.
    #[clap(short, long, value_parser)]
    pub tutor: Option<String>,

    /// (file path) The answers of the survey, as CSV (one column per question, the first row
    /// holds the questions) or as an Excel .xlsx export. ".csv" is added if there is no extension.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path, optional) A JSON survey schema. Every key is optional; see the documentation
    /// of the survey_routing crate for the list of keys and their defaults.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory) Where the results folders are written. Overrides the schema.
    #[clap(long, value_parser)]
    pub results_dir: Option<String>,

    /// If passed, every results folder is also packed in a zip archive.
    #[clap(long, takes_value = false)]
    pub zip: bool,

    /// If passed, each person of the mail list receives the archive of everybody and their own.
    #[clap(long, takes_value = false)]
    pub send: bool,

    /// (file path) The people to send the results to, one 'name,address' per line.
    /// Implies --send.
    #[clap(long, value_parser)]
    pub mail_list: Option<String>,

    /// (file path) The account the results are sent from, as a single 'address,secret' line.
    #[clap(long, value_parser)]
    pub credentials: Option<String>,

    /// (integer) Fixes the order of the free-text answers. Only meant for reproducible tests.
    #[clap(long, value_parser)]
    pub shuffle_seed: Option<u64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
