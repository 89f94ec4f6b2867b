use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "rangezip")]
#[command(version)]
#[command(about = "Random-access unzip for local files and HTTP URLs", long_about = None)]
#[command(after_help = "Examples:\n  \
  rangezip data.zip                          extract everything from data.zip\n  \
  rangezip data.zip '*.txt' -x notes.txt     extract text files except notes.txt\n  \
  rangezip -p bundle.appx manifest.xml       send one entry to stdout\n  \
  rangezip -l https://example.com/big.zip    list a remote archive")]
pub struct Cli {
    /// ZIP file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Entries to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List files verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Write entry contents to stdout, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into DIR
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude entries that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Quiet mode
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }
}
