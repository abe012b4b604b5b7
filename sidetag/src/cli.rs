use clap::{Args, Parser, Subcommand, ValueEnum};
use sidetag_core::Functionality;
use std::path::PathBuf;

/// Sidetag: tag files and folders in their names or in sidecar files.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file.
    #[arg(long, global = true, env = "SIDETAG_CONFIG", default_value = ".sidetag.json")]
    pub config: PathBuf,

    /// Tag library file.
    #[arg(long, global = true, env = "SIDETAG_LIBRARY", default_value = ".sidetag-library.json")]
    pub library: PathBuf,

    /// Increase verbosity (use multiple times for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add tags to files or folders.
    Add(AddArgs),
    /// Rename or move a tag of one entry.
    Edit(EditArgs),
    /// Remove tags from files or folders.
    Remove(RemoveArgs),
    /// Remove all tags from files or folders.
    Clear(ClearArgs),
    /// Show the tags of an entry.
    Show(ShowArgs),
    /// Collect the tags used in a location into the tag library.
    Collect(CollectArgs),
    /// Manage the tag library.
    Library(LibraryArgs),
}

/// Generated tag values.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneratedTag {
    Today,
    Tomorrow,
    Yesterday,
    CurrentMonth,
    CurrentYear,
    Now,
    /// A location, confirmed interactively.
    Geo,
    /// A date and time, confirmed interactively.
    Date,
}

impl From<GeneratedTag> for Functionality {
    fn from(value: GeneratedTag) -> Self {
        match value {
            GeneratedTag::Today => Functionality::Today,
            GeneratedTag::Tomorrow => Functionality::Tomorrow,
            GeneratedTag::Yesterday => Functionality::Yesterday,
            GeneratedTag::CurrentMonth => Functionality::CurrentMonth,
            GeneratedTag::CurrentYear => Functionality::CurrentYear,
            GeneratedTag::Now => Functionality::Now,
            GeneratedTag::Geo => Functionality::GeoTagging,
            GeneratedTag::Date => Functionality::DateTagging,
        }
    }
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Files or folders to tag.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Tag to add (repeatable).
    #[arg(long = "tag", short)]
    pub tags: Vec<String>,

    /// Generated tag to add (repeatable).
    #[arg(long = "generate", short, value_enum)]
    pub generated: Vec<GeneratedTag>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// File or folder carrying the tag.
    pub path: PathBuf,

    /// Current title of the tag.
    pub title: String,

    /// New title of the tag.
    #[arg(long)]
    pub to: Option<String>,

    /// Move the tag to this index.
    #[arg(long)]
    pub position: Option<usize>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Files or folders to untag.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Tag to remove (repeatable).
    #[arg(long = "tag", short, required = true)]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Files or folders to clear.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Do not ask for confirmation.
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// File or folder to show.
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Location to index and collect from.
    pub location: PathBuf,
}

#[derive(Args, Debug)]
pub struct LibraryArgs {
    #[command(subcommand)]
    pub command: LibraryCommands,
}

#[derive(Subcommand, Debug)]
pub enum LibraryCommands {
    /// List tag groups and their tags.
    List,
    /// Export the tag library as JSON.
    Export {
        /// Output file, stdout if omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Import tag groups from a JSON export.
    Import {
        file: PathBuf,

        /// Replace the library instead of merging into it.
        #[arg(long)]
        replace: bool,
    },
}
