use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::batch::Selection;
use crate::engine::SectionNumber;
use crate::engine::merge::ContentGroup;

#[derive(Parser, Debug)]
#[command(
    name = "sectionforge",
    version,
    about = "Idempotent enrichment of multilingual curriculum section records"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Enrich(EnrichArgs),
    Populate(PopulateArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = "content/sections")]
    pub records_dir: PathBuf,

    #[arg(long, conflicts_with = "records_dir")]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SelectionArgs {
    #[arg(long, conflicts_with_all = ["start", "end", "all"])]
    pub section: Option<u32>,

    #[arg(long, requires = "end", conflicts_with = "all")]
    pub start: Option<u32>,

    #[arg(long, requires = "start", conflicts_with = "all")]
    pub end: Option<u32>,

    #[arg(long, default_value_t = false)]
    pub all: bool,
}

impl SelectionArgs {
    pub fn selection(&self) -> Result<Selection> {
        match (self.section, self.start, self.end) {
            (Some(section), None, None) => Ok(Selection::Single(SectionNumber::new(section))),
            (None, Some(start), Some(end)) => Selection::range(start, end),
            (None, None, None) if self.all => Ok(Selection::All),
            (None, None, None) => bail!("choose records with --section, --start/--end or --all"),
            _ => bail!("--section cannot be combined with --start/--end"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum PassName {
    AssignIds,
    DeriveLocators,
    Fallback,
    Translate,
}

#[derive(Args, Debug, Clone)]
pub struct EnrichArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    #[arg(
        long = "pass",
        value_enum,
        default_values_t = [PassName::AssignIds, PassName::DeriveLocators, PassName::Fallback]
    )]
    pub passes: Vec<PassName>,

    #[arg(long)]
    pub translations: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FieldSet {
    All,
    Metadata,
    Vocabulary,
    Dialogues,
    Exercises,
}

impl FieldSet {
    pub fn groups(self) -> Vec<ContentGroup> {
        match self {
            Self::All => {
                let mut groups = ContentGroup::METADATA.to_vec();
                groups.extend([
                    ContentGroup::Vocabulary,
                    ContentGroup::Dialogues,
                    ContentGroup::Exercises,
                ]);
                groups
            }
            Self::Metadata => ContentGroup::METADATA.to_vec(),
            Self::Vocabulary => vec![ContentGroup::Vocabulary],
            Self::Dialogues => vec![ContentGroup::Dialogues],
            Self::Exercises => vec![ContentGroup::Exercises],
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PopulateArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    #[arg(long = "fields", value_enum, default_value_t = FieldSet::All)]
    pub fields: FieldSet,

    #[arg(long)]
    pub responses_dir: PathBuf,

    #[arg(long)]
    pub translations: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}
