use clap::{Parser, Subcommand};

use crate::api::types::{CollectionType, SubjectType};

#[derive(Debug, Parser)]
#[command(
    name = "bgm",
    version,
    about = "Track anime progress on bgm.tv from the terminal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate in the browser and store the token
    Login,
    /// Show the logged in user
    Me,
    /// List anime collections of one status
    #[command(visible_aliases = ["ls", "l"])]
    List {
        #[arg(value_enum, default_value_t = CollectionType::Watch)]
        status: CollectionType,
    },
    /// Mark the next episode as watched
    #[command(visible_alias = "m")]
    Mark { subject_id: Option<u64> },
    /// Mark the last watched episode as unwatched
    #[command(visible_alias = "u")]
    Unmark { subject_id: Option<u64> },
    /// Edit a collection: next episode, status, rating, tags and comment
    #[command(visible_alias = "e")]
    Edit {
        subject_id: Option<u64>,
        /// Collection list to pick from when no subject id is given
        #[arg(short, long, value_enum, default_value_t = CollectionType::Watch)]
        status: CollectionType,
    },
    /// Add a subject to the watch list
    Add { subject_id: u64 },
    /// Weekly airing calendar
    Cal,
    /// Search subjects
    #[command(visible_alias = "s")]
    Search {
        keywords: Vec<String>,
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        #[arg(short = 't', long = "type", value_enum, default_value_t = SubjectType::Anime)]
        subject_type: SubjectType,
        #[arg(short = 'g', long = "tag")]
        tags: Vec<String>,
        /// Minimum score, clamped to 0-10
        #[arg(short, long, default_value_t = 5, allow_negative_numbers = true)]
        score: i64,
        /// Maximum rank
        #[arg(short, long, default_value_t = 2000)]
        rank: u32,
    },
    /// Subject details
    #[command(visible_alias = "i")]
    Info { subject_id: u64 },
}
