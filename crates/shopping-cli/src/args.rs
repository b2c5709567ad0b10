//! Command-line arguments.
//!
//! Argument structs carry the clap attributes and convert into the core
//! parameter types with `From`, so the core stays free of CLI concerns.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use shopping_core::{
    params::{CreateList, ListLists, UpdateList, DEFAULT_PAGE_SIZE},
    ListMode,
};

/// Bootstrap and inspect the shopping micro-service store
///
/// Creates the database and its tables, validates the persisted schema
/// version against the one this build expects, and offers a few shopping
/// list operations for checking a deployment by hand.
#[derive(Parser)]
#[command(version, about, name = "shoppingms")]
pub struct Args {
    /// Path to the SQLite database file. Defaults to
    /// $XDG_DATA_HOME/shoppingms/<db-name>.db
    #[arg(long, global = true, env = "SHOPPINGMS_DATABASE_FILE")]
    pub database_file: Option<PathBuf>,

    /// Logical database name, used for the default file name
    #[arg(long, global = true, default_value = "shoppingms")]
    pub db_name: String,

    /// Disable colored output and use plain text
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and tables and validate the schema version
    Init,
    /// Show the store state and persisted schema version
    Status,
    /// Manage shopping lists
    #[command(alias = "l")]
    List {
        #[command(subcommand)]
        command: ListCommands,
    },
}

#[derive(Subcommand)]
pub enum ListCommands {
    /// Create a shopping list (returns the existing one if the name is taken)
    Create(CreateListArgs),
    /// Rename a list or switch its mode
    Update(UpdateListArgs),
    /// Show a page of a user's lists
    Show(ShowListsArgs),
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// The list is being drawn up
    Preparation,
    /// The user is shopping
    Shopping,
}

impl From<ModeArg> for ListMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Preparation => ListMode::Preparation,
            ModeArg::Shopping => ListMode::Shopping,
        }
    }
}

#[derive(ClapArgs)]
pub struct CreateListArgs {
    /// Name of the list
    pub name: String,
    /// Owner of the list
    #[arg(short, long)]
    pub user: String,
    /// Initial mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,
}

impl From<CreateListArgs> for CreateList {
    fn from(args: CreateListArgs) -> Self {
        CreateList {
            user_id: args.user,
            name: args.name,
            mode: args.mode.map(Into::into),
        }
    }
}

#[derive(ClapArgs)]
pub struct UpdateListArgs {
    /// ID of the list
    pub id: u64,
    /// Owner of the list
    #[arg(short, long)]
    pub user: String,
    /// New name
    #[arg(short, long)]
    pub name: Option<String>,
    /// New mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,
}

impl From<UpdateListArgs> for UpdateList {
    fn from(args: UpdateListArgs) -> Self {
        UpdateList {
            user_id: args.user,
            id: args.id,
            name: args.name,
            mode: args.mode.map(Into::into),
        }
    }
}

#[derive(ClapArgs)]
pub struct ShowListsArgs {
    /// Owner of the lists
    #[arg(short, long)]
    pub user: String,
    /// Number of lists to skip
    #[arg(long, default_value_t = 0)]
    pub offset: u64,
    /// Maximum number of lists to show
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub count: u64,
}

impl From<ShowListsArgs> for ListLists {
    fn from(args: ShowListsArgs) -> Self {
        ListLists {
            user_id: args.user,
            offset: args.offset,
            count: args.count,
        }
    }
}
