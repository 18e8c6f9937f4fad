//! Sort experiment files into a `Group/Timepoint/View` output tree.
//!
//! A file name is classified by two keywords into side view, ventral view or video,
//! and the entity name between a left and right delimiter becomes the output file stem:
//!
//! ```text
//! <target>/<Group>/<Timepoint>/Side view/<entity>.csv
//! <target>/<Group>/<Timepoint>/Ventral view/<entity>.csv
//! <target>/<Group>/<Timepoint>/Video/<entity>.mp4
//! ```

pub mod config;
pub mod context;
pub mod logger;
pub mod organizer;
pub mod parser;
pub mod path_builder;
pub mod report;
pub mod types;

pub use config::{OrganizeConfig, TransferMode, ViewsortConfig};
pub use context::{ContextMode, ContextSource};
pub use logger::RunLogger;
pub use organizer::{Action, Organizer, ParsedFile, PlannedFile};
pub use parser::{DelimiterPair, EntityExtractor, ExtractError, KeywordSet, NameParser, classify};
pub use path_builder::{Placement, build_destination, destination_path, files_identical, place};
pub use report::{FileOutcome, OutcomeStatus, RunReport};
pub use types::{Classification, DestinationDescriptor, GroupContext, ViewCategory};
