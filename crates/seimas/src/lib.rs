pub mod existing;
pub mod output;
mod parser;
pub mod scraper;
mod table;
pub mod types;
pub mod wikidata;

pub use existing::ExistingMembers;
pub use parser::{ColumnLayout, MEMBERS_TABLE_LAYOUT, ParseError};
pub use scraper::{ScraperError, WebScraper};

pub const PAGE_URL: &str = "https://en.wikipedia.org/wiki/Eleventh_Seimas_of_Lithuania";

/// Header-less `label,item` export of every member already on Wikidata.
pub const EXISTING_MEMBERS_CSV: &str = "all-members.csv";

pub(crate) const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub(crate) const MEMBERS_ANCHOR: &str = "Members";
