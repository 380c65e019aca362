use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::table::{self, GridRow};
use crate::types::{Field, MemberRecord, Schema};
use crate::wikidata::{WikidataLinks, title_from_href};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("No element with id '{0}' on the page")]
    MissingAnchor(String),
    #[error("No table follows the '{0}' anchor")]
    MissingTable(String),
    #[error("The members table has no rows with data cells")]
    NoMembers,
    #[error("Failed to parse date: {0}")]
    DateParse(String),
}

/// Positions of the data cells read from each row of the members table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub name: usize,
    pub party: usize,
    pub notes: usize,
}

/// Name, then a column that is not read (constituency or list position),
/// then party, then free-text notes.
pub const MEMBERS_TABLE_LAYOUT: ColumnLayout = ColumnLayout {
    name: 0,
    party: 2,
    notes: 3,
};

const START_MARKER: &str = "From ";
const END_MARKER: &str = "Until ";

static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("invalid selector: a"));

static RE_ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("invalid regex: iso date")
});

static RE_DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]+)\.?,?\s+(\d{4})\b")
        .expect("invalid regex: day month year")
});

static RE_MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b")
        .expect("invalid regex: month day year")
});

// The optional leading day lets a full (possibly invalid) date be skipped.
static RE_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(\d{1,2})(?:st|nd|rd|th)?\s+)?\b([a-z]+)\.?,?\s+(\d{4})\b")
        .expect("invalid regex: month year")
});

static RE_SLASHED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("invalid regex: slashed date")
});

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Footnote markers such as `[1]`.
fn is_note(element: ElementRef) -> bool {
    element.value().name() == "sup" && element.value().classes().any(|c| c == "reference")
}

fn inside_note(element: ElementRef, within: ElementRef) -> bool {
    is_note(element)
        || element
            .ancestors()
            .take_while(|n| n.id() != within.id())
            .filter_map(ElementRef::wrap)
            .any(is_note)
}

fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child)
            && !is_note(child)
        {
            collect_text(child, out);
        }
    }
}

/// Whitespace-collapsed text of an element, footnote markers excluded.
fn tidy_text(element: ElementRef) -> String {
    let mut text = String::new();
    collect_text(element, &mut text);
    normalize_whitespace(&text)
}

fn first_link(cell: ElementRef) -> Option<ElementRef> {
    cell.select(&LINK_SEL).find(|a| !inside_note(*a, cell))
}

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Month number from a full or abbreviated (at least three letters) name.
fn parse_month(month: &str) -> Option<u32> {
    let month = month.to_lowercase();
    if month.chars().count() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(&month))
        .map(|i| i as u32 + 1)
}

fn iso_date(text: &str) -> Option<(usize, NaiveDate)> {
    RE_ISO_DATE.captures_iter(text).find_map(|caps| {
        let date = NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )?;
        Some((caps.get(0)?.start(), date))
    })
}

fn day_month_year(text: &str) -> Option<(usize, NaiveDate)> {
    RE_DAY_MONTH_YEAR.captures_iter(text).find_map(|caps| {
        let date = NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            parse_month(&caps[2])?,
            caps[1].parse().ok()?,
        )?;
        Some((caps.get(0)?.start(), date))
    })
}

fn month_day_year(text: &str) -> Option<(usize, NaiveDate)> {
    RE_MONTH_DAY_YEAR.captures_iter(text).find_map(|caps| {
        let date = NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            parse_month(&caps[1])?,
            caps[2].parse().ok()?,
        )?;
        Some((caps.get(0)?.start(), date))
    })
}

/// Day first, as in `14/11/2012`.
fn slashed_date(text: &str) -> Option<(usize, NaiveDate)> {
    RE_SLASHED_DATE.captures_iter(text).find_map(|caps| {
        let date = NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            caps[2].parse().ok()?,
            caps[1].parse().ok()?,
        )?;
        Some((caps.get(0)?.start(), date))
    })
}

/// Month and year only; the date falls on the first of the month.
fn month_year(text: &str) -> Option<(usize, NaiveDate)> {
    RE_MONTH_YEAR.captures_iter(text).find_map(|caps| {
        if caps.get(1).is_some() {
            return None;
        }
        let date = NaiveDate::from_ymd_opt(caps[3].parse().ok()?, parse_month(&caps[2])?, 1)?;
        Some((caps.get(0)?.start(), date))
    })
}

/// The earliest date written in any of the supported styles. On a tie the
/// full date wins over month and year.
fn first_date(text: &str) -> Option<NaiveDate> {
    [
        iso_date(text),
        day_month_year(text),
        month_day_year(text),
        slashed_date(text),
        month_year(text),
    ]
    .into_iter()
    .flatten()
    .min_by_key(|(start, _)| *start)
    .map(|(_, date)| date)
}

/// Date written after `marker` in a notes cell, or `None` when the marker is
/// absent. A marker followed by no recognisable date is an error.
fn parse_tenure_date(notes: &str, marker: &str) -> Result<Option<NaiveDate>, ParseError> {
    let Some(pos) = notes.find(marker) else {
        return Ok(None);
    };
    first_date(&notes[pos + marker.len()..])
        .map(Some)
        .ok_or_else(|| {
            ParseError::DateParse(format!("No date after '{}' in: {}", marker.trim(), notes))
        })
}

/// The first table after the members anchor in document order, skipping
/// anything nested inside the anchor itself.
fn members_table(document: &Html) -> Result<ElementRef<'_>, ParseError> {
    let mut nodes = document.root_element().descendants();
    let anchor = nodes
        .by_ref()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().id() == Some(crate::MEMBERS_ANCHOR))
        .ok_or_else(|| ParseError::MissingAnchor(crate::MEMBERS_ANCHOR.to_string()))?;

    nodes
        .filter_map(ElementRef::wrap)
        .filter(|e| !e.ancestors().any(|a| a.id() == anchor.id()))
        .find(|e| e.value().name() == "table")
        .ok_or_else(|| ParseError::MissingTable(crate::MEMBERS_ANCHOR.to_string()))
}

fn member_rows(document: &Html) -> Result<Vec<GridRow<'_>>, ParseError> {
    let members = members_table(document)?;
    let rows: Vec<_> = table::unspan(members)
        .into_iter()
        .filter(GridRow::has_data)
        .collect();
    if rows.is_empty() {
        return Err(ParseError::NoMembers);
    }
    log::debug!("Found {} member rows", rows.len());
    Ok(rows)
}

/// Article titles linked from the name and party cells, the ones whose
/// Wikidata ids are needed to annotate the members table.
pub fn parse_member_link_titles(
    html: &str,
    layout: &ColumnLayout,
) -> Result<Vec<String>, ParseError> {
    let document = Html::parse_document(html);
    let mut titles = BTreeSet::new();

    for row in member_rows(&document)? {
        let cells = row.data_cells();
        for index in [layout.name, layout.party] {
            if let Some(title) = cells
                .get(index)
                .and_then(|cell| first_link(*cell))
                .and_then(|a| a.value().attr("href"))
                .and_then(title_from_href)
            {
                titles.insert(title);
            }
        }
    }

    Ok(titles.into_iter().collect())
}

fn parse_member(
    row: &GridRow,
    links: &WikidataLinks,
    layout: &ColumnLayout,
    schema: Schema,
) -> Result<MemberRecord, ParseError> {
    let cells = row.data_cells();
    let link_in = |index: usize| cells.get(index).and_then(|cell| first_link(*cell));
    let notes = || cells.get(layout.notes).map(|cell| tidy_text(*cell));

    let mut member = MemberRecord::new(schema);
    for field in schema.fields() {
        match field {
            Field::Id => {
                member.id = link_in(layout.name)
                    .and_then(|a| links.annotation(a))
                    .map(str::to_string)
            }
            Field::Name => member.name = link_in(layout.name).map(tidy_text),
            Field::Party => {
                member.party = link_in(layout.party)
                    .and_then(|a| links.annotation(a))
                    .map(str::to_string)
            }
            Field::PartyLabel => member.party_label = link_in(layout.party).map(tidy_text),
            Field::StartDate => {
                member.start_date = match notes() {
                    Some(notes) => parse_tenure_date(&notes, START_MARKER)?,
                    None => None,
                }
            }
            Field::EndDate => {
                member.end_date = match notes() {
                    Some(notes) => parse_tenure_date(&notes, END_MARKER)?,
                    None => None,
                }
            }
        }
    }
    Ok(member)
}

pub fn parse_member_list(
    html: &str,
    links: &WikidataLinks,
    layout: &ColumnLayout,
    schema: Schema,
) -> Result<Vec<MemberRecord>, ParseError> {
    let document = Html::parse_document(html);
    member_rows(&document)?
        .iter()
        .map(|row| parse_member(row, links, layout, schema))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_links() -> WikidataLinks {
        [
            ("Algirdas Butkevičius", "Q101"),
            ("Juozas Olekas", "Q102"),
            ("Viktor Uspaskich", "Q103"),
            ("Social Democratic Party of Lithuania", "Q201"),
            ("Labour Party (Lithuania)", "Q202"),
        ]
        .into_iter()
        .map(|(title, id)| (title.to_string(), id.to_string()))
        .collect()
    }

    fn parse_fixture(schema: Schema) -> Vec<MemberRecord> {
        let html = fs::read_to_string("fixtures/eleventh_seimas_members.html")
            .expect("Failed to read fixture");
        parse_member_list(&html, &fixture_links(), &MEMBERS_TABLE_LAYOUT, schema)
            .expect("Failed to parse members")
    }

    fn page_with_rows(rows: &str) -> String {
        format!(
            r#"<html><body>
            <h2 id="Members">Members</h2>
            <table><tr><th>Name</th><th>Seat</th><th>Party</th><th>Notes</th></tr>{rows}</table>
            </body></html>"#
        )
    }

    #[test]
    fn test_parse_member_list_from_fixture() {
        let members = parse_fixture(Schema::Tenure);

        assert_eq!(members.len(), 5, "Header row should be skipped");

        let first = &members[0];
        assert_eq!(first.id.as_deref(), Some("Q101"));
        assert_eq!(first.name.as_deref(), Some("Algirdas Butkevičius"));
        assert_eq!(first.party.as_deref(), Some("Q201"));
        assert_eq!(first.party_label.as_deref(), Some("Social Democratic Party"));
        assert_eq!(first.start_date, None);
        assert_eq!(first.end_date, None);
    }

    #[test]
    fn test_rowspanned_party_and_footnotes() {
        let members = parse_fixture(Schema::Tenure);
        let olekas = &members[1];

        assert_eq!(olekas.name.as_deref(), Some("Juozas Olekas"));
        assert_eq!(olekas.id.as_deref(), Some("Q102"));
        assert_eq!(olekas.party.as_deref(), Some("Q201"));
        assert_eq!(olekas.end_date, NaiveDate::from_ymd_opt(2014, 11, 14));
        assert_eq!(olekas.start_date, None);
    }

    #[test]
    fn test_start_date_from_iso_notes() {
        let members = parse_fixture(Schema::Tenure);
        let uspaskich = &members[2];

        assert_eq!(uspaskich.start_date, NaiveDate::from_ymd_opt(2012, 11, 14));
        assert_eq!(uspaskich.end_date, None);
        assert_eq!(uspaskich.party_label.as_deref(), Some("Labour Party"));
    }

    #[test]
    fn test_red_link_and_unlinked_party() {
        let members = parse_fixture(Schema::Tenure);
        let jonaitis = &members[3];

        assert_eq!(jonaitis.name.as_deref(), Some("Jonas Jonaitis"));
        assert_eq!(jonaitis.id, None);
        assert_eq!(jonaitis.party, None);
        assert_eq!(jonaitis.party_label, None);
    }

    #[test]
    fn test_row_without_links() {
        let members = parse_fixture(Schema::Tenure);
        let vacant = &members[4];

        assert_eq!(vacant.name, None);
        assert_eq!(vacant.id, None);
        assert_eq!(vacant.start_date, NaiveDate::from_ymd_opt(2013, 5, 3));
    }

    #[test]
    fn test_basic_schema_ignores_notes() {
        let html = page_with_rows(
            r#"<tr><td><a href="/wiki/A">A</a></td><td>1</td><td></td><td>From sometime</td></tr>"#,
        );
        let members = parse_member_list(
            &html,
            &WikidataLinks::new(),
            &MEMBERS_TABLE_LAYOUT,
            Schema::Basic,
        )
        .expect("Basic schema should not read notes");

        assert_eq!(members.len(), 1);
        assert_eq!(members[0].keys().count(), 4);
    }

    #[test]
    fn test_malformed_date_is_fatal() {
        let html = page_with_rows(
            r#"<tr><td><a href="/wiki/A">A</a></td><td>1</td><td></td><td>From sometime</td></tr>"#,
        );
        let result = parse_member_list(
            &html,
            &WikidataLinks::new(),
            &MEMBERS_TABLE_LAYOUT,
            Schema::Tenure,
        );

        assert!(matches!(result, Err(ParseError::DateParse(_))));
    }

    #[test]
    fn test_both_markers_take_their_own_dates() {
        let html = page_with_rows(
            r#"<tr><td><a href="/wiki/A">A</a></td><td>1</td><td></td>
               <td>From 1 May 2013 Until 2 June 2014</td></tr>"#,
        );
        let members = parse_member_list(
            &html,
            &WikidataLinks::new(),
            &MEMBERS_TABLE_LAYOUT,
            Schema::Tenure,
        )
        .expect("Failed to parse members");

        assert_eq!(members[0].start_date, NaiveDate::from_ymd_opt(2013, 5, 1));
        assert_eq!(members[0].end_date, NaiveDate::from_ymd_opt(2014, 6, 2));
    }

    #[test]
    fn test_header_only_table_has_no_members() {
        let html = page_with_rows("");
        let result = parse_member_list(
            &html,
            &WikidataLinks::new(),
            &MEMBERS_TABLE_LAYOUT,
            Schema::Tenure,
        );

        assert!(matches!(result, Err(ParseError::NoMembers)));
    }

    #[test]
    fn test_missing_anchor_and_table() {
        let no_anchor = "<html><body><table><tr><td>x</td></tr></table></body></html>";
        assert!(matches!(
            parse_member_link_titles(no_anchor, &MEMBERS_TABLE_LAYOUT),
            Err(ParseError::MissingAnchor(_))
        ));

        let no_table = r#"<html><body><table><tr><td>x</td></tr></table><h2 id="Members">Members</h2></body></html>"#;
        assert!(matches!(
            parse_member_link_titles(no_table, &MEMBERS_TABLE_LAYOUT),
            Err(ParseError::MissingTable(_))
        ));
    }

    #[test]
    fn test_parse_member_link_titles_from_fixture() {
        let html = fs::read_to_string("fixtures/eleventh_seimas_members.html")
            .expect("Failed to read fixture");

        let titles =
            parse_member_link_titles(&html, &MEMBERS_TABLE_LAYOUT).expect("Failed to parse");

        assert_eq!(
            titles,
            vec![
                "Algirdas Butkevičius",
                "Juozas Olekas",
                "Labour Party (Lithuania)",
                "Social Democratic Party of Lithuania",
                "Viktor Uspaskich",
            ]
        );
    }

    #[test]
    fn test_first_date_styles() {
        assert_eq!(
            first_date("14 November 2012"),
            NaiveDate::from_ymd_opt(2012, 11, 14)
        );
        assert_eq!(
            first_date("November 14, 2012"),
            NaiveDate::from_ymd_opt(2012, 11, 14)
        );
        assert_eq!(
            first_date("3rd Sept. 2015 (replaced)"),
            NaiveDate::from_ymd_opt(2015, 9, 3)
        );
        assert_eq!(first_date("2016-01-05"), NaiveDate::from_ymd_opt(2016, 1, 5));
        assert_eq!(first_date("the election"), None);
        assert_eq!(first_date("31 February 2013"), None);
    }

    #[test]
    fn test_first_date_partial_styles() {
        assert_eq!(first_date("May 2013"), NaiveDate::from_ymd_opt(2013, 5, 1));
        assert_eq!(
            first_date("Sept. 2015, after a by-election"),
            NaiveDate::from_ymd_opt(2015, 9, 1)
        );
        assert_eq!(first_date("14/11/2012"), NaiveDate::from_ymd_opt(2012, 11, 14));
        assert_eq!(
            first_date("14 November 2012"),
            NaiveDate::from_ymd_opt(2012, 11, 14),
            "A full date is preferred over its month and year"
        );
        assert_eq!(first_date("the 2012 election"), None);
        assert_eq!(first_date("31 February 2013"), None);
    }

    #[test]
    fn test_month_and_year_notes() {
        let html = page_with_rows(
            r#"<tr><td><a href="/wiki/A">A</a></td><td>1</td><td></td><td>From May 2013</td></tr>"#,
        );
        let members = parse_member_list(
            &html,
            &WikidataLinks::new(),
            &MEMBERS_TABLE_LAYOUT,
            Schema::Tenure,
        )
        .expect("Month and year should be accepted");

        assert_eq!(members[0].start_date, NaiveDate::from_ymd_opt(2013, 5, 1));
        assert_eq!(members[0].end_date, None);
    }

    #[test]
    fn test_parse_tenure_date_without_marker() {
        assert_eq!(parse_tenure_date("Resigned", START_MARKER).unwrap(), None);
    }
}
