//! Detail page parser
//!
//! Extracts one entity from a single item's detail page. The page is an
//! ordered sequence of tables; the first ("info") and second ("details")
//! hold every required field, read row by row at fixed ordinals with one
//! conditional row. Later tables (links, map, movement history) are out of
//! scope. All-or-nothing: any missing landmark or pattern mismatch fails
//! the whole parse.

use anyhow::{Result, anyhow};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{PageParser, ParsingError, ParsingResult};
use crate::domain::constants::geokrety_org;
use crate::domain::geokret::{Geokret, GeokretType};

/// Literal label of the optional tracking-code row.
const TRACKING_CODE_LABEL: &str = "Tracking Code:";
/// Unit suffix stripped from the distance cell.
const DISTANCE_SUFFIX: &str = " km";

/// Parser for single-item detail pages.
pub struct DetailPageParser {
    table_selector: Selector,
    row_selector: Selector,
    cell_selector: Selector,
    emphasis_selector: Selector,
    link_selector: Selector,
    span_selector: Selector,
    featured_link_selector: Selector,
    image_link_selector: Selector,
    type_pattern: Regex,
    rating_pattern: Regex,
}

impl DetailPageParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            table_selector: compile("table")?,
            row_selector: compile("tr")?,
            cell_selector: compile("td")?,
            emphasis_selector: compile("strong")?,
            link_selector: compile("a")?,
            span_selector: compile("span")?,
            featured_link_selector: compile("span.obrazek_hi a")?,
            image_link_selector: compile("span.obrazek a")?,
            type_pattern: Regex::new(r"^GeoKret.*\((.+)\) by.*$")?,
            rating_pattern: Regex::new(r"^votes: (\d+), average rating: (.+)\. You .*$")?,
        })
    }

    /// Walk the info table rows in strict ordinal order, advancing past the
    /// tracking-code row only when its label is present.
    fn read_info_table(&self, table: ElementRef<'_>, kret: &mut Geokret) -> ParsingResult<()> {
        let rows: Vec<ElementRef<'_>> = table.select(&self.row_selector).collect();
        let mut cursor = 0;

        let row = row_at(&rows, cursor, "name row")?;
        let name = row
            .select(&self.emphasis_selector)
            .next()
            .ok_or_else(|| ParsingError::page_structure("name row", "no emphasized text"))?;
        kret.set_name(element_text(name));

        let row_text = normalized_text(row);
        let label = self
            .type_pattern
            .captures(&row_text)
            .and_then(|captures| captures.get(1))
            .ok_or_else(|| {
                ParsingError::page_structure(
                    "name row",
                    format!("type pattern did not match {row_text:?}"),
                )
            })?;
        kret.set_type(GeokretType::from_label(label.as_str())?);

        let owner_link = row
            .select(&self.link_selector)
            .next()
            .ok_or_else(|| ParsingError::page_structure("name row", "no owner link"))?;
        kret.set_owner(element_text(owner_link));
        let owner_href = owner_link
            .value()
            .attr("href")
            .ok_or_else(|| ParsingError::page_structure("name row", "owner link has no href"))?;
        let owner_id = query_value(owner_href)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| {
                ParsingError::page_structure(
                    "name row",
                    format!("owner id is not numeric in {owner_href:?}"),
                )
            })?;
        kret.set_owner_id(owner_id);
        cursor += 1;

        let row = row_at(&rows, cursor, "id row")?;
        let id_text = element_text(self.cell_at(row, 1, "id row")?);
        let hex = id_text
            .strip_prefix(geokrety_org::ID_PREFIX)
            .unwrap_or(&id_text);
        let gk_id = u32::from_str_radix(hex, 16).map_err(|_| {
            ParsingError::page_structure("id row", format!("{id_text:?} is not a canonical id"))
        })?;
        kret.set_id(gk_id);
        cursor += 1;

        let row = row_at(&rows, cursor, "tracking code row")?;
        if element_text(self.cell_at(row, 0, "tracking code row")?) == TRACKING_CODE_LABEL {
            kret.set_tracking_number(element_text(self.cell_at(row, 1, "tracking code row")?));
            cursor += 1;
        }

        let row = row_at(&rows, cursor, "distance row")?;
        let distance = element_text(self.cell_at(row, 1, "distance row")?).replace(DISTANCE_SUFFIX, "");
        kret.set_distance(distance.trim());
        cursor += 1;

        let row = row_at(&rows, cursor, "cache count row")?;
        let count_text = element_text(self.cell_at(row, 1, "cache count row")?);
        kret.set_cache_count(count_text.parse().map_err(|_| {
            ParsingError::page_structure("cache count row", format!("{count_text:?} is not a count"))
        })?);
        // the next row is presentation-only
        cursor += 2;

        let row = row_at(&rows, cursor, "country track row")?;
        kret.set_country_track(self.read_country_track(self.cell_at(row, 1, "country track row")?)?);
        cursor += 1;

        let row = row_at(&rows, cursor, "rating row")?;
        let rating_span = self
            .cell_at(row, 1, "rating row")?
            .select(&self.span_selector)
            .next()
            .ok_or_else(|| ParsingError::page_structure("rating row", "no rating text"))?;
        let rating_text = normalized_text(rating_span);
        let captures = self.rating_pattern.captures(&rating_text).ok_or_else(|| {
            ParsingError::page_structure(
                "rating row",
                format!("rating pattern did not match {rating_text:?}"),
            )
        })?;
        let votes = captures[1].parse().map_err(|_| {
            ParsingError::page_structure("rating row", format!("vote count {:?} overflows", &captures[1]))
        })?;
        let score = captures[2].parse().map_err(|_| {
            ParsingError::page_structure(
                "rating row",
                format!("average {:?} is not a number", &captures[2]),
            )
        })?;
        kret.set_cache_rating(votes, score);

        Ok(())
    }

    /// Pair each flag image's alt text with the parenthesized count in the
    /// span that follows it.
    fn read_country_track(&self, cell: ElementRef<'_>) -> ParsingResult<Vec<(String, u32)>> {
        let mut track = Vec::new();
        let mut country: Option<String> = None;
        for node in cell.descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };
            match element.value().name() {
                "img" => country = element.value().attr("alt").map(ToString::to_string),
                "span" => {
                    let text = element_text(element);
                    let count_text = text.trim_start_matches('(').trim_end_matches(')');
                    let visits = count_text.parse().map_err(|_| {
                        ParsingError::page_structure(
                            "country track row",
                            format!("{text:?} is not a visit count"),
                        )
                    })?;
                    if let Some(country) = country.clone() {
                        track.push((country, visits));
                    }
                }
                _ => {}
            }
        }
        Ok(track)
    }

    fn read_details_table(&self, table: ElementRef<'_>, kret: &mut Geokret) -> ParsingResult<()> {
        let rows: Vec<ElementRef<'_>> = table.select(&self.row_selector).collect();

        let row = row_at(&rows, 1, "description row")?;
        kret.set_description(element_text(self.cell_at(row, 0, "description row")?));

        let row = row_at(&rows, 3, "image row")?;
        let cell = self.cell_at(row, 0, "image row")?;
        match cell
            .select(&self.featured_link_selector)
            .next()
            .and_then(|link| link.value().attr("href"))
        {
            Some(href) => kret.set_featured_image(href),
            None => debug!("detail page has no featured image"),
        }
        let image_link = cell
            .select(&self.image_link_selector)
            .next()
            .ok_or_else(|| ParsingError::page_structure("image row", "no standard image link"))?;
        let href = image_link
            .value()
            .attr("href")
            .ok_or_else(|| ParsingError::page_structure("image row", "image link has no href"))?;
        kret.add_image(href);

        Ok(())
    }

    fn cell_at<'a>(
        &self,
        row: ElementRef<'a>,
        index: usize,
        landmark: &str,
    ) -> ParsingResult<ElementRef<'a>> {
        row.select(&self.cell_selector).nth(index).ok_or_else(|| {
            ParsingError::page_structure(landmark, format!("row has no cell {index}"))
        })
    }
}

impl PageParser for DetailPageParser {
    type Output = Geokret;

    fn parse(&self, document: &str) -> ParsingResult<Geokret> {
        let html = Html::parse_document(document);
        let mut tables = html.select(&self.table_selector);
        let info = tables
            .next()
            .ok_or_else(|| ParsingError::page_structure("info table", "page has no tables"))?;
        let details = tables
            .next()
            .ok_or_else(|| ParsingError::page_structure("details table", "page has only one table"))?;

        let mut kret = Geokret::new();
        self.read_info_table(info, &mut kret)?;
        self.read_details_table(details, &mut kret)?;
        debug!(gkid = %kret.gkid(), "parsed detail page");
        Ok(kret)
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|error| anyhow!("failed to compile selector {selector:?}: {error}"))
}

fn row_at<'a>(
    rows: &[ElementRef<'a>],
    index: usize,
    landmark: &str,
) -> ParsingResult<ElementRef<'a>> {
    rows.get(index)
        .copied()
        .ok_or_else(|| ParsingError::page_structure(landmark, format!("table has no row {index}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text content with runs of whitespace collapsed, for pattern matching
/// across fragmented text nodes.
fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn query_value(href: &str) -> Option<&str> {
    href.split('=').nth(1)
}
