//! Inventory listing page parser
//!
//! Extracts one entity per inventory row, selected by the alternating row
//! styling classes, in document order. Unlike the detail parser this one is
//! best-effort: a row failing outside its explicitly optional fields keeps
//! whatever was extracted so far, the failure is logged against that row,
//! and the entity is emitted anyway. One output entity per input row,
//! always.

use anyhow::{Result, anyhow};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{PageParser, ParsingError, ParsingResult};
use crate::domain::geokret::Geokret;

/// The two alternating row styling classes, matched in document order.
const ROW_SELECTOR: &str = "tr.mg0, tr.mg1";
/// Unit suffix stripped from the distance cell.
const DISTANCE_SUFFIX: &str = "km";

/// Parser for inventory listing pages.
pub struct ListPageParser {
    row_selector: Selector,
    cell_selector: Selector,
    link_selector: Selector,
    span_selector: Selector,
    image_selector: Selector,
}

impl ListPageParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            row_selector: compile(ROW_SELECTOR)?,
            cell_selector: compile("td")?,
            link_selector: compile("a")?,
            span_selector: compile("span")?,
            image_selector: compile("img")?,
        })
    }

    /// Extract one row's fields by fixed cell ordinal. Returns at the first
    /// failing required field; fields already written stay on the entity.
    fn read_row(&self, row: ElementRef<'_>, kret: &mut Geokret) -> ParsingResult<()> {
        let cells: Vec<ElementRef<'_>> = row.select(&self.cell_selector).collect();

        let marker = cell_at(&cells, 0, "marker cell")?
            .select(&self.span_selector)
            .next()
            .ok_or_else(|| ParsingError::page_structure("marker cell", "no status marker"))?;
        let spotted_type = marker
            .value()
            .attr("title")
            .ok_or_else(|| ParsingError::page_structure("marker cell", "status marker has no title"))?;
        kret.set_spotted_type(spotted_type);

        let name_cell = cell_at(&cells, 1, "name cell")?;
        let link = name_cell
            .select(&self.link_selector)
            .next()
            .ok_or_else(|| ParsingError::page_structure("name cell", "no detail link"))?;
        let href = link
            .value()
            .attr("href")
            .ok_or_else(|| ParsingError::page_structure("name cell", "detail link has no href"))?;
        let id = query_value(href)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| {
                ParsingError::page_structure("name cell", format!("id is not numeric in {href:?}"))
            })?;
        kret.set_id(id);
        let name = name_cell
            .select(&self.span_selector)
            .next()
            .ok_or_else(|| ParsingError::page_structure("name cell", "no name text"))?;
        kret.set_name(element_text(name));

        let distance = element_text(cell_at(&cells, 4, "distance cell")?).replace(DISTANCE_SUFFIX, "");
        kret.set_distance(distance.trim());

        let count_text = element_text(cell_at(&cells, 5, "cache count cell")?);
        kret.set_cache_count(count_text.parse().map_err(|_| {
            ParsingError::page_structure("cache count cell", format!("{count_text:?} is not a count"))
        })?);

        // Tracking number is only present on rows the viewer owns.
        if let Some(tracking) = cells
            .get(6)
            .and_then(|cell| cell.select(&self.link_selector).nth(1))
            .and_then(|link| link.value().attr("href"))
            .and_then(query_value)
        {
            kret.set_tracking_number(tracking);
        }

        // Featured image rides in the name cell image's pipe-delimited title.
        if let Some(filename) = name_cell
            .select(&self.image_selector)
            .next()
            .and_then(|image| image.value().attr("title"))
            .and_then(|title| title.split('|').nth(3))
        {
            kret.set_featured_image(filename);
        }

        let spotted_cell = cell_at(&cells, 2, "spotted cell")?;
        if !element_text(spotted_cell).is_empty() {
            if let Some(country) = spotted_cell
                .select(&self.image_selector)
                .next()
                .and_then(|image| image.value().attr("alt"))
            {
                kret.set_spotted_country(country);
            }
            if let Some(cache) = spotted_cell.select(&self.link_selector).next() {
                kret.set_spotted_cache_name(element_text(cache));
            }
        }

        Ok(())
    }
}

impl PageParser for ListPageParser {
    type Output = Vec<Geokret>;

    fn parse(&self, document: &str) -> ParsingResult<Vec<Geokret>> {
        let html = Html::parse_document(document);
        let mut krety = Vec::new();
        for (index, row) in html.select(&self.row_selector).enumerate() {
            let mut kret = Geokret::new();
            if let Err(error) = self.read_row(row, &mut kret) {
                warn!(row = index, gkid = %kret.gkid(), %error, "keeping partially extracted row entity");
            }
            krety.push(kret);
        }
        debug!(count = krety.len(), "parsed inventory listing page");
        Ok(krety)
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|error| anyhow!("failed to compile selector {selector:?}: {error}"))
}

fn cell_at<'a>(
    cells: &[ElementRef<'a>],
    index: usize,
    landmark: &str,
) -> ParsingResult<ElementRef<'a>> {
    cells.get(index).copied().ok_or_else(|| {
        ParsingError::page_structure(landmark, format!("row has no cell {index}"))
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn query_value(href: &str) -> Option<&str> {
    href.split('=').nth(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_creation_succeeds() {
        assert!(ListPageParser::new().is_ok());
    }

    #[test]
    fn page_without_inventory_rows_yields_no_entities() {
        let parser = ListPageParser::new().unwrap();
        let krety = parser
            .parse("<html><body><table><tr><td>header</td></tr></table></body></html>")
            .unwrap();
        assert!(krety.is_empty());
    }
}
