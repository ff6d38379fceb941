//! CSV persistence for inventories
//!
//! Semicolon-delimited export with a fixed, ordered column schema shared
//! by reads and writes. Sequence and pair fields travel as JSON inside
//! their cells so every modeled field round-trips losslessly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::domain::constants::GK_CSV_COLUMNS;
use crate::domain::geokret::{CacheRating, Geokret, GeokretType};

const DELIMITER: char = ';';

/// Write an inventory with a header row.
pub fn write_inventory(path: &Path, inventory: &[Geokret]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let header: Vec<String> = GK_CSV_COLUMNS.iter().map(ToString::to_string).collect();
    write_row(&mut writer, &header)?;
    for kret in inventory {
        write_row(&mut writer, &record(kret)?)?;
    }
    writer.flush()?;
    info!(count = inventory.len(), file = %path.display(), "inventory written");
    Ok(())
}

/// Read an inventory back, validating the header against the schema.
pub fn read_inventory(path: &Path) -> Result<Vec<Geokret>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut rows = parse_rows(&text).into_iter();
    let header = rows.next().context("csv file is empty")?;
    if header != GK_CSV_COLUMNS {
        bail!("csv header does not match the inventory schema");
    }
    let mut inventory = Vec::new();
    for (index, row) in rows.enumerate() {
        inventory
            .push(restore(&row).with_context(|| format!("csv record {} is invalid", index + 2))?);
    }
    info!(count = inventory.len(), file = %path.display(), "inventory read");
    Ok(inventory)
}

fn record(kret: &Geokret) -> Result<Vec<String>> {
    Ok(vec![
        kret.gk_id().to_string(),
        kret.tracking_number().unwrap_or_default().to_string(),
        kret.name().unwrap_or_default().to_string(),
        kret.description().unwrap_or_default().to_string(),
        kret.featured_image().unwrap_or_default().to_string(),
        serde_json::to_string(kret.images())?,
        kret.owner().unwrap_or_default().to_string(),
        kret.owner_id().to_string(),
        kret.date_created().unwrap_or_default().to_string(),
        kret.distance().unwrap_or_default().to_string(),
        kret.kret_type()
            .map(|t| t.code().to_string())
            .unwrap_or_default(),
        kret.spotted_cache_name().unwrap_or_default().to_string(),
        kret.spotted_type().unwrap_or_default().to_string(),
        kret.spotted_country().unwrap_or_default().to_string(),
        serde_json::to_string(kret.country_track())?,
        kret.cache_count().to_string(),
        kret.cache_rating()
            .map(|rating| serde_json::to_string(&rating))
            .transpose()?
            .unwrap_or_default(),
    ])
}

fn restore(row: &[String]) -> Result<Geokret> {
    if row.len() != GK_CSV_COLUMNS.len() {
        bail!(
            "expected {} cells, found {}",
            GK_CSV_COLUMNS.len(),
            row.len()
        );
    }
    let mut kret = Geokret::new();
    kret.set_id(row[0].parse().context("gk_id is not numeric")?);
    if let Some(value) = non_empty(&row[1]) {
        kret.set_tracking_number(value);
    }
    if let Some(value) = non_empty(&row[2]) {
        kret.set_name(value);
    }
    if let Some(value) = non_empty(&row[3]) {
        kret.set_description(value);
    }
    if let Some(value) = non_empty(&row[4]) {
        kret.set_featured_image_url(value.to_string());
    }
    let images: Vec<String> =
        serde_json::from_str(&row[5]).context("images cell is not a JSON array")?;
    for image in images {
        kret.push_image_url(image);
    }
    if let Some(value) = non_empty(&row[6]) {
        kret.set_owner(value);
    }
    kret.set_owner_id(row[7].parse().context("ownerid is not numeric")?);
    if let Some(value) = non_empty(&row[8]) {
        kret.set_date_created(value);
    }
    if let Some(value) = non_empty(&row[9]) {
        kret.set_distance(value);
    }
    if let Some(value) = non_empty(&row[10]) {
        let code = value.parse().context("type cell is not a code")?;
        kret.set_type(GeokretType::from_code(code)?);
    }
    if let Some(value) = non_empty(&row[11]) {
        kret.set_spotted_cache_name(value);
    }
    if let Some(value) = non_empty(&row[12]) {
        kret.set_spotted_type(value);
    }
    if let Some(value) = non_empty(&row[13]) {
        kret.set_spotted_country(value);
    }
    kret.set_country_track(
        serde_json::from_str(&row[14]).context("country_track cell is not JSON")?,
    );
    kret.set_cache_count(row[15].parse().context("cache_count is not numeric")?);
    if let Some(value) = non_empty(&row[16]) {
        let rating: CacheRating =
            serde_json::from_str(value).context("cache_rating cell is not JSON")?;
        kret.set_cache_rating(rating.votes, rating.score);
    }
    Ok(kret)
}

fn non_empty(cell: &str) -> Option<&str> {
    if cell.is_empty() { None } else { Some(cell) }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(DELIMITER) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row to any writer.
fn write_row<W: Write>(writer: &mut W, row: &[String]) -> Result<()> {
    let mut first = true;
    for cell in row {
        if first {
            first = false;
        } else {
            write!(writer, "{DELIMITER}")?;
        }
        if needs_quotes(cell) {
            write!(writer, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(writer, "{cell}")?;
        }
    }
    writeln!(writer)?;
    Ok(())
}

/// Minimal CSV parser, quote and CRLF tolerant.
fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next(); // double-quote escape
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == DELIMITER && !in_quotes => {
                row.push(std::mem::take(&mut field));
            }
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    // Flush any trailing field/row even if quotes were unterminated.
    row.push(field);
    if !(row.len() == 1 && row[0].is_empty()) {
        rows.push(row);
    }

    rows
}
