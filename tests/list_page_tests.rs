//! Listing page extraction against fixture pages
//!
//! The list parser is best-effort per row: one output entity per inventory
//! row, optional fields tolerated, anything else logged and swallowed.

use geokrety_client::{GeokretType, ListPageParser, PageParser};

fn inventory_row(class: &str, id: u32, name: &str, tracking: Option<&str>) -> String {
    let tracking_links = match tracking {
        Some(code) => format!(
            r#"<a href="/ruchy.php?id={id}">log</a><a href="/qr.php?nr={code}">qr</a>"#
        ),
        None => String::new(),
    };
    format!(
        r#"<tr class="{class}">
<td><span title="In some cache">&#9679;</span></td>
<td><a href="/konkret.php?id={id}"><img src="t.png" title="GeoKret|{name}|thumb|{id}_thumb.jpg|x"></a><span>{name}</span></td>
<td><img src="flag.png" alt="PL"> <a href="/okonkret.php?id=77">Cache {id}</a></td>
<td>2014-02-01</td>
<td>120km</td>
<td>15</td>
<td>{tracking_links}</td>
</tr>"#
    )
}

fn inventory_page(rows: &[String]) -> String {
    format!(
        "<html><body><table>{}</table></body></html>",
        rows.join("\n")
    )
}

#[test]
fn every_row_yields_one_entity_with_all_fields() {
    let parser = ListPageParser::new().unwrap();
    let page = inventory_page(&[inventory_row("mg0", 141, "Wanderer", Some("TRK111"))]);
    let krety = parser.parse(&page).unwrap();

    assert_eq!(krety.len(), 1);
    let kret = &krety[0];
    assert_eq!(kret.gk_id(), 141);
    assert_eq!(kret.name(), Some("Wanderer"));
    assert_eq!(kret.spotted_type(), Some("In some cache"));
    assert_eq!(kret.distance(), Some("120"));
    assert_eq!(kret.cache_count(), 15);
    assert_eq!(kret.tracking_number(), Some("TRK111"));
    assert_eq!(
        kret.featured_image(),
        Some("http://geokrety.org/obrazki/141_thumb.jpg")
    );
    assert_eq!(kret.spotted_country(), Some("PL"));
    assert_eq!(kret.spotted_cache_name(), Some("Cache 141"));
    // the listing page never mentions the type vocabulary
    assert_eq!(kret.kret_type(), None::<GeokretType>);
}

#[test]
fn missing_tracking_link_is_tolerated_per_row() {
    let parser = ListPageParser::new().unwrap();
    let page = inventory_page(&[
        inventory_row("mg0", 1, "First", Some("TRKAAA")),
        inventory_row("mg1", 2, "Second", None),
        inventory_row("mg0", 3, "Third", Some("TRKCCC")),
    ]);
    let krety = parser.parse(&page).unwrap();

    assert_eq!(krety.len(), 3);
    assert_eq!(krety[0].tracking_number(), Some("TRKAAA"));
    assert_eq!(krety[1].tracking_number(), None);
    assert_eq!(krety[2].tracking_number(), Some("TRKCCC"));
    // the untracked row still extracted everything else
    assert_eq!(krety[1].name(), Some("Second"));
    assert_eq!(krety[1].distance(), Some("120"));
    assert_eq!(krety[1].cache_count(), 15);
}

#[test]
fn rows_come_back_in_document_order_across_style_classes() {
    let parser = ListPageParser::new().unwrap();
    let page = inventory_page(&[
        inventory_row("mg0", 1, "First", None),
        inventory_row("mg1", 2, "Second", None),
        inventory_row("mg0", 3, "Third", None),
        inventory_row("mg1", 4, "Fourth", None),
    ]);
    let krety = parser.parse(&page).unwrap();
    let ids: Vec<u32> = krety.iter().map(geokrety_client::Geokret::gk_id).collect();
    assert_eq!(ids, [1, 2, 3, 4]);
}

#[test]
fn truncated_row_still_yields_a_partial_entity() {
    let parser = ListPageParser::new().unwrap();
    let truncated = r#"<tr class="mg1">
<td><span title="In the hands of the owner">&#9679;</span></td>
<td><a href="/konkret.php?id=9"></a><span>Half Parsed</span></td>
</tr>"#;
    let page = inventory_page(&[
        inventory_row("mg0", 1, "First", None),
        truncated.to_string(),
    ]);
    let krety = parser.parse(&page).unwrap();

    assert_eq!(krety.len(), 2);
    let partial = &krety[1];
    assert_eq!(partial.gk_id(), 9);
    assert_eq!(partial.name(), Some("Half Parsed"));
    assert_eq!(partial.spotted_type(), Some("In the hands of the owner"));
    // fields past the failing cell stay at their defaults
    assert_eq!(partial.distance(), None);
    assert_eq!(partial.cache_count(), 0);
}

#[test]
fn empty_spotted_cell_leaves_location_unset() {
    let parser = ListPageParser::new().unwrap();
    let row = inventory_row("mg0", 5, "Homebody", None).replace(
        r#"<td><img src="flag.png" alt="PL"> <a href="/okonkret.php?id=77">Cache 5</a></td>"#,
        "<td></td>",
    );
    let krety = parser.parse(&inventory_page(&[row])).unwrap();
    assert_eq!(krety.len(), 1);
    assert_eq!(krety[0].spotted_country(), None);
    assert_eq!(krety[0].spotted_cache_name(), None);
    assert_eq!(krety[0].name(), Some("Homebody"));
}
