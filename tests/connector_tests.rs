//! Connector flows over a fake transport
//!
//! Exercises session handling and the wiring from fetched documents into
//! the parsers without touching the network.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;
use geokrety_client::infrastructure::http_client::{FormOutcome, Transport};
use geokrety_client::{Credentials, GeokretType, GeokretyConnector};

const BASE_URL: &str = "https://geokrety.example";

#[derive(Default)]
struct FakeTransport {
    pages: HashMap<String, String>,
    bytes: HashMap<String, Vec<u8>>,
    form_outcome: Option<FormOutcome>,
    redirect_outcome: Option<FormOutcome>,
    posted_forms: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeTransport {
    fn outcome(status: u16, redirected: bool, final_url: &str) -> FormOutcome {
        FormOutcome {
            status,
            redirected,
            final_url: final_url.to_string(),
            received_cookies: redirected,
            body: String::new(),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        match self.pages.get(url) {
            Some(page) => Ok(page.clone()),
            None => bail!("unexpected page fetch: {url}"),
        }
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        match self.bytes.get(url) {
            Some(body) => Ok(body.clone()),
            None => bail!("unexpected stream fetch: {url}"),
        }
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<FormOutcome> {
        self.posted_forms
            .lock()
            .unwrap()
            .push((url.to_string(), form.to_vec()));
        match &self.form_outcome {
            Some(outcome) => Ok(outcome.clone()),
            None => bail!("unexpected form post: {url}"),
        }
    }

    async fn post_form_redirecting(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<FormOutcome> {
        self.posted_forms
            .lock()
            .unwrap()
            .push((url.to_string(), form.to_vec()));
        match &self.redirect_outcome {
            Some(outcome) => Ok(outcome.clone()),
            None => bail!("unexpected redirecting post: {url}"),
        }
    }

    async fn post_file(
        &self,
        url: &str,
        _field: &str,
        _filename: &str,
        _mime: &str,
        _bytes: Vec<u8>,
        _extra: &[(String, String)],
    ) -> Result<FormOutcome> {
        bail!("unexpected file upload: {url}")
    }

    async fn download(&self, url: &str, _destination: &Path) -> Result<()> {
        bail!("unexpected download: {url}")
    }
}

fn credentials() -> Credentials {
    Credentials {
        login: "kumy".to_string(),
        password: "hunter2".to_string(),
    }
}

fn connector(transport: FakeTransport) -> GeokretyConnector {
    GeokretyConnector::with_transport(Arc::new(transport), BASE_URL, credentials()).unwrap()
}

#[tokio::test]
async fn web_login_succeeds_on_redirect_with_cookies() {
    let transport = FakeTransport {
        form_outcome: Some(FakeTransport::outcome(302, true, BASE_URL)),
        ..Default::default()
    };
    let mut connector = connector(transport);

    assert!(!connector.is_connected());
    connector.login_web().await.unwrap();
    assert!(connector.is_connected());
}

#[tokio::test]
async fn web_login_without_redirect_is_rejected() {
    let transport = FakeTransport {
        form_outcome: Some(FakeTransport::outcome(200, false, BASE_URL)),
        ..Default::default()
    };
    let mut connector = connector(transport);

    let error = connector.login_web().await.unwrap_err();
    assert!(error.to_string().contains("rejected"));
    assert!(!connector.is_connected());
}

#[tokio::test]
async fn api_login_then_inventory_export_flows_through_the_xml_parser() {
    let export_url = format!("{BASE_URL}/export2.php?secid=SECID42&inventory=1");
    let xml = r#"<gkxml><geokret id="141" dist="15"><name>Wanderer</name></geokret></gkxml>"#;
    let mut login_outcome = FakeTransport::outcome(200, false, BASE_URL);
    login_outcome.body = "SECID42\n".to_string();

    let transport = FakeTransport {
        form_outcome: Some(login_outcome),
        bytes: HashMap::from([(export_url, xml.as_bytes().to_vec())]),
        ..Default::default()
    };
    let mut connector = connector(transport);

    connector.login_api().await.unwrap();
    let inventory = connector.fetch_inventory().await.unwrap();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].gk_id(), 141);
    assert_eq!(inventory[0].name(), Some("Wanderer"));
}

#[tokio::test]
async fn inventory_export_requires_an_api_session() {
    let mut connector = connector(FakeTransport::default());
    let error = connector.fetch_inventory().await.unwrap_err();
    assert!(error.to_string().contains("api login required"));
}

#[tokio::test]
async fn web_inventory_flows_through_the_list_parser() {
    let page_url = format!("{BASE_URL}/mypage.php?co=1&page=0&userid=26422");
    let page = r#"<html><body><table>
<tr class="mg0">
<td><span title="In some cache">x</span></td>
<td><a href="/konkret.php?id=141"></a><span>Wanderer</span></td>
<td></td><td></td>
<td>120km</td>
<td>15</td>
<td></td>
</tr>
</table></body></html>"#;

    let transport = FakeTransport {
        pages: HashMap::from([(page_url, page.to_string())]),
        ..Default::default()
    };
    let mut connector = connector(transport);

    let inventory = connector.fetch_inventory_web(Some(26422)).await.unwrap();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].gk_id(), 141);
    assert_eq!(inventory[0].distance(), Some("120"));
}

#[tokio::test]
async fn item_updates_require_a_web_session() {
    let connector = connector(FakeTransport::default());
    let mut kret = geokrety_client::Geokret::new();
    kret.set_id(141);

    let error = connector.update_geokret(&kret).await.unwrap_err();
    assert!(error.to_string().contains("web login required"));
}

#[tokio::test]
async fn registration_writes_the_assigned_id_back() {
    let transport = FakeTransport {
        form_outcome: Some(FakeTransport::outcome(302, true, BASE_URL)),
        redirect_outcome: Some(FakeTransport::outcome(
            200,
            true,
            &format!("{BASE_URL}/konkret.php?id=999"),
        )),
        ..Default::default()
    };
    let mut connector = connector(transport);
    connector.login_web().await.unwrap();

    let mut kret = geokrety_client::Geokret::new();
    kret.set_name("Fresh Kret");
    kret.set_type(GeokretType::Human);
    connector.create_geokret(&mut kret, true).await.unwrap();
    assert_eq!(kret.gk_id(), 999);
    assert_eq!(kret.gkid(), "GK03E7");
}
