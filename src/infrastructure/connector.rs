//! Abstraction around geokrety.org
//!
//! Authenticated site operations over a [`Transport`]: login, inventory
//! retrieval (export feed or listing page), detail retrieval, item
//! creation and update, image upload/download, and CSV export/import of
//! the held inventory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::domain::constants::geokrety_org;
use crate::domain::geokret::Geokret;
use crate::infrastructure::csv_store;
use crate::infrastructure::http_client::{HttpClient, HttpClientConfig, Transport};
use crate::infrastructure::parsing::{
    DetailPageParser, InventoryXmlParser, ListPageParser, PageParser,
};

/// Login credentials for geokrety.org.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

/// Connector for geokrety.org.
///
/// Retrieved collections are held as the connector's inventory until
/// exported or replaced by the next retrieval.
pub struct GeokretyConnector {
    transport: Arc<dyn Transport>,
    base_url: String,
    credentials: Credentials,
    secid: Option<String>,
    connected: bool,
    inventory: Vec<Geokret>,
    detail_parser: DetailPageParser,
    list_parser: ListPageParser,
    xml_parser: InventoryXmlParser,
}

impl GeokretyConnector {
    /// Create a connector over the default HTTP transport.
    pub fn new(credentials: Credentials) -> Result<Self> {
        let transport = HttpClient::new(HttpClientConfig::default())?;
        Self::with_transport(Arc::new(transport), geokrety_org::BASE_URL, credentials)
    }

    /// Create a connector over a caller-supplied transport and base URL.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self> {
        Ok(Self {
            transport,
            base_url: base_url.into(),
            credentials,
            secid: None,
            connected: false,
            inventory: Vec::new(),
            detail_parser: DetailPageParser::new()?,
            list_parser: ListPageParser::new()?,
            xml_parser: InventoryXmlParser::new(),
        })
    }

    #[must_use]
    pub fn inventory(&self) -> &[Geokret] {
        &self.inventory
    }

    /// Mutable access for callers adjusting items before an update.
    pub fn inventory_mut(&mut self) -> &mut Vec<Geokret> {
        &mut self.inventory
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Exchange credentials for the `secid` used by API calls.
    pub async fn login_api(&mut self) -> Result<()> {
        let url = format!("{}{}", self.base_url, geokrety_org::API_LOGIN_PATH);
        let form = [
            ("login".to_string(), self.credentials.login.clone()),
            ("password".to_string(), self.credentials.password.clone()),
        ];
        let outcome = self
            .transport
            .post_form(&url, &form)
            .await
            .context("api login request failed")?;
        if !(200..300).contains(&outcome.status) {
            bail!("api login rejected with status {}", outcome.status);
        }
        let secid = outcome.body.trim_end_matches(['\n', '\r', ' ']).to_string();
        if secid.is_empty() {
            bail!("api login returned an empty secid");
        }
        self.secid = Some(secid);
        info!("api session established");
        Ok(())
    }

    /// Log in through the web form, storing session cookies for future
    /// authenticated calls.
    pub async fn login_web(&mut self) -> Result<()> {
        let url = format!("{}{}", self.base_url, geokrety_org::WEB_LOGIN_PATH);
        let form = [
            ("login".to_string(), self.credentials.login.clone()),
            ("haslo1".to_string(), self.credentials.password.clone()),
            ("remember".to_string(), "1".to_string()),
        ];
        let outcome = self
            .transport
            .post_form(&url, &form)
            .await
            .context("web login request failed")?;
        if !outcome.redirected {
            bail!("web login rejected with status {}", outcome.status);
        }
        if !outcome.received_cookies {
            bail!("web login redirected but no session cookie was issued");
        }
        self.connected = true;
        info!(status = outcome.status, "web session established");
        Ok(())
    }

    /// Retrieve the inventory through the XML export feed. Requires an API
    /// session.
    pub async fn fetch_inventory(&mut self) -> Result<&[Geokret]> {
        let secid = self
            .secid
            .as_deref()
            .context("api login required before fetching the inventory")?;
        let url = format!(
            "{}{}?secid={secid}&inventory=1",
            self.base_url,
            geokrety_org::XML_EXPORT_PATH
        );
        let body = self
            .transport
            .get_bytes(&url)
            .await
            .context("inventory export request failed")?;
        let krety = self
            .xml_parser
            .parse(body.as_slice())
            .context("inventory export stream did not parse")?;
        info!(count = krety.len(), "inventory retrieved via export feed");
        self.inventory = krety;
        Ok(&self.inventory)
    }

    /// Retrieve an inventory by scraping the listing page. Defaults to the
    /// connected user.
    pub async fn fetch_inventory_web(&mut self, user_id: Option<u32>) -> Result<&[Geokret]> {
        let mut url = format!(
            "{}{}?co=1&page=0",
            self.base_url,
            geokrety_org::INVENTORY_PAGE_PATH
        );
        if let Some(user_id) = user_id {
            url.push_str(&format!("&userid={user_id}"));
        }
        let page = self
            .transport
            .get_text(&url)
            .await
            .context("inventory page request failed")?;
        let krety = self
            .list_parser
            .parse(&page)
            .context("inventory page did not parse")?;
        info!(count = krety.len(), "inventory retrieved via listing page");
        self.inventory = krety;
        Ok(&self.inventory)
    }

    /// Retrieve full details for one item.
    pub async fn fetch_details(&self, gk_id: u32) -> Result<Geokret> {
        let url = format!(
            "{}{}?id={gk_id}&page=0",
            self.base_url,
            geokrety_org::DETAIL_PAGE_PATH
        );
        let page = self
            .transport
            .get_text(&url)
            .await
            .context("detail page request failed")?;
        let kret = self
            .detail_parser
            .parse(&page)
            .with_context(|| format!("detail page for item {gk_id} did not parse"))?;
        info!(gkid = %kret.gkid(), "item details retrieved");
        Ok(kret)
    }

    /// Push name, description and type changes for an existing item.
    pub async fn update_geokret(&self, kret: &Geokret) -> Result<()> {
        self.require_connected()?;
        let url = format!("{}{}", self.base_url, geokrety_org::EDIT_PATH);
        let form = [
            ("id".to_string(), kret.gk_id().to_string()),
            ("nazwa".to_string(), kret.name().unwrap_or_default().to_string()),
            (
                "opis".to_string(),
                kret.description().unwrap_or_default().to_string(),
            ),
            (
                "typ".to_string(),
                kret.kret_type().map(|t| t.code().to_string()).unwrap_or_default(),
            ),
        ];
        let outcome = self
            .transport
            .post_form_redirecting(&url, &form)
            .await
            .context("update request failed")?;
        if !outcome.redirected {
            bail!(
                "update of {} was not accepted (status {})",
                kret.gkid(),
                outcome.status
            );
        }
        info!(gkid = %kret.gkid(), "item updated");
        Ok(())
    }

    /// Register a new item; the assigned ID is written back on success.
    pub async fn create_geokret(&self, kret: &mut Geokret, log_at_home: bool) -> Result<()> {
        self.require_connected()?;
        let url = format!("{}{}", self.base_url, geokrety_org::REGISTER_PATH);
        let mut form = vec![
            ("nazwa".to_string(), kret.name().unwrap_or_default().to_string()),
            (
                "typ".to_string(),
                kret.kret_type().map(|t| t.code().to_string()).unwrap_or_default(),
            ),
            (
                "opis".to_string(),
                kret.description().unwrap_or_default().to_string(),
            ),
        ];
        if log_at_home {
            form.push(("logAtHome".to_string(), "1".to_string()));
        }
        let outcome = self
            .transport
            .post_form_redirecting(&url, &form)
            .await
            .context("registration request failed")?;
        if !outcome.redirected {
            bail!("registration was not accepted (status {})", outcome.status);
        }
        let id = outcome
            .final_url
            .split('=')
            .nth(1)
            .and_then(|raw| raw.parse().ok())
            .with_context(|| {
                format!(
                    "registration redirect {:?} carries no item id",
                    outcome.final_url
                )
            })?;
        kret.set_id(id);
        info!(gkid = %kret.gkid(), "item registered");
        Ok(())
    }

    /// Upload a picture for an item, optionally marking it featured.
    pub async fn upload_image(
        &self,
        kret: &Geokret,
        image_path: &Path,
        description: Option<&str>,
        avatar: bool,
    ) -> Result<()> {
        self.require_connected()?;
        let bytes = tokio::fs::read(image_path)
            .await
            .with_context(|| format!("cannot read image file {}", image_path.display()))?;
        let url = format!(
            "{}{}?typ=0&id={}",
            self.base_url,
            geokrety_org::IMAGE_UPLOAD_PATH,
            kret.gk_id()
        );
        let mut extra = Vec::new();
        if let Some(description) = description {
            extra.push(("opis".to_string(), description.to_string()));
        }
        if avatar {
            extra.push(("avatar".to_string(), "true".to_string()));
        }
        // The upload form expects this exact part filename and content type.
        let outcome = self
            .transport
            .post_file(&url, "obrazek", "cgeo.png", "image/png", bytes, &extra)
            .await
            .context("image upload request failed")?;
        if !outcome.redirected {
            bail!(
                "image upload for {} was not accepted (status {})",
                kret.gkid(),
                outcome.status
            );
        }
        info!(gkid = %kret.gkid(), "image uploaded");
        Ok(())
    }

    /// Download an image into a directory, deriving a safe filename from
    /// the URL path. Returns the path written.
    pub async fn download_image(
        &self,
        url: &str,
        destination_directory: &Path,
    ) -> Result<PathBuf> {
        let parsed = url::Url::parse(url).with_context(|| format!("invalid image url {url:?}"))?;
        let basename = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();
        let filename = format_filename(basename);
        if filename.is_empty() {
            bail!("image url {url:?} has no usable filename");
        }
        tokio::fs::create_dir_all(destination_directory)
            .await
            .with_context(|| {
                format!("cannot create directory {}", destination_directory.display())
            })?;
        let destination = destination_directory.join(&filename);
        self.transport
            .download(url, &destination)
            .await
            .with_context(|| format!("failed to download {url}"))?;
        info!(file = %destination.display(), "image downloaded");
        Ok(destination)
    }

    /// Export the held inventory as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        csv_store::write_inventory(path, &self.inventory)
    }

    /// Replace the held inventory from a CSV export.
    pub fn read_csv(&mut self, path: &Path) -> Result<&[Geokret]> {
        self.inventory = csv_store::read_inventory(path)?;
        Ok(&self.inventory)
    }

    fn require_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            bail!("web login required before modifying items")
        }
    }
}

/// Keep only filename-safe characters, replacing spaces with underscores.
fn format_filename(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')' | ' '))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}
