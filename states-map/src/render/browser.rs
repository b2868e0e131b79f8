//! Session navigateur pilotée par WebDriver

use std::path::Path;

use fantoccini::{Client, ClientBuilder};
use tracing::{debug, info};

use crate::config::Browser;
use crate::error::{AppError, Result};

const TOOL: &str = "webdriver";

/// Session ouverte au premier affichage, rafraîchie ensuite
pub struct BrowserSession {
    webdriver_url: String,
    browser: Browser,
    client: Option<Client>,
}

impl BrowserSession {
    pub fn new(webdriver_url: impl Into<String>, browser: Browser) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            browser,
            client: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    async fn connect(&self) -> Result<Client> {
        let mut caps = serde_json::Map::new();
        caps.insert(
            "browserName".to_string(),
            serde_json::Value::from(self.browser.webdriver_name()),
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| AppError::external(TOOL, format!("cannot start {:?}: {}", self.browser, e)))?;

        info!(browser = ?self.browser, webdriver = %self.webdriver_url, "Browser session opened");
        Ok(client)
    }

    /// Affiche une page locale (ouverture au premier appel, rafraîchissement ensuite)
    pub async fn show(&mut self, page: &Path) -> Result<()> {
        match &self.client {
            Some(client) => {
                client
                    .refresh()
                    .await
                    .map_err(|e| AppError::external(TOOL, e))?;
                debug!("Page refreshed");
            }
            None => {
                let url = file_url(page)?;
                let client = self.connect().await?;
                client
                    .goto(&url)
                    .await
                    .map_err(|e| AppError::external(TOOL, e))?;
                debug!(url = %url, "Page opened");
                self.client = Some(client);
            }
        }
        Ok(())
    }

    /// Capture d'écran PNG de la page affichée
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::external(TOOL, "browser session is not open"))?;

        client
            .screenshot()
            .await
            .map_err(|e| AppError::external(TOOL, e))
    }

    /// Ferme la session si elle est ouverte
    pub async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.close().await.map_err(|e| AppError::external(TOOL, e))?;
            info!("Browser session closed");
        }
        Ok(())
    }
}

/// URL `file://` absolue d'un fichier existant
pub fn file_url(path: &Path) -> Result<String> {
    let absolute = std::fs::canonicalize(path)?;
    let text = absolute.to_string_lossy().replace('\\', "/");
    let text = text.trim_start_matches("//?/");

    Ok(if text.starts_with('/') {
        format!("file://{}", text)
    } else {
        format!("file:///{}", text)
    })
}
