use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use super::errors::AnkiflagError;

pub const DEFAULT_ANKI_CONNECT_URL: &str = "http://localhost:8765";
pub const ANKI_CONNECT_VERSION: u32 = 6;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_FIELD_VALUE: &str = "Yes";

/// Where and how to talk to AnkiConnect. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    url: String,
    version: u32,
    timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(
        url: impl Into<String>,
        version: u32,
        timeout: Duration,
    ) -> Result<Self, AnkiflagError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(AnkiflagError::Validation("AnkiConnect URL must not be empty".into()));
        }
        let parsed = Url::parse(&url).map_err(|e| {
            AnkiflagError::Validation(format!("invalid AnkiConnect URL '{url}': {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AnkiflagError::Validation(format!(
                "AnkiConnect URL '{url}' must use http or https"
            )));
        }
        if version == 0 {
            return Err(AnkiflagError::Validation("API version must be at least 1".into()));
        }
        if timeout.is_zero() {
            return Err(AnkiflagError::Validation("request timeout must be non-zero".into()));
        }
        Ok(Self { url, version, timeout })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ANKI_CONNECT_URL.to_string(),
            version: ANKI_CONNECT_VERSION,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Which notes to touch and what to write into them.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    deck: String,
    model: String,
    template: String,
    min_interval: u32,
    field: String,
    value: String,
    skip_unchanged: bool,
    dry_run: bool,
}

impl FilterCriteria {
    pub fn new(
        deck: impl Into<String>,
        model: impl Into<String>,
        template: impl Into<String>,
        min_interval: i64,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, AnkiflagError> {
        let deck = required("deck name", deck.into())?;
        let model = required("model name", model.into())?;
        let template = required("template name", template.into())?;
        let field = required("field name", field.into())?;

        if min_interval < 0 {
            return Err(AnkiflagError::Validation(format!(
                "minimum interval must not be negative (got {min_interval})"
            )));
        }
        let min_interval = u32::try_from(min_interval).map_err(|_| {
            AnkiflagError::Validation(format!("minimum interval {min_interval} is too large"))
        })?;

        Ok(Self {
            deck,
            model,
            template,
            min_interval,
            field,
            value: value.into(),
            skip_unchanged: false,
            dry_run: false,
        })
    }

    pub fn with_skip_unchanged(mut self, skip_unchanged: bool) -> Self {
        self.skip_unchanged = skip_unchanged;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn deck(&self) -> &str {
        &self.deck
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn min_interval(&self) -> u32 {
        self.min_interval
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn skip_unchanged(&self) -> bool {
        self.skip_unchanged
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

fn required(what: &str, value: String) -> Result<String, AnkiflagError> {
    if value.trim().is_empty() {
        return Err(AnkiflagError::Validation(format!("{what} must not be empty")));
    }
    Ok(value)
}

/// Built-in jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Enable audio on "Word" cards of the Polish deck once they pass 14 days.
    #[default]
    Audio,
    /// Hide the border map on "Neighbours" cards of the Other deck after 45 days.
    BorderMap,
}

impl Preset {
    pub fn criteria(self) -> CriteriaOverrides {
        let (deck, model, template, min_interval, field) = match self {
            Preset::Audio => ("Polish", "Words", "Word", 14, "Audio Enabled"),
            Preset::BorderMap => ("Other", "Regions", "Neighbours", 45, "No Border Map"),
        };
        CriteriaOverrides {
            preset: Some(self),
            deck: Some(deck.to_string()),
            model: Some(model.to_string()),
            template: Some(template.to_string()),
            min_interval: Some(min_interval),
            field: Some(field.to_string()),
            value: Some(DEFAULT_FIELD_VALUE.to_string()),
            skip_unchanged: None,
            dry_run: None,
        }
    }
}

/// A partial set of criteria, as found in a profile file or on the command line.
/// Layers are stacked with [`CriteriaOverrides::merge`] and then resolved.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CriteriaOverrides {
    pub preset: Option<Preset>,
    pub deck: Option<String>,
    pub model: Option<String>,
    pub template: Option<String>,
    pub min_interval: Option<i64>,
    pub field: Option<String>,
    pub value: Option<String>,
    pub skip_unchanged: Option<bool>,
    pub dry_run: Option<bool>,
}

impl CriteriaOverrides {
    /// Layers `higher` on top of `self`; values set in `higher` win.
    pub fn merge(self, higher: CriteriaOverrides) -> Self {
        Self {
            preset: higher.preset.or(self.preset),
            deck: higher.deck.or(self.deck),
            model: higher.model.or(self.model),
            template: higher.template.or(self.template),
            min_interval: higher.min_interval.or(self.min_interval),
            field: higher.field.or(self.field),
            value: higher.value.or(self.value),
            skip_unchanged: higher.skip_unchanged.or(self.skip_unchanged),
            dry_run: higher.dry_run.or(self.dry_run),
        }
    }

    /// Fills every unset value from the selected preset and validates the result.
    pub fn resolve(self) -> Result<FilterCriteria, AnkiflagError> {
        let base = self.preset.unwrap_or_default().criteria();
        let merged = base.merge(self);

        let missing = |what: &str| AnkiflagError::Validation(format!("{what} is not set"));
        Ok(FilterCriteria::new(
            merged.deck.ok_or_else(|| missing("deck name"))?,
            merged.model.ok_or_else(|| missing("model name"))?,
            merged.template.ok_or_else(|| missing("template name"))?,
            merged.min_interval.ok_or_else(|| missing("minimum interval"))?,
            merged.field.ok_or_else(|| missing("field name"))?,
            merged.value.unwrap_or_else(|| DEFAULT_FIELD_VALUE.to_string()),
        )?
        .with_skip_unchanged(merged.skip_unchanged.unwrap_or(false))
        .with_dry_run(merged.dry_run.unwrap_or(false)))
    }
}
