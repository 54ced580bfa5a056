//! Weather provider endpoints used by pre-warm and background refresh.

use url::Url;

use stratus_core::{AppConfig, Error};

/// Builds current-weather and forecast URLs for a city.
#[derive(Debug, Clone)]
pub struct WeatherEndpoints {
    base: Url,
    api_key: String,
    units: String,
    lang: String,
}

impl WeatherEndpoints {
    pub fn new(base: &str, api_key: &str, units: &str, lang: &str) -> Result<Self, Error> {
        let mut base = Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base, api_key: api_key.into(), units: units.into(), lang: lang.into() })
    }

    /// Endpoints from configuration, or None when no API key is configured.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>, Error> {
        match config.weather_api_key.as_deref() {
            Some(key) => Self::new(&config.weather_api_base, key, &config.units, &config.lang).map(Some),
            None => Ok(None),
        }
    }

    /// `{base}/weather?q={city}&appid=...&units=...&lang=...`
    pub fn current(&self, city: &str) -> Result<Url, Error> {
        self.endpoint("weather", city)
    }

    /// `{base}/forecast?q={city}&appid=...&units=...&lang=...`
    pub fn forecast(&self, city: &str) -> Result<Url, Error> {
        self.endpoint("forecast", city)
    }

    fn endpoint(&self, resource: &str, city: &str) -> Result<Url, Error> {
        let mut url = self.base.join(resource).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("q", city)
            .append_pair("appid", &self.api_key)
            .append_pair("units", &self.units)
            .append_pair("lang", &self.lang);
        Ok(url)
    }
}
