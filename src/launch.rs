//! Identity and greeting handed to the screen through its launch URI,
//! e.g. `converse://screen?phoneNumber=555-1234&responseMessage=Hi`.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
#[error("invalid launch uri {uri:?}: {source}")]
pub struct LaunchError {
    uri: String,
    source: url::ParseError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchParams {
    pub phone_number: String,
    pub response_message: Option<String>,
}

impl LaunchParams {
    pub fn from_uri(uri: &str) -> Result<Self, LaunchError> {
        let url = Url::parse(uri).map_err(|source| LaunchError { uri: uri.to_string(), source })?;
        Ok(Self::from_url(&url))
    }

    pub fn from_url(url: &Url) -> Self {
        let param = |key: &str| {
            url.query_pairs()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.into_owned())
        };
        Self {
            phone_number: param("phoneNumber").unwrap_or_default(),
            response_message: param("responseMessage").filter(|v| !v.is_empty()),
        }
    }
}
