use reqwest::Url;
use validator::ValidateUrl;

/// A validated, absolute callback URL whose host is trusted: it must end in `.mdtp`,
/// unless `allow_localhost` is set, in which case `localhost` is also accepted.
///
/// The field is left private so that construction must go through `parse`.
#[derive(Debug, Clone)]
pub struct CallbackUrl(String);

impl CallbackUrl {
    pub fn parse(
        raw: &str,
        allow_localhost: bool,
    ) -> Result<Self, CallbackUrlError> {
        if !raw.validate_url() {
            return Err(CallbackUrlError::Invalid);
        }
        let url = Url::parse(raw).map_err(|_| CallbackUrlError::Invalid)?;
        let host = url.host_str().ok_or(CallbackUrlError::Invalid)?;

        let host_ok =
            host.ends_with(".mdtp") || (allow_localhost && (host == "localhost" || host == "127.0.0.1"));
        if !host_ok {
            return Err(CallbackUrlError::InvalidHost);
        }

        Ok(Self(raw.to_string()))
    }
}

impl AsRef<str> for CallbackUrl {
    fn as_ref(&self) -> &str { &self.0 }
}

impl From<CallbackUrl> for String {
    fn from(value: CallbackUrl) -> Self { value.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CallbackUrlError {
    #[error("callbackUrl is not a syntactically valid absolute URL")]
    Invalid,
    #[error("callbackUrl host is not a trusted domain")]
    InvalidHost,
}

impl CallbackUrlError {
    /// Field-level error code, as surfaced in the `400` validation response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Invalid => "callbackUrl.invalid",
            Self::InvalidHost => "callbackUrl.invalidHost",
        }
    }
}
