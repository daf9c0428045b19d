use std::{fmt, str::FromStr, time::Duration};

/// Wraps a credential so it never ends up in logs.
#[derive(Clone, Default)]
pub struct Secret<T>
where
    T: Clone + Default,
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaypalMode {
    #[default]
    Sandbox,
    Live,
}

impl FromStr for PaypalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(PaypalMode::Sandbox),
            "live" => Ok(PaypalMode::Live),
            other => Err(format!("unknown PayPal mode '{other}'")),
        }
    }
}

impl PaypalMode {
    pub fn base_url(&self) -> &'static str {
        match self {
            PaypalMode::Sandbox => "https://api-m.sandbox.paypal.com",
            PaypalMode::Live => "https://api-m.paypal.com",
        }
    }
}

/// Explicit provider configuration, built once at startup and handed to [`super::PaypalApi`].
#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub mode: PaypalMode,
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Currency every order is created in.
    pub currency: String,
    pub timeout: Duration,
}

impl Default for PaypalConfig {
    fn default() -> Self {
        Self {
            mode: PaypalMode::Sandbox,
            client_id: String::new(),
            client_secret: Secret::default(),
            currency: "USD".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}
