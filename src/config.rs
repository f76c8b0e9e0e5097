/// Credentials for the external ticketing sources.
///
/// Built once at startup and handed to `Aggregator::new`; there is no
/// hidden global. Any credential left unset simply disables that source.
#[derive(Debug, Clone, Default)]
pub struct AggregatorConfig {
    pub ticketmaster_api_key: Option<String>,
    pub eventbrite_token: Option<String>,
    pub seatgeek_client_id: Option<String>,
}

impl AggregatorConfig {
    pub fn from_env() -> Self {
        Self {
            ticketmaster_api_key: non_empty_var("TICKETMASTER_API_KEY"),
            eventbrite_token: non_empty_var("EVENTBRITE_TOKEN"),
            seatgeek_client_id: non_empty_var("SEATGEEK_CLIENT_ID"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ticketmaster_api_key.is_none()
            && self.eventbrite_token.is_none()
            && self.seatgeek_client_id.is_none()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_sources() {
        let config = AggregatorConfig::default();
        assert!(config.is_empty());
    }
}
