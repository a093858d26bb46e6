use std::time::Duration;

use antwort_protocol::ValidationLimits;

/// Process-wide gateway configuration, grounded on the teacher's
/// `Config`/`ModelProviderInfo` split (`core/src/client.rs`). Concrete
/// config-file loading is out of scope (spec §1); this shape exists so a
/// caller's own loader has somewhere to deposit values before constructing
/// an `Engine`.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub validation_limits: ValidationLimits,
    pub default_model: String,
    pub max_agentic_turns: u32,
    pub provider_call_deadline: Duration,
    pub stream_channel_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            validation_limits: ValidationLimits::default(),
            default_model: "gpt-4o".to_string(),
            max_agentic_turns: 10,
            provider_call_deadline: Duration::from_secs(120),
            stream_channel_capacity: 32,
        }
    }
}

impl GatewayConfig {
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    inner: GatewayConfigOverrides,
}

#[derive(Debug, Default)]
struct GatewayConfigOverrides {
    validation_limits: Option<ValidationLimits>,
    default_model: Option<String>,
    max_agentic_turns: Option<u32>,
    provider_call_deadline: Option<Duration>,
    stream_channel_capacity: Option<usize>,
}

impl GatewayConfigBuilder {
    pub fn validation_limits(mut self, limits: ValidationLimits) -> Self {
        self.inner.validation_limits = Some(limits);
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.inner.default_model = Some(model.into());
        self
    }

    pub fn max_agentic_turns(mut self, turns: u32) -> Self {
        self.inner.max_agentic_turns = Some(turns);
        self
    }

    pub fn provider_call_deadline(mut self, deadline: Duration) -> Self {
        self.inner.provider_call_deadline = Some(deadline);
        self
    }

    pub fn stream_channel_capacity(mut self, capacity: usize) -> Self {
        self.inner.stream_channel_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> GatewayConfig {
        let defaults = GatewayConfig::default();
        GatewayConfig {
            validation_limits: self.inner.validation_limits.unwrap_or(defaults.validation_limits),
            default_model: self.inner.default_model.unwrap_or(defaults.default_model),
            max_agentic_turns: self.inner.max_agentic_turns.unwrap_or(defaults.max_agentic_turns),
            provider_call_deadline: self
                .inner
                .provider_call_deadline
                .unwrap_or(defaults.provider_call_deadline),
            stream_channel_capacity: self
                .inner
                .stream_channel_capacity
                .unwrap_or(defaults.stream_channel_capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_only_the_fields_it_was_given() {
        let config = GatewayConfig::builder().max_agentic_turns(3).build();
        assert_eq!(config.max_agentic_turns, 3);
        assert_eq!(config.default_model, GatewayConfig::default().default_model);
    }
}
