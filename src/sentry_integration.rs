use sentry;
use sentry::internals::ClientInitGuard;

#[derive(Debug, Deserialize, Clone)]
pub struct SentryConfig {
    pub dsn: String,
}

/// Installs the sentry client and panic handler, the guard flushes events on drop.
pub fn init(sentry_config: Option<&SentryConfig>) -> Option<ClientInitGuard> {
    sentry_config.map(|config_sentry| {
        info!("Initialization support with sentry");
        let result = sentry::init((
            config_sentry.dsn.clone(),
            sentry::ClientOptions {
                release: sentry_crate_release!(),
                ..Default::default()
            },
        ));
        sentry::integrations::panic::register_panic_handler();
        result
    })
}
