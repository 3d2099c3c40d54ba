use std::sync::Arc;

use crate::app::error::{Result, TwtError};
use crate::app::manager::{LexTwtManager, TwtManager};
use crate::ast::TextFormat;
use crate::config::{Config, SiteConfig};
use crate::domain::{Twt, Twter};
use crate::opts::{FmtOpts, SiteOpts};

/// Wires the twt manager and the formatting policy together. Built once by
/// the host application and passed to whatever needs to parse or render.
pub struct AppContext {
    pub manager: Arc<dyn TwtManager + Send + Sync>,
    pub opts: Arc<dyn FmtOpts + Send + Sync>,
}

impl AppContext {
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::default()
    }

    /// Context with the built-in parser and site options from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let opts = SiteOpts::new(config.site.clone())?;
        tracing::info!(
            "Twt context for {} (strict parsing: {})",
            config.site.base_url,
            config.parser.strict
        );

        Self::builder()
            .manager(LexTwtManager::new(config.parser.clone()))
            .opts(opts)
            .build()
    }

    /// Context from the configuration file at the default path.
    pub fn load() -> Result<Self> {
        let config = Config::load().map_err(|e| TwtError::Config(e.to_string()))?;
        Self::from_config(&config)
    }

    pub fn parse_line(&self, line: &str, twter: &Twter) -> Result<Twt> {
        self.manager.parse_line(line, twter)
    }

    /// Render with this context's formatting policy.
    pub fn format(&self, twt: &Twt, mode: TextFormat) -> String {
        twt.format_text(mode, Some(self.opts.as_ref()))
    }
}

#[derive(Default)]
pub struct AppContextBuilder {
    manager: Option<Arc<dyn TwtManager + Send + Sync>>,
    opts: Option<Arc<dyn FmtOpts + Send + Sync>>,
}

impl AppContextBuilder {
    pub fn manager(mut self, manager: impl TwtManager + Send + Sync + 'static) -> Self {
        self.manager = Some(Arc::new(manager));
        self
    }

    pub fn opts(mut self, opts: impl FmtOpts + Send + Sync + 'static) -> Self {
        self.opts = Some(Arc::new(opts));
        self
    }

    /// Fails with [`TwtError::NotConfigured`] when no manager was installed.
    /// Options default to [`SiteConfig::default`].
    pub fn build(self) -> Result<AppContext> {
        let manager = self.manager.ok_or(TwtError::NotConfigured)?;
        let opts = match self.opts {
            Some(opts) => opts,
            None => Arc::new(SiteOpts::new(SiteConfig::default())?),
        };
        Ok(AppContext { manager, opts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;

    fn alice() -> Twter {
        Twter::new("alice", "https://pod.example/user/alice/twtxt.txt")
    }

    fn pod_config() -> Config {
        Config {
            site: SiteConfig {
                base_url: "https://pod.example".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_build_without_manager_is_not_configured() {
        let err = AppContext::builder().build().err().unwrap();
        assert!(matches!(err, TwtError::NotConfigured));
    }

    #[test]
    fn test_build_with_default_opts() {
        let ctx = AppContext::builder()
            .manager(LexTwtManager::default())
            .build()
            .unwrap();
        assert_eq!(ctx.opts.local_url().as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_from_config() {
        let ctx = AppContext::from_config(&pod_config()).unwrap();
        let twt = ctx
            .parse_line(
                "2021-01-24T02:19:54Z\thi @<bob https://pod.example/user/bob/twtxt.txt>",
                &alice(),
            )
            .unwrap();

        assert_eq!(
            ctx.format(&twt, TextFormat::Markdown),
            "hi [@bob](https://pod.example/user/bob#bob)"
        );
        assert_eq!(ctx.format(&twt, TextFormat::Text), "hi @bob@pod.example");
    }

    #[test]
    fn test_from_config_invalid_base_url() {
        let mut config = pod_config();
        config.site.base_url = "not a url".into();
        assert!(matches!(
            AppContext::from_config(&config),
            Err(TwtError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_from_config_strict_parser() {
        let config = Config {
            parser: ParserConfig::strict(),
            ..pod_config()
        };
        let ctx = AppContext::from_config(&config).unwrap();
        assert!(ctx
            .parse_line("2021-01-24T02:19:54Z\t`open", &alice())
            .is_err());
    }

    #[test]
    fn test_context_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppContext>();
    }

    #[test]
    fn test_logs_context_creation() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("twtxt=debug")
            .try_init();
        assert!(AppContext::from_config(&pod_config()).is_ok());
    }
}
