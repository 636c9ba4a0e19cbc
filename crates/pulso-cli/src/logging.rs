use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::Context;
use pulso_core::AppConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `PULSO_LOG_LEVEL`. When `PULSO_LOG_DIR` is set, events
/// are also appended without ANSI colours to `pulso.log` in that directory.
pub(crate) fn init(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let file_layer = match &config.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let path = dir.join("pulso.log");
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()?;
    Ok(())
}

fn fallback_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .finish()
}

fn log_startup_error(err: &anyhow::Error) {
    tracing::error!("startup failed: {err:#}");
}

/// Log an error raised before [`init`] could install the configured subscriber.
///
/// Installs a stderr subscriber first; if one is already installed it is used.
pub(crate) fn report_startup_error(err: &anyhow::Error) {
    tracing::subscriber::set_global_default(fallback_subscriber(std::io::stderr)).ok();
    log_startup_error(err);
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::Arc;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn config_error_is_logged_through_the_fallback_subscriber() {
        let captured = Captured::default();
        let err = anyhow::Error::from(pulso_core::ConfigError::InvalidEnvVar {
            var: "PULSO_MAX_ATTEMPTS".to_string(),
            reason: "invalid digit found in string".to_string(),
        });

        tracing::subscriber::with_default(fallback_subscriber(captured.clone()), || {
            log_startup_error(&err);
        });

        let text = captured.text();
        assert!(text.contains("ERROR"), "{text}");
        assert!(text.contains("startup failed"), "{text}");
        assert!(text.contains("PULSO_MAX_ATTEMPTS"), "{text}");
    }
}
