//! fieldmatch - pulldown cadence detection and adaptive inverse telecine
//!
//! fieldmatch recovers the progressive 24p frames hidden in telecined
//! interlaced video. It measures combing and motion between consecutive
//! fields, matches every 10-field cycle against a catalog of pulldown
//! patterns, weaves the fields of each film frame back together, and can
//! fall back to a native-rate (60p) clip per frame or per 8x8 tile wherever
//! the film reconstruction is not trustworthy.
//!
//! # Architecture
//!
//! - `source`: the pull interface every stage reads frames through
//! - `cadence`: field flags, cycle features, pattern catalog, matching
//! - `filter`: weaving, telecine, decomb and the 24p / 60p selector
//! - `format`: YUV4MPEG2 input and output
//! - `config`: every tunable, loadable from JSON
//! - `util`: sample types and planar frames

pub mod cadence;
pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod source;
pub mod util;

pub use cadence::{catalog, CadenceTrack, CycleAnalyzer, MatchResult, PulldownPatternCatalog};
pub use config::{AnalysisConfig, PipelineConfig};
pub use error::{Error, Result};
pub use source::{ClipInfo, FrameSource, MemoryClip};

/// fieldmatch version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Process-wide settings
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Maximum number of threads to use for parallel cycle analysis
    pub max_threads: Option<usize>,
    /// Enable verbose logging
    pub verbose: bool,
    /// Enable debug output
    pub debug: bool,
}

/// Initialize the thread pool and logging
pub fn init(config: Config) -> Result<()> {
    if let Some(threads) = config.max_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| Error::Init(format!("Failed to initialize thread pool: {}", e)))?;
    }

    if config.verbose || config.debug {
        let level = if config.debug { "debug" } else { "info" };
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| Error::Init(format!("Failed to initialize logging: {}", e)))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION_MAJOR, 0);
        assert_eq!(VERSION_MINOR, 1);
        assert_eq!(VERSION_PATCH, 0);
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_threads, None);
        assert!(!config.verbose);
        assert!(!config.debug);
    }

    #[test]
    fn test_init() {
        let config = Config::default();
        assert!(init(config).is_ok());
    }
}
