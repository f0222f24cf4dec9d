use log::{LevelFilter, Log, Metadata, Record};

/// Fans every record out to several loggers, after applying per-target caps.
pub struct MultiLogger {
    loggers: Vec<Box<dyn Log>>,
    target_caps: Vec<(String, LevelFilter)>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self {
            loggers: Vec::new(),
            target_caps: Vec::new(),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn Log>) -> Self {
        self.loggers.push(logger);
        self
    }

    /// Caps the level of every target starting with `target_prefix`, for all loggers.
    pub fn with_target_cap(
        mut self,
        target_prefix: impl Into<String>,
        max_level: LevelFilter,
    ) -> Self {
        self.target_caps.push((target_prefix.into(), max_level));
        self
    }

    /// Installs the logger as the global logger. Filtering is left to the inner loggers.
    pub fn init(self) -> Result<(), log::SetLoggerError> {
        log::set_max_level(LevelFilter::Trace);
        log::set_boxed_logger(Box::new(self))
    }

    fn is_capped(&self, metadata: &Metadata) -> bool {
        self.target_caps.iter().any(|(prefix, max_level)| {
            metadata.target().starts_with(prefix.as_str()) && metadata.level() > *max_level
        })
    }
}

impl Log for MultiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        !self.is_capped(metadata) && self.loggers.iter().any(|l| l.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        if self.is_capped(record.metadata()) {
            return;
        }

        for logger in self
            .loggers
            .iter()
            .filter(|l| l.enabled(record.metadata()))
        {
            logger.log(record);
        }
    }

    fn flush(&self) {
        self.loggers.iter().for_each(|l| l.flush());
    }
}
