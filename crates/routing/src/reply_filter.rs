use hermod_common::ReplyPayload;

/// Reply-threading mode for outgoing payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplyMode {
    /// Strip reply linkage unless the payload explicitly asked for it.
    Off,
    /// Keep all reply linkage.
    All,
    /// Keep linkage only on the first payload of the batch.
    #[default]
    First,
}

impl ReplyMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Some(Self::Off),
            "all" => Some(Self::All),
            "first" => Some(Self::First),
            _ => None,
        }
    }
}

/// Channel-specific threading options.
#[derive(Debug, Clone, Copy)]
pub struct ReplyFilterOpts {
    /// Whether an explicitly-tagged payload keeps its reply link even in
    /// `off` mode.
    pub allow_explicit_when_off: bool,
}

impl Default for ReplyFilterOpts {
    fn default() -> Self {
        Self {
            allow_explicit_when_off: true,
        }
    }
}

/// Stateful per-batch reply-link filter. Build a fresh instance for every
/// outgoing batch; `first` tracking must not leak across batches.
#[derive(Debug)]
pub struct ReplyFilter {
    mode: ReplyMode,
    opts: ReplyFilterOpts,
    seen: bool,
}

impl ReplyFilter {
    pub fn new(mode: ReplyMode, opts: ReplyFilterOpts) -> Self {
        Self {
            mode,
            opts,
            seen: false,
        }
    }

    pub fn apply(&mut self, mut payload: ReplyPayload) -> ReplyPayload {
        let first = !self.seen;
        self.seen = true;

        let keep = match self.mode {
            ReplyMode::All => true,
            ReplyMode::Off => payload.explicit_tag && self.opts.allow_explicit_when_off,
            ReplyMode::First => first || payload.explicit_tag,
        };
        if !keep {
            payload.reply_to_id = None;
        }
        payload
    }
}
