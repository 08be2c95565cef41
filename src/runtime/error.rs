use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {msg}")]
    Config { msg: String },

    #[error("Barcode lookup from '{origin}' failed{}", Error::format_msg_as_detail(msg))]
    ResourceLookup { origin: String, msg: Option<String> },

    #[error("Expected exactly one {role} file matching '{pattern}' in {dir:?}, found {found}")]
    InputDiscovery {
        role: String,
        pattern: String,
        dir: std::path::PathBuf,
        found: usize,
    },

    #[error("Streams desynchronized at read {ordinal}: {msg}")]
    Synchronization { ordinal: u64, msg: String },

    #[error("Invalid nucleotide '{}' in index sequence", *base as char)]
    MalformedSequence { base: u8 },

    #[error("Failed parsing {}{}", context, Error::format_msg_as_detail(msg))]
    Parse {
        context: String,
        msg: Option<String>,
    },

    #[error("I/O error on '{channel}': {source}")]
    ChannelIo {
        channel: String,
        source: std::io::Error,
    },
}

impl Error {
    #[cold]
    pub fn config<M: Into<String>>(msg: M) -> Self {
        Error::Config { msg: msg.into() }
    }

    #[cold]
    pub fn resource_lookup<S: Into<String>, M: Into<String>>(origin: S, msg: Option<M>) -> Self {
        Error::ResourceLookup {
            origin: origin.into(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn input_discovery<R: Into<String>, P: Into<String>>(
        role: R,
        pattern: P,
        dir: &std::path::Path,
        found: usize,
    ) -> Self {
        Error::InputDiscovery {
            role: role.into(),
            pattern: pattern.into(),
            dir: dir.to_path_buf(),
            found,
        }
    }

    #[cold]
    pub fn synchronization<M: Into<String>>(ordinal: u64, msg: M) -> Self {
        Error::Synchronization {
            ordinal,
            msg: msg.into(),
        }
    }

    #[cold]
    pub fn malformed_sequence(base: u8) -> Self {
        Error::MalformedSequence { base }
    }

    #[cold]
    pub fn parse_error<C: Into<String>, M: Into<String>>(context: C, msg: Option<M>) -> Self {
        Error::Parse {
            context: context.into(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn channel_io<C: Into<String>>(channel: C, source: std::io::Error) -> Self {
        Error::ChannelIo {
            channel: channel.into(),
            source,
        }
    }

    pub fn format_msg_as_detail(msg: &Option<String>) -> String {
        match msg {
            Some(m) => format!(" ({})", m),
            None => String::new(),
        }
    }
}
