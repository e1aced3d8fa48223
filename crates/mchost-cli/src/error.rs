use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("cannot read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("no link configured; pass --serial or --tcp, or set one in the config file")]
    NoLink,

    #[error("serial links are not supported on this platform")]
    SerialUnsupported,

    #[error("invalid hex key: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("cannot install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error(transparent)]
    Client(#[from] mchost_client::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
