use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Record channel is closed")]
    Closed,

    #[error("Cannot push after a terminal marker")]
    AfterTerminal,
}
