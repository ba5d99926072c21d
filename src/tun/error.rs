#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("end of stream")]
    Eof,
    #[error("tun closed")]
    Closed,
}
