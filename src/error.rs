pub type Result<T, E = PackError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum PackError {
    #[error("InvalidMissMgmt({0})")]
    InvalidMissMgmt(i32),

    #[error("UnsupportedPrecision({0})")]
    UnsupportedPrecision(i32),

    #[error("BufferOverrun({0} bits needed, {1} available)")]
    BufferOverrun(usize, usize),

    #[error("InvalidTemplate({0})")]
    InvalidTemplate(String),

    #[error("DecodeError({0})")]
    DecodeError(String),
}
