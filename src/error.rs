use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported compressed file: {0}")]
    UnsupportedArchive(String),
    #[error("member {member} missing from batch read of {archive}")]
    MemberMissing { archive: String, member: String },
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    E001MemberUnreadable,
    E002ArchiveUnreadable,
    E003MissingDate,
    E004LineDropped,
    E005CombineSkipped,
    E006IndexUnavailable,
    E007LossyDecode,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001MemberUnreadable => "E001_MEMBER_UNREADABLE",
            Self::E002ArchiveUnreadable => "E002_ARCHIVE_UNREADABLE",
            Self::E003MissingDate => "E003_MISSING_DATE",
            Self::E004LineDropped => "E004_LINE_DROPPED",
            Self::E005CombineSkipped => "E005_COMBINE_SKIPPED",
            Self::E006IndexUnavailable => "E006_INDEX_UNAVAILABLE",
            Self::E007LossyDecode => "E007_LOSSY_DECODE",
        }
    }
}
