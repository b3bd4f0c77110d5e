use crate::*;

use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("privatevote: invalid address - invalid hexidecimal")]
    AddressBadHex,

    #[error("privatevote: invalid address - wrong length")]
    AddressBadLen,

    #[error("privatevote: invalid ciphertext encoding")]
    CiphertextBadEncoding,

    #[error("privatevote: invalid tally key encoding")]
    TallyKeyBadEncoding,

    #[error("privatevote: invalid input proof - invalid hexidecimal")]
    InputProofBadHex,

    #[error("privatevote: invalid amount: {0}")]
    InvalidAmount(String),

    #[error("privatevote: JSON error: {0}")]
    JSON(#[from] serde_json::Error),

    #[error("privatevote: signature error: {0}")]
    SignatureError(#[from] ed25519_dalek::SignatureError),

    #[error("privatevote: decryption oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("privatevote: decrypted value is outside the search bound of {0}")]
    DecryptionOutOfRange(u64),

    #[error("privatevote: ledger lock poisoned")]
    LockPoisoned,

    #[error("privatevote: poll id {0} is already taken")]
    DuplicatePollId(PollId),
}

/// Broad classes of rejected operations
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authorization,
    Funding,
    Temporal,
    State,
    NotFound,
    Internal,
}

/// Operation validation errors
///
/// Every variant aborts the operation that produced it before any state is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("privatevote validation: a poll needs between 2 and 10 options, found {0}")]
    InvalidOptionCount(usize),

    #[error("privatevote validation: option {0} is empty")]
    EmptyOption(usize),

    #[error("privatevote validation: title is {0} characters, limit is 100")]
    TitleTooLong(usize),

    #[error("privatevote validation: description is {0} characters, limit is 500")]
    DescriptionTooLong(usize),

    #[error("privatevote validation: start time {start} must be before end time {end}")]
    InvalidTimeRange { start: Timestamp, end: Timestamp },

    #[error("privatevote validation: option {0} does not exist in poll")]
    InvalidOptionIndex(usize),

    #[error("privatevote validation: expected {expected} tallies, found {found}")]
    TallyCountMismatch { expected: usize, found: usize },

    #[error("privatevote validation: encrypted input failed verification")]
    InputVerificationFailed,

    #[error("privatevote: only the owner may call this operation")]
    OnlyOwner,

    #[error("privatevote: only the decryption oracle may deliver results")]
    OnlyOracle,

    #[error("privatevote: creation fee of {required} wei required, {paid} wei paid")]
    InsufficientCreationFee { required: Amount, paid: Amount },

    #[error("privatevote: no fees to withdraw")]
    NoFeesToWithdraw,

    #[error("privatevote: voting has not started")]
    VotingNotStarted,

    #[error("privatevote: voting has ended")]
    VotingEnded,

    #[error("privatevote: voting is still active")]
    VotingStillActive,

    #[error("privatevote: {0} has already voted")]
    AlreadyVoted(Address),

    #[error("privatevote: poll is already revealed")]
    AlreadyRevealed,

    #[error("privatevote: decryption is already in progress")]
    DecryptionInProgress,

    #[error("privatevote: no decryption in progress for poll {0}")]
    NoDecryptionInProgress(PollId),

    #[error("privatevote: stale decryption result {request_id} for poll {poll_id}")]
    StaleDecryptionResult {
        poll_id: PollId,
        request_id: RequestId,
    },

    #[error("privatevote: {0}")]
    PollNotFound(#[from] PollNotFound),

    #[error("privatevote: internal error: {0}")]
    Internal(#[from] Error),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        use ValidationError::*;

        match self {
            InvalidOptionCount(_)
            | EmptyOption(_)
            | TitleTooLong(_)
            | DescriptionTooLong(_)
            | InvalidTimeRange { .. }
            | InvalidOptionIndex(_)
            | TallyCountMismatch { .. }
            | InputVerificationFailed => ErrorKind::Validation,
            OnlyOwner | OnlyOracle => ErrorKind::Authorization,
            InsufficientCreationFee { .. } | NoFeesToWithdraw => ErrorKind::Funding,
            VotingNotStarted | VotingEnded | VotingStillActive => ErrorKind::Temporal,
            AlreadyVoted(_)
            | AlreadyRevealed
            | DecryptionInProgress
            | NoDecryptionInProgress(_)
            | StaleDecryptionResult { .. } => ErrorKind::State,
            PollNotFound(_) => ErrorKind::NotFound,
            Internal(_) => ErrorKind::Internal,
        }
    }
}
