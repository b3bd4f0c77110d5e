use crate::*;
use num_enum::TryFromPrimitive;
use std::collections::HashSet;

/// Sequential poll identifier
pub type PollId = u64;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;
pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Parameters for a poll that has not been created yet
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NewPoll {
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl NewPoll {
    pub fn new(
        title: &str,
        description: &str,
        options: &[&str],
        start: Timestamp,
        end: Timestamp,
    ) -> Self {
        NewPoll {
            title: title.to_owned(),
            description: description.to_owned(),
            options: options.iter().map(|o| (*o).to_owned()).collect(),
            start_time: start,
            end_time: end,
        }
    }

    /// Validate the poll parameters
    ///
    /// Lengths are counted in characters, not bytes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.options.len() < MIN_OPTIONS || self.options.len() > MAX_OPTIONS {
            return Err(ValidationError::InvalidOptionCount(self.options.len()));
        }
        if let Some(index) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(ValidationError::EmptyOption(index));
        }

        let title_len = self.title.chars().count();
        if title_len > MAX_TITLE_LEN {
            return Err(ValidationError::TitleTooLong(title_len));
        }
        let description_len = self.description.chars().count();
        if description_len > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::DescriptionTooLong(description_len));
        }

        if self.start_time >= self.end_time {
            return Err(ValidationError::InvalidTimeRange {
                start: self.start_time,
                end: self.end_time,
            });
        }

        Ok(())
    }
}

/// Where a poll is in its life
///
/// Always derived from the clock and the stored flags, never stored itself.
#[derive(
    Serialize, Deserialize, TryFromPrimitive, Copy, Clone, Debug, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PollStatus {
    Upcoming = 0,
    Active = 1,
    Ended = 2,
    Revealed = 3,
}

impl PollStatus {
    pub fn derive(start: Timestamp, end: Timestamp, revealed: bool, now: Timestamp) -> Self {
        if revealed {
            PollStatus::Revealed
        } else if now < start {
            PollStatus::Upcoming
        } else if now < end {
            PollStatus::Active
        } else {
            PollStatus::Ended
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PollStatus::Upcoming => "upcoming",
            PollStatus::Active => "active",
            PollStatus::Ended => "ended",
            PollStatus::Revealed => "revealed",
        }
    }
}

impl std::fmt::Display for PollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A timed, multi-option confidential poll
///
/// Metadata is fixed at creation. The voter set and the encrypted tally change only when
/// a vote is accepted; the plaintext tallies and the revealed flag change only when a
/// decryption result is finalized.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Poll {
    pub(crate) id: PollId,
    pub(crate) creator: Address,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) options: Vec<String>,
    pub(crate) start_time: Timestamp,
    pub(crate) end_time: Timestamp,
    pub(crate) total_voters: u64,
    pub(crate) tally: ConfidentialTallyAccumulator,
    pub(crate) plaintext_tallies: Option<Vec<u64>>,
    pub(crate) revealed: bool,
    pub(crate) decryption_in_progress: bool,
    pub(crate) voters: HashSet<Address>,
}

impl Poll {
    /// Create a poll from already-validated parameters
    pub(crate) fn new(id: PollId, creator: Address, params: NewPoll) -> Self {
        let tally = ConfidentialTallyAccumulator::zero(params.options.len());
        Poll {
            id,
            creator,
            title: params.title,
            description: params.description,
            options: params.options,
            start_time: params.start_time,
            end_time: params.end_time,
            total_voters: 0,
            tally,
            plaintext_tallies: None,
            revealed: false,
            decryption_in_progress: false,
            voters: HashSet::new(),
        }
    }

    pub fn id(&self) -> PollId {
        self.id
    }

    pub fn creator(&self) -> Address {
        self.creator
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn end_time(&self) -> Timestamp {
        self.end_time
    }

    pub fn total_voters(&self) -> u64 {
        self.total_voters
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn is_decryption_in_progress(&self) -> bool {
        self.decryption_in_progress
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains(voter)
    }

    pub fn tally_ciphertexts(&self) -> &[Ciphertext] {
        self.tally.ciphertexts()
    }

    pub fn plaintext_tallies(&self) -> Option<&[u64]> {
        self.plaintext_tallies.as_deref()
    }

    pub fn status(&self, now: Timestamp) -> PollStatus {
        PollStatus::derive(self.start_time, self.end_time, self.revealed, now)
    }

    pub fn info(&self) -> PollInfo {
        PollInfo {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            revealed: self.revealed,
            creator: self.creator,
            total_voters: self.total_voters,
        }
    }

    /// Tallies are only present once the poll has been revealed
    pub fn results(&self) -> PollResults {
        PollResults {
            id: self.id,
            revealed: self.revealed,
            tallies: self.plaintext_tallies.clone(),
            total_votes: self.total_voters,
        }
    }
}

/// Public poll metadata
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PollInfo {
    pub id: PollId,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub revealed: bool,
    pub creator: Address,
    pub total_voters: u64,
}

/// Revealed tallies of a poll
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PollResults {
    pub id: PollId,
    pub revealed: bool,
    pub tallies: Option<Vec<u64>>,
    pub total_votes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    fn params() -> NewPoll {
        NewPoll::new(
            "Test Poll",
            "This is a test poll",
            &["Option A", "Option B", "Option C"],
            100,
            200,
        )
    }

    #[test]
    fn test_validate_new_poll() {
        params().validate().unwrap();

        let mut poll = params();
        poll.options = vec!["Only".to_owned()];
        assert!(matches!(
            poll.validate(),
            Err(ValidationError::InvalidOptionCount(1))
        ));

        poll.options = (0..11).map(|i| format!("Option {}", i)).collect();
        assert!(matches!(
            poll.validate(),
            Err(ValidationError::InvalidOptionCount(11))
        ));

        poll.options = (0..10).map(|i| format!("Option {}", i)).collect();
        poll.validate().unwrap();

        let mut poll = params();
        poll.options[1] = "  ".to_owned();
        assert!(matches!(
            poll.validate(),
            Err(ValidationError::EmptyOption(1))
        ));

        let mut poll = params();
        poll.title = "x".repeat(MAX_TITLE_LEN);
        poll.validate().unwrap();
        poll.title = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(matches!(
            poll.validate(),
            Err(ValidationError::TitleTooLong(101))
        ));

        // Multi-byte characters count once
        let mut poll = params();
        poll.description = "é".repeat(MAX_DESCRIPTION_LEN);
        poll.validate().unwrap();
        poll.description.push('é');
        assert!(matches!(
            poll.validate(),
            Err(ValidationError::DescriptionTooLong(501))
        ));

        let mut poll = params();
        poll.end_time = poll.start_time;
        assert!(matches!(
            poll.validate(),
            Err(ValidationError::InvalidTimeRange { start: 100, end: 100 })
        ));
    }

    #[test]
    fn test_status_projection() {
        let poll = Poll::new(0, Address::derive(b"creator"), params());

        assert_eq!(poll.status(99), PollStatus::Upcoming);
        assert_eq!(poll.status(100), PollStatus::Active);
        assert_eq!(poll.status(199), PollStatus::Active);
        assert_eq!(poll.status(200), PollStatus::Ended);

        // Revealed wins regardless of time
        assert_eq!(PollStatus::derive(100, 200, true, 0), PollStatus::Revealed);

        assert_eq!(PollStatus::try_from(2u8).unwrap(), PollStatus::Ended);
        assert_eq!(format!("{}", PollStatus::Upcoming), "upcoming");
    }

    #[test]
    fn test_fresh_poll() {
        let poll = Poll::new(7, Address::derive(b"creator"), params());

        assert_eq!(poll.tally_ciphertexts(), &[Ciphertext::zero(); 3][..]);
        assert!(poll.plaintext_tallies().is_none());
        assert!(!poll.has_voted(&Address::derive(b"creator")));

        let results = poll.results();
        assert!(!results.revealed);
        assert!(results.tallies.is_none());
        assert_eq!(results.total_votes, 0);

        let info = poll.info();
        assert_eq!(info.id, 7);
        assert_eq!(info.options.len(), 3);
    }
}
