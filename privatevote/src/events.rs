use crate::*;

/// Ledger events
///
/// A vote only records who voted, never what they voted for.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Event {
    PollCreated {
        poll_id: PollId,
        creator: Address,
        title: String,
        start_time: Timestamp,
        end_time: Timestamp,
        option_count: usize,
        #[serde(with = "amount_string")]
        paid_fee: Amount,
    },
    Voted {
        poll_id: PollId,
        voter: Address,
    },
    RevealRequested {
        poll_id: PollId,
        request_id: RequestId,
        requested_by: Address,
    },
    RevealCompleted {
        poll_id: PollId,
    },
    CreationFeeUpdated {
        #[serde(with = "amount_string")]
        old_fee: Amount,
        #[serde(with = "amount_string")]
        new_fee: Amount,
        owner: Address,
    },
    FeesWithdrawn {
        #[serde(with = "amount_string")]
        amount: Amount,
        owner: Address,
    },
}

impl Event {
    /// The poll this event is about, if any
    pub fn poll_id(&self) -> Option<PollId> {
        match self {
            Event::PollCreated { poll_id, .. }
            | Event::Voted { poll_id, .. }
            | Event::RevealRequested { poll_id, .. }
            | Event::RevealCompleted { poll_id } => Some(*poll_id),
            Event::CreationFeeUpdated { .. } | Event::FeesWithdrawn { .. } => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: Timestamp,
    pub event: Event,
}

/// Append-only log of emitted events
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub(crate) fn emit(&mut self, timestamp: Timestamp, event: Event) -> u64 {
        let seq = self.records.len() as u64;
        self.records.push(EventRecord {
            seq,
            timestamp,
            event,
        });
        seq
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    pub fn for_poll(&self, poll_id: PollId) -> impl Iterator<Item = &EventRecord> {
        self.records
            .iter()
            .filter(move |r| r.event.poll_id() == Some(poll_id))
    }

    /// The record of a poll's creation
    pub fn creation_event(&self, poll_id: PollId) -> Option<&EventRecord> {
        self.for_poll(poll_id)
            .find(|r| matches!(r.event, Event::PollCreated { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log() {
        let mut log = EventLog::default();
        let owner = Address::derive(b"owner");

        log.emit(
            5,
            Event::CreationFeeUpdated {
                old_fee: 1,
                new_fee: 2,
                owner,
            },
        );
        log.emit(
            6,
            Event::PollCreated {
                poll_id: 0,
                creator: owner,
                title: "Poll".to_owned(),
                start_time: 10,
                end_time: 20,
                option_count: 2,
                paid_fee: 2,
            },
        );
        log.emit(7, Event::RevealCompleted { poll_id: 0 });

        assert_eq!(log.records().len(), 3);
        assert_eq!(log.for_poll(0).count(), 2);
        assert_eq!(log.creation_event(0).unwrap().seq, 1);
        assert!(log.creation_event(1).is_none());
        assert_eq!(log.last().unwrap().timestamp, 7);

        let json = serde_json::to_value(&log.records()[2].event).unwrap();
        assert_eq!(json["type"], "reveal_completed");
    }
}
