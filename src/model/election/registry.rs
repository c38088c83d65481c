use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::address::Address;

use super::{
    candidate::{leading_candidate, Candidate},
    election_core::{Election, Phase},
    error::BallotError,
    gate,
    voter::Voter,
};

/// Who is performing an operation, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub caller: Address,
    pub now: DateTime<Utc>,
}

impl Context {
    pub fn new(caller: Address, now: DateTime<Utc>) -> Self {
        Self { caller, now }
    }
}

/// The outcome of a finalized election.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner<'a> {
    Candidate(&'a Candidate),
    /// Nobody received a vote, or there were no candidates.
    NoWinner,
}

/// The election registry and ballot box: the election, its candidates and
/// voters, and every rule governing how they change.
///
/// Every operation checks all of its preconditions before touching any
/// field, so a rejected operation leaves the registry exactly as it was.
/// Candidates and voters are kept in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    admin: Address,
    election: Option<Election>,
    candidates: Vec<Candidate>,
    voters: Vec<Voter>,
    /// How long before the start date candidate registration closes.
    /// Operational policy, not part of the stored state.
    #[serde(skip, default = "Duration::zero")]
    registration_lead: Duration,
}

impl Registry {
    /// An empty registry administered by `admin`.
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            election: None,
            candidates: Vec::new(),
            voters: Vec::new(),
            registration_lead: Duration::zero(),
        }
    }

    pub fn set_registration_lead(&mut self, lead: Duration) {
        self.registration_lead = lead;
    }

    /// Create the election. Admin only; may only happen once.
    pub fn create_election(
        &mut self,
        ctx: &Context,
        name: String,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<&Election, BallotError> {
        gate::admin_only(&self.admin, &ctx.caller)?;
        if self.election.is_some() {
            return Err(BallotError::ElectionExists);
        }
        if name.trim().is_empty() {
            return Err(BallotError::EmptyName("Election name"));
        }
        if start_date >= end_date {
            return Err(BallotError::InvalidSchedule);
        }

        Ok(&*self
            .election
            .insert(Election::new(name, start_date, end_date)))
    }

    /// Register a candidate. Admin only; closes at the start date.
    pub fn add_candidate(
        &mut self,
        ctx: &Context,
        candidate_address: Address,
        name: String,
        party: String,
        image: String,
    ) -> Result<&Candidate, BallotError> {
        gate::admin_only(&self.admin, &ctx.caller)?;
        let election = self.election.as_ref().ok_or(BallotError::NoElection)?;
        gate::not_finalized(election.finalized)?;
        gate::before(ctx.now, election.start_date, self.registration_lead)?;
        if self.candidate(&candidate_address).is_some() {
            return Err(BallotError::CandidateExists);
        }
        if name.trim().is_empty() {
            return Err(BallotError::EmptyName("Candidate name"));
        }

        self.candidates
            .push(Candidate::new(candidate_address, name, party, image));
        Ok(&self.candidates[self.candidates.len() - 1])
    }

    /// Register a voter. Admin only; allowed until the election is finalized.
    pub fn add_voter(
        &mut self,
        ctx: &Context,
        voter_address: Address,
        name: String,
        age: u32,
    ) -> Result<&Voter, BallotError> {
        gate::admin_only(&self.admin, &ctx.caller)?;
        gate::not_finalized(self.has_election_finalized())?;
        if self.voter(&voter_address).is_some() {
            return Err(BallotError::VoterExists);
        }
        if name.trim().is_empty() {
            return Err(BallotError::EmptyName("Voter name"));
        }

        self.voters.push(Voter::new(voter_address, name, age));
        Ok(&self.voters[self.voters.len() - 1])
    }

    /// Enable voting. Admin only. Not tied to the start date: voting itself
    /// is still confined to the election's time window.
    pub fn start_election(&mut self, ctx: &Context) -> Result<(), BallotError> {
        gate::admin_only(&self.admin, &ctx.caller)?;
        let election = self.election.as_mut().ok_or(BallotError::NoElection)?;
        gate::not_finalized(election.finalized)?;
        if election.started {
            return Err(BallotError::AlreadyStarted);
        }

        election.started = true;
        Ok(())
    }

    /// Finalize the election. Admin only; irreversible.
    pub fn end_election(&mut self, ctx: &Context) -> Result<(), BallotError> {
        gate::admin_only(&self.admin, &ctx.caller)?;
        let election = self.election.as_mut().ok_or(BallotError::NoElection)?;
        gate::not_finalized(election.finalized)?;
        if !election.started {
            return Err(BallotError::NotStarted);
        }

        election.finalized = true;
        Ok(())
    }

    /// Cast the caller's single vote for `candidate_address`.
    ///
    /// Checked in order: the election is open for voting, the caller is a
    /// registered voter, the caller has not voted, the candidate exists.
    pub fn vote(
        &mut self,
        ctx: &Context,
        candidate_address: &Address,
    ) -> Result<&Candidate, BallotError> {
        let election = self.election.as_ref().ok_or(BallotError::NoElection)?;
        gate::not_finalized(election.finalized)?;
        if !election.started {
            return Err(BallotError::NotStarted);
        }
        gate::during(ctx.now, election.start_date, election.end_date)?;

        let voter_index = self
            .voters
            .iter()
            .position(|voter| voter.voter_address == ctx.caller)
            .ok_or(BallotError::NotEligible)?;
        if self.voters[voter_index].has_voted {
            return Err(BallotError::AlreadyVoted);
        }
        let candidate_index = self
            .candidates
            .iter()
            .position(|candidate| &candidate.candidate_address == candidate_address)
            .ok_or(BallotError::InvalidCandidate)?;
        let new_count = self.candidates[candidate_index]
            .vote_count
            .checked_add(1)
            .ok_or(BallotError::VoteCountOverflow)?;

        self.voters[voter_index].has_voted = true;
        self.candidates[candidate_index].vote_count = new_count;
        Ok(&self.candidates[candidate_index])
    }

    /// The winner of a finalized election.
    pub fn winner(&self) -> Result<Winner<'_>, BallotError> {
        if !self.has_election_finalized() {
            return Err(BallotError::NotFinalized);
        }
        Ok(leading_candidate(&self.candidates)
            .map(Winner::Candidate)
            .unwrap_or(Winner::NoWinner))
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    pub fn election(&self) -> Option<&Election> {
        self.election.as_ref()
    }

    pub fn election_name(&self) -> Option<&str> {
        self.election.as_ref().map(|election| election.name.as_str())
    }

    pub fn has_election_started(&self) -> bool {
        self.election.as_ref().map_or(false, |election| election.started)
    }

    pub fn has_election_finalized(&self) -> bool {
        self.election
            .as_ref()
            .map_or(false, |election| election.finalized)
    }

    pub fn phase(&self) -> Phase {
        self.election
            .as_ref()
            .map_or(Phase::Uncreated, Election::phase)
    }

    /// Whether the voting window has closed, whatever the lifecycle phase.
    pub fn voting_window_closed(&self, now: DateTime<Utc>) -> bool {
        self.election
            .as_ref()
            .map_or(false, |election| gate::after(now, election.end_date).is_ok())
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn voters(&self) -> &[Voter] {
        &self.voters
    }

    pub fn candidate(&self, address: &Address) -> Option<&Candidate> {
        self.candidates
            .iter()
            .find(|candidate| &candidate.candidate_address == address)
    }

    pub fn voter(&self, address: &Address) -> Option<&Voter> {
        self.voters
            .iter()
            .find(|voter| &voter.voter_address == address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: u8 = 0xad;

    fn admin_at(now: DateTime<Utc>) -> Context {
        Context::new(Address::example(ADMIN), now)
    }

    fn account_at(n: u8, now: DateTime<Utc>) -> Context {
        Context::new(Address::example(n), now)
    }

    /// A registry with an election opening in three days and lasting one.
    fn with_election(now: DateTime<Utc>) -> Registry {
        let mut registry = Registry::new(Address::example(ADMIN));
        registry
            .create_election(
                &admin_at(now),
                "Pemilu 2025".to_string(),
                now + Duration::days(3),
                now + Duration::days(4),
            )
            .unwrap();
        registry
    }

    fn add_candidate(registry: &mut Registry, now: DateTime<Utc>, n: u8, name: &str) {
        registry
            .add_candidate(
                &admin_at(now),
                Address::example(n),
                name.to_string(),
                format!("Party {n}"),
                format!("ipfs://{name}"),
            )
            .unwrap();
    }

    fn add_voter(registry: &mut Registry, now: DateTime<Utc>, n: u8, name: &str) {
        registry
            .add_voter(&admin_at(now), Address::example(n), name.to_string(), 30)
            .unwrap();
    }

    #[test]
    fn fresh_registry() {
        let registry = Registry::new(Address::example(ADMIN));
        assert_eq!(registry.admin(), &Address::example(ADMIN));
        assert_eq!(registry.phase(), Phase::Uncreated);
        assert_eq!(registry.election_name(), None);
        assert!(!registry.has_election_started());
        assert!(!registry.has_election_finalized());
        assert!(registry.candidates().is_empty());
        assert!(registry.voters().is_empty());
        assert_eq!(registry.winner(), Err(BallotError::NotFinalized));
    }

    #[test]
    fn create_election_once() {
        let now = Utc::now();
        let mut registry = with_election(now);
        assert_eq!(registry.election_name(), Some("Pemilu 2025"));
        assert_eq!(registry.phase(), Phase::Created);

        let before = registry.clone();
        let again = registry.create_election(
            &admin_at(now),
            "Another".to_string(),
            now + Duration::days(1),
            now + Duration::days(2),
        );
        assert_eq!(again, Err(BallotError::ElectionExists));
        assert_eq!(registry, before);
    }

    #[test]
    fn create_election_validates_input() {
        let now = Utc::now();
        let mut registry = Registry::new(Address::example(ADMIN));
        let start = now + Duration::days(1);

        assert_eq!(
            registry.create_election(
                &account_at(1, now),
                "E".to_string(),
                start,
                start + Duration::days(1)
            ),
            Err(BallotError::NotAdmin)
        );
        assert_eq!(
            registry.create_election(
                &admin_at(now),
                " ".to_string(),
                start,
                start + Duration::days(1)
            ),
            Err(BallotError::EmptyName("Election name"))
        );
        assert_eq!(
            registry.create_election(&admin_at(now), "E".to_string(), start, start),
            Err(BallotError::InvalidSchedule)
        );
        assert_eq!(registry.phase(), Phase::Uncreated);
    }

    #[test]
    fn candidates_keep_registration_order() {
        let now = Utc::now();
        let mut registry = with_election(now);
        add_candidate(&mut registry, now, 1, "Alice");
        add_candidate(&mut registry, now, 2, "Bob");
        add_candidate(&mut registry, now, ADMIN, "Owner");

        let names: Vec<_> = registry.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob", "Owner"]);
        assert!(registry.candidates().iter().all(|c| c.vote_count == 0));
    }

    #[test]
    fn duplicate_candidate_rejected() {
        let now = Utc::now();
        let mut registry = with_election(now);
        add_candidate(&mut registry, now, 1, "Alice");

        let before = registry.clone();
        let result = registry.add_candidate(
            &admin_at(now),
            Address::example(1),
            "Alice".to_string(),
            "Party 1".to_string(),
            "ipfs://alice".to_string(),
        );
        assert_eq!(result, Err(BallotError::CandidateExists));
        assert_eq!(registry, before);
        assert_eq!(registry.candidates().len(), 1);
    }

    #[test]
    fn candidate_registration_requires_admin_and_election() {
        let now = Utc::now();
        let mut registry = Registry::new(Address::example(ADMIN));
        let add = |registry: &mut Registry, ctx: &Context| {
            registry
                .add_candidate(
                    ctx,
                    Address::example(1),
                    "Alice".to_string(),
                    "Party 1".to_string(),
                    "ipfs://alice".to_string(),
                )
                .map(|_| ())
        };
        assert_eq!(add(&mut registry, &admin_at(now)), Err(BallotError::NoElection));

        let mut registry = with_election(now);
        assert_eq!(add(&mut registry, &account_at(1, now)), Err(BallotError::NotAdmin));
        assert!(registry.candidates().is_empty());
    }

    #[test]
    fn candidate_registration_closes_at_start() {
        let now = Utc::now();
        let mut registry = with_election(now);
        let start = registry.election().unwrap().start_date;

        add_candidate(&mut registry, start - Duration::seconds(1), 1, "Alice");
        let late = registry.add_candidate(
            &admin_at(start),
            Address::example(2),
            "Bob".to_string(),
            "Party 2".to_string(),
            "ipfs://bob".to_string(),
        );
        assert_eq!(late, Err(BallotError::RegistrationClosed));
        assert_eq!(registry.candidates().len(), 1);
    }

    #[test]
    fn candidate_registration_lead_time() {
        let now = Utc::now();
        let mut registry = with_election(now);
        registry.set_registration_lead(Duration::days(1));
        let start = registry.election().unwrap().start_date;

        let result = registry.add_candidate(
            &admin_at(start - Duration::hours(2)),
            Address::example(1),
            "Alice".to_string(),
            "Party 1".to_string(),
            "ipfs://alice".to_string(),
        );
        assert_eq!(result, Err(BallotError::RegistrationClosed));
        add_candidate(&mut registry, start - Duration::days(2), 1, "Alice");
    }

    #[test]
    fn voters_keep_order_and_reject_duplicates() {
        let now = Utc::now();
        let mut registry = with_election(now);
        add_voter(&mut registry, now, 3, "Charlie");
        add_voter(&mut registry, now, 2, "Bob");
        add_voter(&mut registry, now, ADMIN, "Owner");

        let names: Vec<_> = registry.voters().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["Charlie", "Bob", "Owner"]);
        assert!(registry.voters().iter().all(|v| !v.has_voted));

        let again = registry.add_voter(&admin_at(now), Address::example(2), "Bob".to_string(), 25);
        assert_eq!(again, Err(BallotError::VoterExists));
        assert_eq!(registry.voters().len(), 3);

        let not_admin = registry.add_voter(
            &account_at(2, now),
            Address::example(9),
            "Eve".to_string(),
            25,
        );
        assert_eq!(not_admin, Err(BallotError::NotAdmin));
    }

    #[test]
    fn voters_registered_after_start_but_not_after_finalization() {
        let now = Utc::now();
        let mut registry = with_election(now);
        add_candidate(&mut registry, now, 1, "Alice");
        registry.start_election(&admin_at(now)).unwrap();

        let during = now + Duration::days(3) + Duration::hours(1);
        add_voter(&mut registry, during, 2, "Bob");

        registry.end_election(&admin_at(during)).unwrap();
        let late = registry.add_voter(
            &admin_at(during),
            Address::example(3),
            "Carl".to_string(),
            30,
        );
        assert_eq!(late, Err(BallotError::Finalized));
        assert_eq!(registry.voters().len(), 1);
    }

    #[test]
    fn lifecycle_transitions() {
        let now = Utc::now();
        let mut registry = with_election(now);

        assert_eq!(registry.end_election(&admin_at(now)), Err(BallotError::NotStarted));
        assert_eq!(registry.start_election(&account_at(1, now)), Err(BallotError::NotAdmin));

        registry.start_election(&admin_at(now)).unwrap();
        assert!(registry.has_election_started());
        assert_eq!(registry.phase(), Phase::Started);
        assert_eq!(registry.start_election(&admin_at(now)), Err(BallotError::AlreadyStarted));

        assert_eq!(registry.end_election(&account_at(1, now)), Err(BallotError::NotAdmin));
        registry.end_election(&admin_at(now)).unwrap();
        assert!(registry.has_election_finalized());
        assert_eq!(registry.phase(), Phase::Finalized);

        assert_eq!(registry.end_election(&admin_at(now)), Err(BallotError::Finalized));
        assert_eq!(registry.start_election(&admin_at(now)), Err(BallotError::Finalized));
    }

    #[test]
    fn start_and_end_need_an_election() {
        let now = Utc::now();
        let mut registry = Registry::new(Address::example(ADMIN));
        assert_eq!(registry.start_election(&admin_at(now)), Err(BallotError::NoElection));
        assert_eq!(registry.end_election(&admin_at(now)), Err(BallotError::NoElection));
    }

    /// Alice (1) and Bob (2) standing, voters 3 and 4, started, clock inside the window.
    fn open_for_voting() -> (Registry, DateTime<Utc>) {
        let now = Utc::now();
        let mut registry = with_election(now);
        add_candidate(&mut registry, now, 1, "Alice");
        add_candidate(&mut registry, now, 2, "Bob");
        add_voter(&mut registry, now, 3, "Charlie");
        add_voter(&mut registry, now, 4, "Dana");
        registry.start_election(&admin_at(now)).unwrap();
        (registry, now + Duration::days(3) + Duration::minutes(1))
    }

    #[test]
    fn vote_once() {
        let (mut registry, during) = open_for_voting();
        let candidate = registry.vote(&account_at(3, during), &Address::example(1)).unwrap();
        assert_eq!(candidate.vote_count, 1);
        assert!(registry.voter(&Address::example(3)).unwrap().has_voted);

        let before = registry.clone();
        assert_eq!(
            registry.vote(&account_at(3, during), &Address::example(1)),
            Err(BallotError::AlreadyVoted)
        );
        assert_eq!(
            registry.vote(&account_at(3, during), &Address::example(2)),
            Err(BallotError::AlreadyVoted)
        );
        assert_eq!(registry, before);
        assert_eq!(registry.candidate(&Address::example(1)).unwrap().vote_count, 1);
    }

    #[test]
    fn unregistered_voter_rejected_whatever_the_candidate() {
        let (mut registry, during) = open_for_voting();
        let before = registry.clone();
        assert_eq!(
            registry.vote(&account_at(9, during), &Address::example(1)),
            Err(BallotError::NotEligible)
        );
        assert_eq!(
            registry.vote(&account_at(9, during), &Address::example(42)),
            Err(BallotError::NotEligible)
        );
        assert_eq!(registry, before);
    }

    #[test]
    fn vote_for_unknown_candidate_rejected() {
        let (mut registry, during) = open_for_voting();
        let before = registry.clone();
        assert_eq!(
            registry.vote(&account_at(3, during), &Address::example(42)),
            Err(BallotError::InvalidCandidate)
        );
        assert_eq!(registry, before);
        assert!(!registry.voter(&Address::example(3)).unwrap().has_voted);
    }

    #[test]
    fn vote_outside_window_rejected() {
        let (mut registry, during) = open_for_voting();
        let election = registry.election().unwrap().clone();

        assert_eq!(
            registry.vote(
                &account_at(3, election.start_date - Duration::seconds(1)),
                &Address::example(1)
            ),
            Err(BallotError::OutsideVotingWindow)
        );
        assert_eq!(
            registry.vote(
                &account_at(3, election.end_date + Duration::seconds(1)),
                &Address::example(1)
            ),
            Err(BallotError::OutsideVotingWindow)
        );
        // Both ends of the window are inclusive.
        registry.vote(&account_at(3, election.start_date), &Address::example(1)).unwrap();
        registry.vote(&account_at(4, election.end_date), &Address::example(1)).unwrap();
        assert!(registry.voting_window_closed(election.end_date + Duration::seconds(1)));
        assert!(!registry.voting_window_closed(during));
    }

    #[test]
    fn vote_before_start_or_after_finalization_rejected() {
        let now = Utc::now();
        let mut registry = with_election(now);
        add_candidate(&mut registry, now, 1, "Alice");
        add_voter(&mut registry, now, 2, "Bob");
        let during = now + Duration::days(3) + Duration::hours(1);

        assert_eq!(
            registry.vote(&account_at(2, during), &Address::example(1)),
            Err(BallotError::NotStarted)
        );

        registry.start_election(&admin_at(now)).unwrap();
        registry.end_election(&admin_at(now)).unwrap();
        assert_eq!(
            registry.vote(&account_at(2, during), &Address::example(1)),
            Err(BallotError::Finalized)
        );
        assert_eq!(registry.candidates()[0].vote_count, 0);
    }

    #[test]
    fn winner_requires_finalization() {
        let (mut registry, during) = open_for_voting();
        registry.vote(&account_at(3, during), &Address::example(2)).unwrap();
        assert_eq!(registry.winner(), Err(BallotError::NotFinalized));

        registry.end_election(&admin_at(during)).unwrap();
        match registry.winner().unwrap() {
            Winner::Candidate(candidate) => {
                assert_eq!(candidate.name, "Bob");
                assert_eq!(candidate.party, "Party 2");
                assert_eq!(candidate.vote_count, 1);
            }
            Winner::NoWinner => panic!("expected a winner"),
        }
    }

    #[test]
    fn no_votes_means_no_winner() {
        let (mut registry, during) = open_for_voting();
        registry.end_election(&admin_at(during)).unwrap();
        assert_eq!(registry.winner(), Ok(Winner::NoWinner));
    }

    #[test]
    fn tie_goes_to_earliest_candidate() {
        let (mut registry, during) = open_for_voting();
        add_voter(&mut registry, during, 5, "Eve");
        add_voter(&mut registry, during, 6, "Fred");
        registry.vote(&account_at(3, during), &Address::example(2)).unwrap();
        registry.vote(&account_at(4, during), &Address::example(1)).unwrap();
        registry.vote(&account_at(5, during), &Address::example(2)).unwrap();
        registry.vote(&account_at(6, during), &Address::example(1)).unwrap();
        registry.end_election(&admin_at(during)).unwrap();

        match registry.winner().unwrap() {
            Winner::Candidate(candidate) => assert_eq!(candidate.name, "Alice"),
            Winner::NoWinner => panic!("expected a winner"),
        }
    }

    #[test]
    fn end_to_end() {
        let now = Utc::now();
        let mut registry = Registry::new(Address::example(ADMIN));
        let (x, y, z) = (Address::example(0x0a), Address::example(0x0b), Address::example(0x0c));
        registry
            .create_election(
                &admin_at(now),
                "E".to_string(),
                now + Duration::days(3),
                now + Duration::days(4),
            )
            .unwrap();
        registry
            .add_candidate(
                &admin_at(now),
                x,
                "Alice".to_string(),
                "P1".to_string(),
                "img1".to_string(),
            )
            .unwrap();
        registry
            .add_candidate(
                &admin_at(now),
                y,
                "Bob".to_string(),
                "P2".to_string(),
                "img2".to_string(),
            )
            .unwrap();
        registry.add_voter(&admin_at(now), z, "Carl".to_string(), 30).unwrap();

        let later = now + Duration::days(3) + Duration::seconds(10);
        registry.start_election(&admin_at(later)).unwrap();
        registry.vote(&Context::new(z, later), &y).unwrap();
        registry.end_election(&admin_at(later)).unwrap();

        match registry.winner().unwrap() {
            Winner::Candidate(candidate) => {
                assert_eq!(
                    (candidate.name.as_str(), candidate.party.as_str(), candidate.vote_count),
                    ("Bob", "P2", 1)
                );
            }
            Winner::NoWinner => panic!("expected a winner"),
        }
    }
}
